//! Survival Games match logic

pub mod border;
pub mod compass;
pub mod cycle;
pub mod dispatch;
pub mod glow;
pub mod kit;
pub mod loot;
pub mod soup;
pub mod state;
pub mod survival;
pub mod text;

pub use cycle::GameCycle;
pub use dispatch::GameEvent;
pub use state::GameState;
pub use survival::{GameServices, SurvivalGames};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::host::session::Material;

use state::PlayerState;

/// Cause of a damage event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageCause {
    Attack,
    Projectile,
    Fall,
    Fire,
    Border,
    Other,
}

/// Events the host runtime feeds into the match task
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    PlayerJoin {
        player: Uuid,
    },
    PlayerQuit {
        player: Uuid,
    },
    PlayerDeath {
        player: Uuid,
    },
    Damage {
        victim: Uuid,
        attacker: Option<Uuid>,
        cause: DamageCause,
        amount: f64,
    },
    /// Player used the item in their main hand
    Interact {
        player: Uuid,
        item: Option<Material>,
    },
    Consume {
        player: Uuid,
        item: Material,
    },
    /// Player opened a container block
    OpenContainer {
        player: Uuid,
        position: crate::host::world::Position,
    },
    SneakToggle {
        player: Uuid,
        sneaking: bool,
    },
    Chat {
        player: Uuid,
        message: String,
    },
    Command {
        player: Uuid,
        name: String,
        args: Vec<String>,
    },
}

/// Discriminant of [`HostEvent`] plus internal state-change notifications,
/// used as the dispatch key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PlayerJoin,
    PlayerQuit,
    PlayerDeath,
    Damage,
    Interact,
    Consume,
    OpenContainer,
    SneakToggle,
    Chat,
    Command,
    GameStateChanging,
    GameStateChanged,
    PlayerStateChanged,
}

impl HostEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            HostEvent::PlayerJoin { .. } => EventKind::PlayerJoin,
            HostEvent::PlayerQuit { .. } => EventKind::PlayerQuit,
            HostEvent::PlayerDeath { .. } => EventKind::PlayerDeath,
            HostEvent::Damage { .. } => EventKind::Damage,
            HostEvent::Interact { .. } => EventKind::Interact,
            HostEvent::Consume { .. } => EventKind::Consume,
            HostEvent::OpenContainer { .. } => EventKind::OpenContainer,
            HostEvent::SneakToggle { .. } => EventKind::SneakToggle,
            HostEvent::Chat { .. } => EventKind::Chat,
            HostEvent::Command { .. } => EventKind::Command,
        }
    }
}

/// Messages the match task publishes back to the host runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostMsg {
    /// Chat line shown to everyone
    Announce { message: String },
    /// Chat line shown to a single player
    PlayerMessage { player: Uuid, message: String },
    GameStateChanged { from: GameState, to: GameState },
    PlayerStateChanged {
        player: Uuid,
        from: Option<PlayerState>,
        to: PlayerState,
    },
    /// Border began shrinking towards a new diameter
    BorderShrink { size: f64, seconds: u32 },
    /// Rendered chat line, post formatting
    ChatLine { message: String },
}

/// Actions queued during an event and applied at a later simulation step
///
/// Handlers must never transition player or game state while the triggering
/// event is still being dispatched; they queue one of these instead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeferredAction {
    SetPlayerState { player: Uuid, to: PlayerState },
    SetGameState { to: GameState },
}
