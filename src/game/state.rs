//! Game and player state machines
//!
//! Both enums are closed: every consumer matches exhaustively, so adding a
//! state is a compile error until every call site decides what it means.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameState {
    /// Match object exists, world and mechanics still being set up
    Preparing,
    /// Waiting for enough players to join
    PreStart,
    /// Match is live
    Started,
    /// Win condition met, results being announced
    Ended,
    /// Match resources being torn down before the next match
    CleaningUp,
}

/// Participation of a single player in the current match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerState {
    Alive,
    Eliminated,
    Respawning,
    Spectator,
}

impl PlayerState {
    /// Alive players count towards the win condition
    pub fn is_alive(self) -> bool {
        matches!(self, PlayerState::Alive)
    }

    /// Participants are part of the match even while dead; spectators are not
    pub fn is_participant(self) -> bool {
        match self {
            PlayerState::Alive | PlayerState::Eliminated | PlayerState::Respawning => true,
            PlayerState::Spectator => false,
        }
    }
}

/// Emitted before a game state change takes effect; may be cancelled
#[derive(Debug, Clone, Copy)]
pub struct GameStateChange {
    pub from: GameState,
    pub to: GameState,
}

/// Emitted after a player's state actually changed
#[derive(Debug, Clone, Copy)]
pub struct PlayerStateChange {
    pub player: Uuid,
    pub from: Option<PlayerState>,
    pub to: PlayerState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn participants_and_alive() {
        assert!(PlayerState::Alive.is_alive());
        assert!(PlayerState::Alive.is_participant());
        assert!(!PlayerState::Eliminated.is_alive());
        assert!(PlayerState::Eliminated.is_participant());
        assert!(PlayerState::Respawning.is_participant());
        assert!(!PlayerState::Spectator.is_participant());
        assert!(!PlayerState::Spectator.is_alive());
    }
}
