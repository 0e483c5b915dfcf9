//! Typed event dispatch
//!
//! Handlers are plain function pointers registered against an event kind and
//! the set of game states they apply in. Dispatch is a table walk: no
//! reflection, no downcasts, no global registry. State transitions requested
//! while an event is in flight are queued as signals on the game and settled
//! by [`EventDispatcher::settle`] once the current handler chain finishes.

use super::state::{GameState, GameStateChange, PlayerStateChange};
use super::survival::{GameSignal, SurvivalGames};
use super::{EventKind, HostEvent};

/// An event as seen by handlers: host input or internal notification
#[derive(Debug, Clone)]
pub enum GameEvent {
    Host(HostEvent),
    /// A game state change is about to happen; cancellable
    GameStateChanging(GameStateChange),
    /// A game state change took effect
    GameStateChanged(GameStateChange),
    /// A player's state actually changed
    PlayerStateChanged(PlayerStateChange),
}

impl GameEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            GameEvent::Host(e) => e.kind(),
            GameEvent::GameStateChanging(_) => EventKind::GameStateChanging,
            GameEvent::GameStateChanged(_) => EventKind::GameStateChanged,
            GameEvent::PlayerStateChanged(_) => EventKind::PlayerStateChanged,
        }
    }
}

/// Mutable context threaded through a handler chain
pub struct EventCtx<'a> {
    pub event: &'a GameEvent,
    cancelled: bool,
}

impl<'a> EventCtx<'a> {
    fn new(event: &'a GameEvent) -> Self {
        Self { event, cancelled: false }
    }

    /// Suppress the event's default outcome and stop non-tolerant handlers
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

/// A registered event handler
pub type Handler = fn(&mut SurvivalGames, &mut EventCtx);

/// A hook run when the game enters a state
pub type EnterHook = fn(&mut SurvivalGames);

/// Bitset over [`GameState`] variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSet(u8);

impl StateSet {
    pub const ANY: StateSet = StateSet(0b1_1111);

    pub fn of(states: &[GameState]) -> Self {
        let mut bits = 0u8;
        for state in states {
            bits |= 1 << Self::index(*state);
        }
        StateSet(bits)
    }

    pub fn contains(self, state: GameState) -> bool {
        self.0 & (1 << Self::index(state)) != 0
    }

    fn index(state: GameState) -> u8 {
        match state {
            GameState::Preparing => 0,
            GameState::PreStart => 1,
            GameState::Started => 2,
            GameState::Ended => 3,
            GameState::CleaningUp => 4,
        }
    }
}

struct HandlerEntry {
    kind: EventKind,
    states: StateSet,
    skip_cancelled: bool,
    handler: Handler,
}

/// The dispatch table for one match
#[derive(Default)]
pub struct EventDispatcher {
    handlers: Vec<HandlerEntry>,
    enter_hooks: Vec<(GameState, EnterHook)>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `kind` while the game is in one of `states`
    pub fn listen(&mut self, kind: EventKind, states: StateSet, handler: Handler) {
        self.handlers.push(HandlerEntry { kind, states, skip_cancelled: false, handler });
    }

    /// Like [`listen`](Self::listen), but skipped once the event is cancelled
    pub fn listen_skip_cancelled(&mut self, kind: EventKind, states: StateSet, handler: Handler) {
        self.handlers.push(HandlerEntry { kind, states, skip_cancelled: true, handler });
    }

    /// Register a hook that runs when the game enters `state`
    pub fn on_enter(&mut self, state: GameState, hook: EnterHook) {
        self.enter_hooks.push((state, hook));
    }

    /// Run the handler chain for one event; returns whether it was cancelled
    pub fn dispatch(&self, game: &mut SurvivalGames, event: &GameEvent) -> bool {
        let state = game.state();
        let kind = event.kind();
        let mut ctx = EventCtx::new(event);
        for entry in &self.handlers {
            if entry.kind != kind || !entry.states.contains(state) {
                continue;
            }
            if ctx.cancelled && entry.skip_cancelled {
                continue;
            }
            (entry.handler)(game, &mut ctx);
        }
        ctx.cancelled
    }

    /// Dispatch a host event, then settle any signals it raised
    pub fn handle(&self, game: &mut SurvivalGames, event: HostEvent) -> bool {
        let cancelled = self.dispatch(game, &GameEvent::Host(event));
        self.settle(game);
        cancelled
    }

    /// Drain queued signals until the game is quiescent
    ///
    /// Signals raised while settling (a state change triggering another) are
    /// picked up by the same loop, so nested transitions resolve in order.
    pub fn settle(&self, game: &mut SurvivalGames) {
        while let Some(signal) = game.pop_signal() {
            match signal {
                GameSignal::RequestGameState(to) => {
                    let from = game.state();
                    if from == to {
                        continue;
                    }
                    let change = GameStateChange { from, to };
                    if self.dispatch(game, &GameEvent::GameStateChanging(change)) {
                        continue;
                    }
                    game.commit_game_state(to);
                    self.dispatch(game, &GameEvent::GameStateChanged(change));
                    for (state, hook) in &self.enter_hooks {
                        if *state == to {
                            hook(game);
                        }
                    }
                }
                GameSignal::PlayerStateChanged(change) => {
                    self.dispatch(game, &GameEvent::PlayerStateChanged(change));
                }
            }
        }
    }
}
