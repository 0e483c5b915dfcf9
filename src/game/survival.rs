//! The Survival Games match
//!
//! Owns all mutable match state and exposes the handler functions the
//! dispatcher routes events to. Every collaborator (sessions, platform
//! clients, modules) is passed in at construction; nothing is looked up
//! through globals.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Config;
use crate::host::session::{GameMode, SessionRegistry, EFFECT_UNTIL_REMOVED};
use crate::host::stats::{stat, LeaderboardClient, StatsClient};
use crate::host::world::{GameWorld, Position};
use crate::modules::chat::RenderedChat;
use crate::modules::{manager, ChatModule, PrefixModule, WorldDemoModule};
use crate::util::time::secs_to_ticks;

use super::border::BorderMechanic;
use super::dispatch::EventCtx;
use super::loot::{LootMechanic, LootTier};
use super::state::{GameState, PlayerState, PlayerStateChange};
use super::{kit, text, DeferredAction, GameEvent, HostEvent, HostMsg};

/// Ticks between a cancelled death event and the actual elimination
const ELIMINATION_DELAY_TICKS: u32 = 1;
/// Seconds results stay up before the match tears down
const ENDED_LINGER_SECS: u32 = 5;

/// Internal notifications queued during event handling and settled by the
/// dispatcher once the current handler chain finishes
#[derive(Debug, Clone, Copy)]
pub enum GameSignal {
    RequestGameState(GameState),
    PlayerStateChanged(PlayerStateChange),
}

/// Everything a match needs from the outside world
#[derive(Clone)]
pub struct GameServices {
    pub stats: StatsClient,
    pub leaderboards: LeaderboardClient,
    pub prefixes: Arc<PrefixModule>,
    pub chat: ChatModule,
    pub world_demo: Arc<WorldDemoModule>,
}

pub struct SurvivalGames {
    id: Uuid,
    state: GameState,
    players: HashMap<Uuid, PlayerState>,
    alive: HashSet<Uuid>,
    /// Per-match tallies shown in chat hovers
    kills: HashMap<Uuid, u64>,
    deaths: HashMap<Uuid, u64>,

    sessions: Arc<SessionRegistry>,
    world: GameWorld,
    border: BorderMechanic,
    loot: LootMechanic,
    rng: ChaCha8Rng,
    services: GameServices,
    outbound: broadcast::Sender<HostMsg>,

    signals: VecDeque<GameSignal>,
    /// (remaining ticks, action); drained once per simulation step
    deferred: Vec<(u32, DeferredAction)>,

    min_players: usize,
    local_testing: bool,
    initial_players: usize,
}

impl SurvivalGames {
    pub fn new(
        config: &Config,
        world: GameWorld,
        loot: LootMechanic,
        sessions: Arc<SessionRegistry>,
        services: GameServices,
        outbound: broadcast::Sender<HostMsg>,
    ) -> Self {
        let id = Uuid::new_v4();
        info!(game_id = %id, world = %world.name, "Creating match");
        Self {
            id,
            state: GameState::Preparing,
            players: HashMap::new(),
            alive: HashSet::new(),
            kills: HashMap::new(),
            deaths: HashMap::new(),
            sessions,
            world,
            border: BorderMechanic::new(
                config.shrink_time_rate,
                config.shrink_time_player_rate,
                config.min_border_radius as f64,
            ),
            loot,
            rng: ChaCha8Rng::from_entropy(),
            services,
            outbound,
            signals: VecDeque::new(),
            deferred: Vec::new(),
            min_players: config.min_players,
            local_testing: config.local_testing,
            initial_players: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn player_state(&self, player: Uuid) -> Option<PlayerState> {
        self.players.get(&player).copied()
    }

    pub fn alive_count(&self) -> usize {
        self.alive.len()
    }

    pub fn alive_players(&self) -> Vec<Uuid> {
        self.alive.iter().copied().collect()
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn world_demo(&self) -> &Arc<WorldDemoModule> {
        &self.services.world_demo
    }

    #[cfg(test)]
    pub(crate) fn services_for_tests(&self) -> &GameServices {
        &self.services
    }

    /// Queue a game state transition; no-op when already in or heading to it
    pub fn request_game_state(&mut self, to: GameState) {
        if self.state == to {
            return;
        }
        let already_queued = self
            .signals
            .iter()
            .any(|s| matches!(s, GameSignal::RequestGameState(t) if *t == to));
        if already_queued {
            return;
        }
        self.signals.push_back(GameSignal::RequestGameState(to));
    }

    /// Apply an uncancelled game state transition. Dispatcher-only.
    pub(crate) fn commit_game_state(&mut self, to: GameState) {
        let from = self.state;
        info!(game_id = %self.id, ?from, ?to, "Game state change");
        self.state = to;
        let _ = self.outbound.send(HostMsg::GameStateChanged { from, to });
    }

    /// Set a player's state, queueing a change notification only when it
    /// actually differs from the current one
    pub fn set_player_state(&mut self, player: Uuid, to: PlayerState) {
        let from = self.players.insert(player, to);
        if to.is_alive() {
            self.alive.insert(player);
        } else {
            self.alive.remove(&player);
        }
        if from == Some(to) {
            return;
        }
        debug!(game_id = %self.id, %player, ?from, ?to, "Player state change");
        let _ = self.outbound.send(HostMsg::PlayerStateChanged { player, from, to });
        self.signals
            .push_back(GameSignal::PlayerStateChanged(PlayerStateChange { player, from, to }));
    }

    pub(crate) fn pop_signal(&mut self) -> Option<GameSignal> {
        self.signals.pop_front()
    }

    /// Schedule an action for a later simulation step
    pub fn defer(&mut self, ticks: u32, action: DeferredAction) {
        self.deferred.push((ticks, action));
    }

    pub fn announce(&self, message: String) {
        let _ = self.outbound.send(HostMsg::Announce { message });
    }

    pub fn message(&self, player: Uuid, message: String) {
        let _ = self.outbound.send(HostMsg::PlayerMessage { player, message });
    }

    /// Advance one simulation step: apply due deferred actions, tick border
    /// and effects, apply border damage
    pub fn step(&mut self) {
        let mut due = Vec::new();
        self.deferred.retain_mut(|(ticks, action)| {
            *ticks = ticks.saturating_sub(1);
            if *ticks == 0 {
                due.push(*action);
                false
            } else {
                true
            }
        });
        for action in due {
            match action {
                DeferredAction::SetPlayerState { player, to } => {
                    // the player may have quit between the defer and this step
                    if self.players.contains_key(&player) {
                        self.set_player_state(player, to);
                    }
                }
                DeferredAction::SetGameState { to } => self.request_game_state(to),
            }
        }

        self.tick_effects();

        if self.state == GameState::Started {
            self.world.border.tick();
            self.apply_border_damage();
        }
    }

    fn tick_effects(&mut self) {
        for id in self.sessions.online_ids() {
            self.sessions.update(id, |s| {
                s.effects.retain(|_, ticks| {
                    if *ticks == EFFECT_UNTIL_REMOVED {
                        return true;
                    }
                    *ticks = ticks.saturating_sub(1);
                    *ticks > 0
                });
            });
        }
    }

    fn apply_border_damage(&mut self) {
        let damage = self.world.border.damage_per_second as f32 / 20.0;
        let mut casualties = Vec::new();
        for player in self.alive.iter().copied() {
            let dead = self.sessions.update(player, |s| {
                if self.world.border.contains(&s.position) || s.invulnerable {
                    return false;
                }
                s.health = (s.health - damage).max(0.0);
                s.health <= 0.0
            });
            if dead == Some(true) {
                casualties.push(player);
            }
        }
        for player in casualties {
            self.defer(
                ELIMINATION_DELAY_TICKS,
                DeferredAction::SetPlayerState { player, to: PlayerState::Eliminated },
            );
        }
    }

    fn award_stat(&self, player: Uuid, name: &'static str, amount: i64) {
        if self.local_testing {
            return;
        }
        self.services.stats.award_detached(player, name, amount);
    }

    fn award_leaderboard(&self, player: Uuid, board: &'static str, amount: i64) {
        if self.local_testing {
            return;
        }
        self.services.leaderboards.increment_detached(player, board, amount);
    }

    /// Render a chat message the way the host should display it
    pub fn render_chat(&self, player: Uuid, message: &str) -> Option<RenderedChat> {
        let name = self.sessions.name_of(player)?;
        let participant = self
            .players
            .get(&player)
            .map(|s| s.is_participant())
            .unwrap_or(false);
        let kills = self.kills.get(&player).copied().unwrap_or(0);
        let deaths = self.deaths.get(&player).copied().unwrap_or(0);
        Some(self.services.chat.render(player, &name, participant, kills, deaths, message))
    }

    fn chest_tier(&self, position: Position) -> Option<LootTier> {
        let key = |p: &Position| (p.x as i64, p.y as i64, p.z as i64);
        let target = key(&position);
        if self
            .world
            .data_points(crate::host::world::data_point::TIER1_CHEST)
            .iter()
            .any(|p| key(p) == target)
        {
            return Some(LootTier::Tier1);
        }
        if self
            .world
            .data_points(crate::host::world::data_point::TIER2_CHEST)
            .iter()
            .any(|p| key(p) == target)
        {
            return Some(LootTier::Tier2);
        }
        None
    }

    fn start_if_ready(&mut self) {
        if self.state == GameState::PreStart && self.alive.len() >= self.min_players {
            self.request_game_state(GameState::Started);
        } else if self.state == GameState::PreStart {
            self.announce(text::players_needed(self.min_players - self.alive.len()));
        }
    }

    fn end_if_decided(&mut self) {
        if self.state == GameState::Started && self.alive.len() <= 1 {
            self.request_game_state(GameState::Ended);
        }
    }

    fn retarget_border(&mut self) {
        let alive = self.alive.len();
        let seconds = self.border.retarget(&mut self.world.border, alive);
        let _ = self.outbound.send(HostMsg::BorderShrink {
            size: self.border.min_size(),
            seconds,
        });
    }

    fn make_spectator(&self, player: Uuid) {
        let spectate_at = self
            .world
            .spawns()
            .first()
            .copied()
            .unwrap_or(self.world.border.center);
        self.sessions.update(player, |s| {
            s.game_mode = GameMode::Spectator;
            s.teleport(spectate_at);
        });
    }
}

// ---- event handlers -------------------------------------------------------

/// Join while waiting for players: become a participant
pub fn join_lobby(game: &mut SurvivalGames, ctx: &mut EventCtx) {
    let GameEvent::Host(HostEvent::PlayerJoin { player }) = ctx.event else {
        return;
    };
    game.services.prefixes.load_on_join(*player);
    game.set_player_state(*player, PlayerState::Alive);
    game.start_if_ready();
}

/// Join outside the lobby phase: spectate
pub fn join_as_spectator(game: &mut SurvivalGames, ctx: &mut EventCtx) {
    let GameEvent::Host(HostEvent::PlayerJoin { player }) = ctx.event else {
        return;
    };
    game.services.prefixes.load_on_join(*player);
    game.set_player_state(*player, PlayerState::Spectator);
    game.make_spectator(*player);
}

/// Disconnect: participants are eliminated, spectators just leave
pub fn handle_quit(game: &mut SurvivalGames, ctx: &mut EventCtx) {
    let GameEvent::Host(HostEvent::PlayerQuit { player }) = ctx.event else {
        return;
    };
    let was_participant = game
        .player_state(*player)
        .map(PlayerState::is_participant)
        .unwrap_or(false);
    if was_participant {
        game.set_player_state(*player, PlayerState::Eliminated);
    } else {
        game.set_player_state(*player, PlayerState::Spectator);
    }
    game.players.remove(player);
    game.services.prefixes.evict(*player);
}

/// Death during a match: suppress the host's death flow and eliminate one
/// step later
pub fn handle_death(game: &mut SurvivalGames, ctx: &mut EventCtx) {
    let GameEvent::Host(HostEvent::PlayerDeath { player }) = ctx.event else {
        return;
    };
    if game.player_state(*player).map(PlayerState::is_alive) != Some(true) {
        return;
    }
    ctx.cancel();
    game.defer(
        ELIMINATION_DELAY_TICKS,
        DeferredAction::SetPlayerState { player: *player, to: PlayerState::Eliminated },
    );
}

/// No damage outside a running match
pub fn cancel_out_of_game_damage(_game: &mut SurvivalGames, ctx: &mut EventCtx) {
    if matches!(ctx.event, GameEvent::Host(HostEvent::Damage { .. })) {
        ctx.cancel();
    }
}

/// Remember the last attacker for kill attribution
pub fn track_damage(game: &mut SurvivalGames, ctx: &mut EventCtx) {
    let GameEvent::Host(HostEvent::Damage { victim, attacker: Some(attacker), .. }) = ctx.event
    else {
        return;
    };
    if game.player_state(*attacker).map(PlayerState::is_alive) == Some(true) {
        let attacker = *attacker;
        game.sessions().update(*victim, |s| s.last_damager = Some(attacker));
    }
}

/// Open a loot chest
pub fn open_chest(game: &mut SurvivalGames, ctx: &mut EventCtx) {
    let GameEvent::Host(HostEvent::OpenContainer { player, position }) = ctx.event else {
        return;
    };
    if game.player_state(*player).map(PlayerState::is_alive) != Some(true) {
        return;
    }
    let Some(tier) = game.chest_tier(*position) else {
        return;
    };
    if !game.loot.should_fill(tier, *position) {
        return;
    }
    // split borrows: roll with a local rng handle, then hand items over
    let mut rng = game.rng.clone();
    let items = game.loot.fill(tier, *position, &mut rng);
    game.rng = rng;
    let player = *player;
    game.sessions().update(player, |s| s.inventory.extend(items));
}

/// Render and publish a chat line
pub fn handle_chat(game: &mut SurvivalGames, ctx: &mut EventCtx) {
    let GameEvent::Host(HostEvent::Chat { player, message }) = ctx.event else {
        return;
    };
    if let Some(rendered) = game.render_chat(*player, message) {
        let _ = game.outbound.send(HostMsg::ChatLine { message: rendered.line });
    }
}

/// Route slash commands to their modules
pub fn handle_command(game: &mut SurvivalGames, ctx: &mut EventCtx) {
    let GameEvent::Host(HostEvent::Command { player, name, args }) = ctx.event else {
        return;
    };
    let (player, args) = (*player, args.clone());
    match name.as_str() {
        "game" => manager::handle_game_command(game, player, &args),
        "prefix" => match args.first().map(String::as_str) {
            Some("clear") => {
                game.services.prefixes.clear(player);
                game.message(player, "Prefix cleared".to_string());
            }
            Some(_) => {
                let prefix = args.join(" ");
                game.services.prefixes.set(player, prefix.clone());
                game.message(player, format!("Prefix set to '{}'", prefix));
            }
            None => game.message(player, "Usage: /prefix <text|clear>".to_string()),
        },
        "demoworld" => match (args.first().map(String::as_str), args.get(1)) {
            (Some("load"), Some(world)) => game.world_demo().load(player, world.clone()),
            (Some("unload"), Some(world)) => game.world_demo().unload(player, world),
            (Some("delete"), Some(world)) => game.world_demo().delete(player, world.clone()),
            _ => game.message(player, "Usage: /demoworld <load|unload|delete> <world>".to_string()),
        },
        _ => {}
    }
}

/// Side effects of a player's state actually changing mid-match
pub fn player_state_side_effects(game: &mut SurvivalGames, ctx: &mut EventCtx) {
    let GameEvent::PlayerStateChanged(change) = ctx.event else {
        return;
    };
    let change = *change;

    if change.from == Some(PlayerState::Alive) && !change.to.is_alive() {
        game.sessions().update(change.player, kit::strip);
    }

    match change.to {
        PlayerState::Eliminated => {
            let victim_name = game.sessions().name_of(change.player);
            let killer = game
                .sessions()
                .read(change.player, |s| s.last_damager)
                .flatten()
                .filter(|k| game.player_state(*k).map(PlayerState::is_alive) == Some(true));

            *game.deaths.entry(change.player).or_insert(0) += 1;
            game.award_stat(change.player, stat::DEATHS, 1);

            if let Some(killer) = killer {
                *game.kills.entry(killer).or_insert(0) += 1;
                game.award_stat(killer, stat::KILLS, 1);
                game.award_leaderboard(killer, stat::KILLS, 1);
                if let (Some(victim), Some(killer_name)) =
                    (victim_name.as_deref(), game.sessions().name_of(killer))
                {
                    game.announce(text::killed_by(victim, &killer_name));
                }
            } else if let Some(victim) = victim_name.as_deref() {
                game.announce(text::eliminated(victim));
            }

            game.make_spectator(change.player);
            if game.state() == GameState::Started {
                game.retarget_border();
                game.announce(text::BORDER_SHRINKING.to_string());
            }
            game.end_if_decided();
        }
        PlayerState::Spectator => {
            game.make_spectator(change.player);
            game.end_if_decided();
        }
        PlayerState::Respawning | PlayerState::Alive => {}
    }
}

// ---- state entry hooks ----------------------------------------------------

pub fn on_enter_pre_start(game: &mut SurvivalGames) {
    game.announce(text::WAITING_FOR_PLAYERS.to_string());
}

pub fn on_enter_started(game: &mut SurvivalGames) {
    game.initial_players = game.alive.len();
    let center = game.world.center();
    let spawns: Vec<Position> = game.world.spawns().to_vec();
    let players = game.alive_players();

    let mut taken: Vec<Position> = Vec::new();
    for player in &players {
        let spawn = pick_farthest_spawn(&spawns, &taken, &mut game.rng);
        taken.push(spawn);
        let spawn = spawn.facing(&center);
        game.sessions.update(*player, |s| {
            s.cleanup();
            s.game_mode = GameMode::Adventure;
            s.team = Some("Players".to_string());
            s.teleport(spawn);
            kit::grant(s);
        });
    }

    let initial = game.initial_players;
    game.border.arm(&mut game.world.border, initial);
    game.retarget_border();
    game.announce(text::GAME_STARTING.to_string());
    info!(game_id = %game.id, players = initial, "Match started");
}

pub fn on_enter_ended(game: &mut SurvivalGames) {
    let winner = game.alive.iter().copied().next();
    match winner {
        Some(winner) => {
            if let Some(name) = game.sessions().name_of(winner) {
                game.announce(text::winner_was(&name));
            }
            game.award_stat(winner, stat::WINS, 1);
            game.award_leaderboard(winner, stat::WINS, 1);
        }
        None => game.announce(text::GAME_ENDED_NO_WINNER.to_string()),
    }
    game.defer(
        secs_to_ticks(ENDED_LINGER_SECS),
        DeferredAction::SetGameState { to: GameState::CleaningUp },
    );
}

pub fn on_enter_cleaning_up(game: &mut SurvivalGames) {
    info!(game_id = %game.id, "Tearing down match");
    game.loot.reset();
    for player in game.sessions.online_ids() {
        game.sessions.update(player, |s| {
            s.cleanup();
            s.game_mode = GameMode::Survival;
            s.abilities.clear();
            s.team = None;
        });
    }
    game.players.clear();
    game.alive.clear();
    game.kills.clear();
    game.deaths.clear();
    game.deferred.clear();
}

/// Spawn farthest from every already-assigned spawn; random for the first
fn pick_farthest_spawn(
    spawns: &[Position],
    taken: &[Position],
    rng: &mut impl Rng,
) -> Position {
    if spawns.is_empty() {
        return Position::ORIGIN;
    }
    if taken.is_empty() {
        return spawns[rng.gen_range(0..spawns.len())];
    }
    let min_taken_distance = |spawn: &Position| {
        taken
            .iter()
            .map(|t| spawn.horizontal_distance(t))
            .fold(f64::INFINITY, f64::min)
    };
    spawns
        .iter()
        .copied()
        .max_by(|a, b| min_taken_distance(a).total_cmp(&min_taken_distance(b)))
        .unwrap_or(spawns[0])
}
