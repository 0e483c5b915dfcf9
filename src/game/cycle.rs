//! Match lifecycle driver
//!
//! Owns the dispatch table and the single task that consumes host events,
//! advances the simulation clock and rolls a finished match over into the
//! next one.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};

use crate::config::Config;
use crate::host::session::SessionRegistry;
use crate::host::world::{GameWorld, WorldError};
use crate::util::time::step_duration;

use super::dispatch::{EventDispatcher, StateSet};
use super::loot::{LootError, LootMechanic};
use super::state::GameState;
use super::survival::{self, GameServices, SurvivalGames};
use super::{compass, glow, kit, soup, EventKind, HostEvent, HostMsg};

#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error(transparent)]
    World(#[from] WorldError),

    #[error(transparent)]
    Loot(#[from] LootError),

    #[error("Failed to scan world templates: {0}")]
    Templates(#[from] std::io::Error),
}

pub struct GameCycle {
    factory: MatchFactory,
    events: mpsc::Receiver<HostEvent>,
}

/// Builds a fresh match from the shared collaborators
struct MatchFactory {
    config: Config,
    sessions: Arc<SessionRegistry>,
    services: GameServices,
    outbound: broadcast::Sender<HostMsg>,
}

impl GameCycle {
    pub fn new(
        config: Config,
        sessions: Arc<SessionRegistry>,
        services: GameServices,
        events: mpsc::Receiver<HostEvent>,
        outbound: broadcast::Sender<HostMsg>,
    ) -> Self {
        Self {
            factory: MatchFactory { config, sessions, services, outbound },
            events,
        }
    }

    /// Build the full dispatch table: which handler runs for which event in
    /// which game states is all declared here
    pub fn dispatcher() -> EventDispatcher {
        use GameState::*;

        let mut d = EventDispatcher::new();
        let any = StateSet::ANY;
        let started = StateSet::of(&[Started]);
        let out_of_game = StateSet::of(&[Preparing, PreStart, Ended, CleaningUp]);

        d.listen(EventKind::PlayerJoin, StateSet::of(&[PreStart]), survival::join_lobby);
        d.listen(
            EventKind::PlayerJoin,
            StateSet::of(&[Preparing, Started, Ended, CleaningUp]),
            survival::join_as_spectator,
        );
        d.listen(EventKind::PlayerQuit, any, survival::handle_quit);
        d.listen(EventKind::PlayerDeath, started, survival::handle_death);

        d.listen(EventKind::Damage, out_of_game, survival::cancel_out_of_game_damage);
        d.listen(EventKind::Damage, started, kit::cancel_fall_damage);
        d.listen_skip_cancelled(EventKind::Damage, started, survival::track_damage);
        d.listen_skip_cancelled(EventKind::Damage, started, glow::glow_on_damage);

        d.listen(EventKind::Consume, started, soup::drink_soup);
        d.listen(EventKind::Interact, started, compass::use_compass);
        d.listen(EventKind::OpenContainer, started, survival::open_chest);
        d.listen(EventKind::SneakToggle, started, kit::sneak_invisibility);

        d.listen(EventKind::Chat, any, survival::handle_chat);
        d.listen(EventKind::Command, any, survival::handle_command);

        d.listen(
            EventKind::PlayerStateChanged,
            StateSet::of(&[Started, Ended]),
            survival::player_state_side_effects,
        );

        d.on_enter(PreStart, survival::on_enter_pre_start);
        d.on_enter(Started, survival::on_enter_started);
        d.on_enter(Ended, survival::on_enter_ended);
        d.on_enter(CleaningUp, survival::on_enter_cleaning_up);
        d
    }

    /// Drive matches until the event channel closes
    pub async fn run(self) -> Result<(), CycleError> {
        let GameCycle { factory, mut events } = self;
        let dispatcher = Self::dispatcher();
        let mut game = factory.new_match(&dispatcher)?;
        let mut ticker = tokio::time::interval(step_duration());

        loop {
            tokio::select! {
                maybe_event = events.recv() => {
                    match maybe_event {
                        Some(event) => {
                            dispatcher.handle(&mut game, event);
                        }
                        None => {
                            info!(game_id = %game.id(), "Event channel closed, stopping cycle");
                            return Ok(());
                        }
                    }
                }
                _ = ticker.tick() => {
                    game.step();
                    dispatcher.settle(&mut game);
                    if game.state() == GameState::CleaningUp {
                        game = factory.new_match(&dispatcher)?;
                    }
                }
            }
        }
    }
}

impl MatchFactory {
    /// Load the match world from the templates directory, or an empty world
    /// when none is configured
    fn load_world(&self) -> Result<GameWorld, CycleError> {
        let dir = &self.config.world_templates_dir;
        if dir.is_dir() {
            let mut templates: Vec<_> = std::fs::read_dir(dir)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
                .collect();
            templates.sort();
            if let Some(path) = templates.first() {
                return Ok(GameWorld::from_template_file(path)?);
            }
        }
        warn!(dir = %dir.display(), "No world templates found, using empty world");
        Ok(GameWorld::new("default", HashMap::new()))
    }

    /// Set up a fresh match and run every online session through the join flow
    fn new_match(&self, dispatcher: &EventDispatcher) -> Result<SurvivalGames, CycleError> {
        let world = self.load_world()?;
        let loot = LootMechanic::load(&self.config.assets_dir)?;
        let mut game = SurvivalGames::new(
            &self.config,
            world,
            loot,
            Arc::clone(&self.sessions),
            self.services.clone(),
            self.outbound.clone(),
        );
        game.request_game_state(GameState::PreStart);
        dispatcher.settle(&mut game);
        for player in self.sessions.online_ids() {
            dispatcher.handle(&mut game, HostEvent::PlayerJoin { player });
        }
        Ok(game)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::dispatch::EventCtx;
    use crate::game::state::PlayerState;
    use crate::game::{loot, DamageCause};
    use crate::host::api::HostApiClient;
    use crate::host::data::DataStoreClient;
    use crate::host::session::{GameMode, Material, PlayerSession};
    use crate::host::stats::{LeaderboardClient, StatsClient};
    use crate::host::world::{data_point, Position, WorldStoreClient};
    use crate::modules::{ChatModule, PrefixModule, WorldDemoModule};
    use uuid::Uuid;

    fn test_config(dir: &std::path::Path) -> Config {
        Config {
            log_level: "info".into(),
            host_api_url: "http://localhost".into(),
            host_api_key: "test".into(),
            assets_dir: dir.to_path_buf(),
            world_templates_dir: dir.join("worlds"),
            world_bucket: "DemoWorlds".into(),
            min_players: 2,
            shrink_time_rate: 60,
            shrink_time_player_rate: 24,
            min_border_radius: 10,
            local_testing: true,
        }
    }

    fn test_world() -> GameWorld {
        let mut points: HashMap<String, Vec<Position>> = HashMap::new();
        points.insert(
            data_point::SPAWN.to_string(),
            vec![
                Position::new(-100.0, 64.0, -100.0),
                Position::new(100.0, 64.0, -100.0),
                Position::new(-100.0, 64.0, 100.0),
                Position::new(100.0, 64.0, 100.0),
            ],
        );
        points.insert(data_point::CENTER.to_string(), vec![Position::new(0.0, 64.0, 0.0)]);
        points.insert(data_point::BORDER.to_string(), vec![Position::new(256.0, 64.0, 256.0)]);
        points.insert(
            data_point::TIER1_CHEST.to_string(),
            vec![Position::new(10.0, 64.0, 10.0)],
        );
        GameWorld::new("arena", points)
    }

    fn test_services(config: &Config, outbound: &broadcast::Sender<HostMsg>) -> GameServices {
        let api = HostApiClient::new(config);
        let prefixes = PrefixModule::new(DataStoreClient::new(api.clone()), true);
        GameServices {
            stats: StatsClient::new(api.clone()),
            leaderboards: LeaderboardClient::new(api.clone()),
            prefixes: Arc::clone(&prefixes),
            chat: ChatModule::new(prefixes),
            world_demo: WorldDemoModule::new(
                WorldStoreClient::new(api, config.world_bucket.clone()),
                config.assets_dir.join("demo-worlds"),
                outbound.clone(),
            ),
        }
    }

    struct Harness {
        dispatcher: EventDispatcher,
        game: SurvivalGames,
        outbound: broadcast::Receiver<HostMsg>,
        sessions: Arc<SessionRegistry>,
        _assets: tempfile::TempDir,
    }

    fn harness() -> Harness {
        harness_with_min_players(2)
    }

    fn harness_with_min_players(min_players: usize) -> Harness {
        let assets = tempfile::tempdir().unwrap();
        loot::write_default_tables(assets.path()).unwrap();
        let mut config = test_config(assets.path());
        config.min_players = min_players;

        let (tx, rx) = broadcast::channel(512);
        let services = test_services(&config, &tx);
        let sessions = Arc::new(SessionRegistry::new());
        let loot = LootMechanic::load(&config.assets_dir).unwrap();
        let mut game = SurvivalGames::new(
            &config,
            test_world(),
            loot,
            Arc::clone(&sessions),
            services,
            tx,
        );
        let dispatcher = GameCycle::dispatcher();
        game.request_game_state(GameState::PreStart);
        dispatcher.settle(&mut game);

        Harness { dispatcher, game, outbound: rx, sessions, _assets: assets }
    }

    impl Harness {
        fn join(&mut self, name: &str) -> Uuid {
            let id = Uuid::new_v4();
            self.sessions.insert(PlayerSession::new(id, name));
            self.dispatcher
                .handle(&mut self.game, HostEvent::PlayerJoin { player: id });
            id
        }

        fn tick(&mut self) {
            self.game.step();
            self.dispatcher.settle(&mut self.game);
        }

        fn drain_messages(&mut self) -> Vec<HostMsg> {
            let mut out = Vec::new();
            while let Ok(msg) = self.outbound.try_recv() {
                out.push(msg);
            }
            out
        }
    }

    #[test]
    fn match_starts_at_min_players() {
        let mut h = harness();
        h.join("alex");
        assert_eq!(h.game.state(), GameState::PreStart);

        h.join("sam");
        assert_eq!(h.game.state(), GameState::Started);
        assert_eq!(h.game.alive_count(), 2);
    }

    #[test]
    fn start_grants_kit_and_spawns() {
        let mut h = harness();
        let alex = h.join("alex");
        h.join("sam");

        let (mode, helmet, position) = h
            .sessions
            .read(alex, |s| (s.game_mode, s.equipment.helmet, s.position))
            .unwrap();
        assert_eq!(mode, GameMode::Adventure);
        assert_eq!(helmet, Some(Material::LeatherHelmet));
        // teleported to one of the arena spawns
        assert!(position.x.abs() == 100.0 && position.z.abs() == 100.0);
    }

    #[test]
    fn death_is_deferred_one_step() {
        let mut h = harness_with_min_players(3);
        let alex = h.join("alex");
        h.join("sam");
        h.join("kim");
        assert_eq!(h.game.alive_count(), 3);

        h.dispatcher
            .handle(&mut h.game, HostEvent::PlayerDeath { player: alex });
        // still alive until the next simulation step drains the queue
        assert_eq!(h.game.player_state(alex), Some(PlayerState::Alive));
        assert_eq!(h.game.alive_count(), 3);

        h.tick();
        assert_eq!(h.game.player_state(alex), Some(PlayerState::Eliminated));
        assert_eq!(h.game.alive_count(), 2);
        assert_eq!(h.game.state(), GameState::Started);
    }

    #[test]
    fn death_of_a_spectator_is_ignored() {
        let mut h = harness();
        h.join("alex");
        h.join("sam");
        let kim = h.join("kim");
        assert_eq!(h.game.player_state(kim), Some(PlayerState::Spectator));

        let cancelled = h
            .dispatcher
            .handle(&mut h.game, HostEvent::PlayerDeath { player: kim });
        h.tick();

        assert!(!cancelled);
        assert_eq!(h.game.player_state(kim), Some(PlayerState::Spectator));
        assert_eq!(h.game.alive_count(), 2);
    }

    #[test]
    fn quit_before_deferred_elimination_stays_untracked() {
        let mut h = harness_with_min_players(3);
        let alex = h.join("alex");
        h.join("sam");
        h.join("kim");

        h.dispatcher
            .handle(&mut h.game, HostEvent::PlayerDeath { player: alex });
        h.dispatcher
            .handle(&mut h.game, HostEvent::PlayerQuit { player: alex });
        assert_eq!(h.game.player_state(alex), None);
        h.drain_messages();

        h.tick();

        // the deferred elimination must not re-track the departed player
        assert_eq!(h.game.player_state(alex), None);
        assert_eq!(h.game.alive_count(), 2);
        let messages = h.drain_messages();
        assert!(!messages
            .iter()
            .any(|m| matches!(m, HostMsg::PlayerStateChanged { player, .. } if *player == alex)));
    }

    #[test]
    fn last_elimination_ends_the_match() {
        let mut h = harness();
        let alex = h.join("alex");
        let sam = h.join("sam");
        h.drain_messages();

        h.dispatcher
            .handle(&mut h.game, HostEvent::PlayerDeath { player: alex });
        h.tick();

        assert_eq!(h.game.state(), GameState::Ended);
        let messages = h.drain_messages();
        assert!(messages.iter().any(|m| matches!(
            m,
            HostMsg::Announce { message } if message.contains("sam won")
        )));
        assert_eq!(h.game.player_state(sam), Some(PlayerState::Alive));
    }

    #[test]
    fn kill_is_attributed_to_last_damager() {
        let mut h = harness();
        let alex = h.join("alex");
        let sam = h.join("sam");
        h.join("kim");
        h.drain_messages();

        h.dispatcher.handle(
            &mut h.game,
            HostEvent::Damage {
                victim: alex,
                attacker: Some(sam),
                cause: DamageCause::Attack,
                amount: 4.0,
            },
        );
        h.dispatcher
            .handle(&mut h.game, HostEvent::PlayerDeath { player: alex });
        h.tick();

        let messages = h.drain_messages();
        assert!(messages.iter().any(|m| matches!(
            m,
            HostMsg::Announce { message } if message.contains("alex was slain by sam")
        )));
    }

    #[test]
    fn quit_during_match_eliminates() {
        let mut h = harness_with_min_players(3);
        let alex = h.join("alex");
        h.join("sam");
        h.join("kim");

        h.dispatcher
            .handle(&mut h.game, HostEvent::PlayerQuit { player: alex });

        assert_eq!(h.game.player_state(alex), None);
        assert_eq!(h.game.alive_count(), 2);
        assert_eq!(h.game.state(), GameState::Started);
    }

    #[test]
    fn spectator_quit_leaves_without_elimination() {
        let mut h = harness();
        h.join("alex");
        h.join("sam");
        let kim = h.join("kim");
        assert_eq!(h.game.player_state(kim), Some(PlayerState::Spectator));
        h.drain_messages();

        h.dispatcher
            .handle(&mut h.game, HostEvent::PlayerQuit { player: kim });

        assert_eq!(h.game.player_state(kim), None);
        assert_eq!(h.game.alive_count(), 2);
        let messages = h.drain_messages();
        assert!(!messages
            .iter()
            .any(|m| matches!(m, HostMsg::PlayerStateChanged { player, .. } if *player == kim)));
    }

    #[test]
    fn late_join_spectates() {
        let mut h = harness();
        h.join("alex");
        h.join("sam");
        assert_eq!(h.game.state(), GameState::Started);

        let kim = h.join("kim");
        assert_eq!(h.game.player_state(kim), Some(PlayerState::Spectator));
        assert_eq!(h.game.alive_count(), 2);
        assert_eq!(
            h.sessions.read(kim, |s| s.game_mode),
            Some(GameMode::Spectator)
        );
    }

    #[test]
    fn repeated_state_request_is_idempotent() {
        let mut h = harness();
        h.join("alex");
        h.join("sam");
        h.drain_messages();

        h.game.request_game_state(GameState::Started);
        h.dispatcher.settle(&mut h.game);

        let changes = h
            .drain_messages()
            .into_iter()
            .filter(|m| matches!(m, HostMsg::GameStateChanged { .. }))
            .count();
        assert_eq!(changes, 0);
    }

    #[test]
    fn repeated_player_state_set_notifies_once() {
        let mut h = harness();
        let alex = h.join("alex");
        h.join("sam");
        h.join("kim");
        h.drain_messages();

        h.game.set_player_state(alex, PlayerState::Eliminated);
        h.dispatcher.settle(&mut h.game);
        h.game.set_player_state(alex, PlayerState::Eliminated);
        h.dispatcher.settle(&mut h.game);

        let changes = h
            .drain_messages()
            .into_iter()
            .filter(|m| matches!(m, HostMsg::PlayerStateChanged { player, .. } if *player == alex))
            .count();
        assert_eq!(changes, 1);
    }

    #[test]
    fn alive_set_tracks_alive_states() {
        let mut h = harness();
        let alex = h.join("alex");
        let sam = h.join("sam");
        let kim = h.join("kim");

        h.game.set_player_state(alex, PlayerState::Eliminated);
        h.dispatcher.settle(&mut h.game);

        let alive: std::collections::HashSet<_> = h.game.alive_players().into_iter().collect();
        for player in [alex, sam, kim] {
            let is_alive = h.game.player_state(player).map(PlayerState::is_alive);
            assert_eq!(alive.contains(&player), is_alive == Some(true));
        }
    }

    #[test]
    fn cancelled_transition_does_not_apply() {
        fn veto_everything(_game: &mut SurvivalGames, ctx: &mut EventCtx) {
            ctx.cancel();
        }

        let mut h = harness();
        h.dispatcher
            .listen(EventKind::GameStateChanging, StateSet::ANY, veto_everything);
        h.join("alex");
        h.join("sam");

        assert_eq!(h.game.state(), GameState::PreStart);
    }

    #[test]
    fn damage_outside_match_is_cancelled() {
        let mut h = harness();
        let alex = h.join("alex");

        let cancelled = h.dispatcher.handle(
            &mut h.game,
            HostEvent::Damage {
                victim: alex,
                attacker: None,
                cause: DamageCause::Fall,
                amount: 2.0,
            },
        );
        assert!(cancelled);
    }

    #[test]
    fn elimination_retargets_border() {
        let mut h = harness();
        let alex = h.join("alex");
        h.join("sam");
        h.join("kim");
        h.drain_messages();

        h.dispatcher
            .handle(&mut h.game, HostEvent::PlayerDeath { player: alex });
        h.tick();

        let messages = h.drain_messages();
        assert!(messages
            .iter()
            .any(|m| matches!(m, HostMsg::BorderShrink { .. })));
    }

    #[test]
    fn ended_match_cleans_up_after_linger() {
        let mut h = harness();
        let alex = h.join("alex");
        h.join("sam");

        h.dispatcher
            .handle(&mut h.game, HostEvent::PlayerDeath { player: alex });
        h.tick();
        assert_eq!(h.game.state(), GameState::Ended);

        // the results linger for five seconds of simulation time
        for _ in 0..=crate::util::time::secs_to_ticks(5) {
            h.tick();
        }
        assert_eq!(h.game.state(), GameState::CleaningUp);
        assert_eq!(h.game.alive_count(), 0);
    }

    #[test]
    fn chest_open_fills_inventory_once_per_cooldown() {
        let mut h = harness();
        let alex = h.join("alex");
        h.join("sam");
        let chest = Position::new(10.0, 64.0, 10.0);

        h.dispatcher.handle(
            &mut h.game,
            HostEvent::OpenContainer { player: alex, position: chest },
        );
        let first = h.sessions.read(alex, |s| s.inventory.len()).unwrap();
        assert!(first > 0);

        // immediate reopen is inside the refill cooldown
        h.dispatcher.handle(
            &mut h.game,
            HostEvent::OpenContainer { player: alex, position: chest },
        );
        let second = h.sessions.read(alex, |s| s.inventory.len()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn compass_spends_uses_and_reports_nearest() {
        let mut h = harness();
        let alex = h.join("alex");
        let sam = h.join("sam");
        h.sessions.update(alex, |s| {
            s.inventory.push(crate::game::compass::create_tracking_compass(2));
        });
        // move sam right next to alex so distances are known
        let origin = h.sessions.read(alex, |s| s.position).unwrap();
        h.sessions.update(sam, |s| s.position = Position::new(origin.x + 3.0, origin.y, origin.z));
        h.drain_messages();

        h.dispatcher.handle(
            &mut h.game,
            HostEvent::Interact { player: alex, item: Some(Material::TrackingCompass) },
        );
        let messages = h.drain_messages();
        assert!(messages.iter().any(|m| matches!(
            m,
            HostMsg::PlayerMessage { player, message }
                if *player == alex && message.contains("sam")
        )));
        let uses = h
            .sessions
            .read(alex, |s| s.inventory.iter().find_map(|i| i.uses))
            .unwrap();
        assert_eq!(uses, Some(1));

        // the second use consumes the compass
        h.dispatcher.handle(
            &mut h.game,
            HostEvent::Interact { player: alex, item: Some(Material::TrackingCompass) },
        );
        let has_compass = h
            .sessions
            .read(alex, |s| {
                s.inventory.iter().any(|i| i.material == Material::TrackingCompass)
            })
            .unwrap();
        assert!(!has_compass);
    }

    #[test]
    fn soup_heals_and_is_consumed() {
        let mut h = harness();
        let alex = h.join("alex");
        h.join("sam");
        h.sessions.update(alex, |s| {
            s.food_level = 10;
            s.inventory.push(crate::host::session::ItemStack::of(Material::MushroomStew));
        });

        let cancelled = h.dispatcher.handle(
            &mut h.game,
            HostEvent::Consume { player: alex, item: Material::MushroomStew },
        );

        assert!(cancelled);
        let (food, has_stew) = h
            .sessions
            .read(alex, |s| {
                (
                    s.food_level,
                    s.inventory.iter().any(|i| i.material == Material::MushroomStew),
                )
            })
            .unwrap();
        assert_eq!(food, 13);
        assert!(!has_stew);
    }

    #[test]
    fn chat_renders_through_modules() {
        let mut h = harness();
        let alex = h.join("alex");
        h.game.services_for_tests().prefixes.set(alex, "VIP".to_string());
        h.drain_messages();

        h.dispatcher.handle(
            &mut h.game,
            HostEvent::Chat { player: alex, message: "hello".to_string() },
        );

        let messages = h.drain_messages();
        assert!(messages.iter().any(|m| matches!(
            m,
            HostMsg::ChatLine { message } if message == "[VIP] alex: hello"
        )));
    }

    #[tokio::test]
    async fn cycle_task_starts_a_match_from_host_events() {
        use std::time::Duration;

        let assets = tempfile::tempdir().unwrap();
        loot::write_default_tables(assets.path()).unwrap();
        let config = test_config(assets.path());

        let (out_tx, mut out_rx) = broadcast::channel(512);
        let services = test_services(&config, &out_tx);
        let sessions = Arc::new(SessionRegistry::new());
        let (ev_tx, ev_rx) = mpsc::channel(64);

        let cycle = GameCycle::new(config, Arc::clone(&sessions), services, ev_rx, out_tx);
        let task = tokio::spawn(cycle.run());

        for name in ["alex", "sam"] {
            let id = Uuid::new_v4();
            sessions.insert(PlayerSession::new(id, name));
            ev_tx.send(HostEvent::PlayerJoin { player: id }).await.unwrap();
        }

        let started = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match out_rx.recv().await {
                    Ok(HostMsg::GameStateChanged { to: GameState::Started, .. }) => break true,
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break false,
                }
            }
        })
        .await
        .unwrap();
        assert!(started);

        // closing the event channel stops the cycle cleanly
        drop(ev_tx);
        task.await.unwrap().unwrap();
    }
}
