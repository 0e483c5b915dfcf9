//! Application state: every collaborator is constructed here and handed to
//! the components that need it

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use crate::config::Config;
use crate::game::{GameServices, HostEvent, HostMsg};
use crate::host::api::HostApiClient;
use crate::host::data::DataStoreClient;
use crate::host::session::SessionRegistry;
use crate::host::stats::{LeaderboardClient, StatsClient};
use crate::host::world::WorldStoreClient;
use crate::modules::{ChatModule, PrefixModule, WorldDemoModule};

/// Capacity of the inbound host event queue
const EVENT_QUEUE_DEPTH: usize = 1024;
/// Capacity of the outbound message fanout
const OUTBOUND_DEPTH: usize = 1024;

/// Shared application state
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: Arc<SessionRegistry>,
    pub services: GameServices,
    /// Producer half of the host event queue
    pub events: mpsc::Sender<HostEvent>,
    pub outbound: broadcast::Sender<HostMsg>,
}

impl AppState {
    /// Wire up the full collaborator graph.
    ///
    /// Returns the state plus the receiver the game cycle consumes from.
    pub fn new(config: Config) -> (Self, mpsc::Receiver<HostEvent>) {
        let config = Arc::new(config);

        let api = HostApiClient::new(&config);
        let (outbound, _) = broadcast::channel(OUTBOUND_DEPTH);
        let (events, events_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);

        let prefixes = PrefixModule::new(DataStoreClient::new(api.clone()), config.local_testing);
        let services = GameServices {
            stats: StatsClient::new(api.clone()),
            leaderboards: LeaderboardClient::new(api.clone()),
            prefixes: Arc::clone(&prefixes),
            chat: ChatModule::new(prefixes),
            world_demo: WorldDemoModule::new(
                WorldStoreClient::new(api, config.world_bucket.clone()),
                config.world_templates_dir.join("demo"),
                outbound.clone(),
            ),
        };

        let state = Self {
            config,
            sessions: Arc::new(SessionRegistry::new()),
            services,
            events,
            outbound,
        };
        (state, events_rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn test_config() -> Config {
        Config {
            log_level: "info".into(),
            host_api_url: "http://localhost".into(),
            host_api_key: "test".into(),
            assets_dir: "assets/configs".into(),
            world_templates_dir: "assets/world-templates".into(),
            world_bucket: "DemoWorlds".into(),
            min_players: 2,
            shrink_time_rate: 60,
            shrink_time_player_rate: 24,
            min_border_radius: 10,
            local_testing: true,
        }
    }

    #[test]
    fn event_sender_feeds_the_cycle_receiver() {
        let (state, mut events_rx) = AppState::new(test_config());
        let player = Uuid::new_v4();

        state
            .events
            .try_send(HostEvent::PlayerJoin { player })
            .unwrap();

        assert!(matches!(
            events_rx.try_recv(),
            Ok(HostEvent::PlayerJoin { player: p }) if p == player
        ));
    }
}
