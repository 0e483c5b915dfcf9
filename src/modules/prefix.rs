//! Per-player chat prefixes with persistent storage
//!
//! The cache is striped across a handful of locks so chat rendering (read
//! heavy) never contends with prefix updates on other players.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;
use uuid::Uuid;

use crate::host::data::DataStoreClient;

const SHARDS: usize = 4;
const COLLECTION: &str = "chat_prefixes";

/// Stored prefix record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPrefix {
    pub player_id: Uuid,
    pub prefix: String,
}

/// In-memory prefix cache backed by the data store
pub struct PrefixModule {
    shards: [RwLock<HashMap<Uuid, String>>; SHARDS],
    data: DataStoreClient,
    /// Skip persistence, keeping the cache purely in-memory
    cache_only: bool,
}

impl PrefixModule {
    pub fn new(data: DataStoreClient, cache_only: bool) -> Arc<Self> {
        Arc::new(Self {
            shards: Default::default(),
            data,
            cache_only,
        })
    }

    fn shard(&self, player: Uuid) -> &RwLock<HashMap<Uuid, String>> {
        &self.shards[(player.as_u128() % SHARDS as u128) as usize]
    }

    pub fn get(&self, player: Uuid) -> Option<String> {
        self.shard(player).read().get(&player).cloned()
    }

    /// Set a player's prefix and persist it
    pub fn set(&self, player: Uuid, prefix: String) {
        self.shard(player).write().insert(player, prefix.clone());
        if !self.cache_only {
            self.data
                .store_detached(COLLECTION, player.to_string(), UserPrefix { player_id: player, prefix });
        }
    }

    /// Clear a player's prefix and remove the stored record
    pub fn clear(&self, player: Uuid) {
        self.shard(player).write().remove(&player);
        if !self.cache_only {
            self.data.remove_detached(COLLECTION, player.to_string());
        }
    }

    /// Populate the cache for a joining player
    pub fn load_on_join(self: &Arc<Self>, player: Uuid) {
        if self.cache_only {
            return;
        }
        let this = Arc::clone(self);
        tokio::spawn(async move {
            match this.data.load::<UserPrefix>(COLLECTION, &player.to_string()).await {
                Ok(Some(record)) => {
                    this.shard(player).write().insert(player, record.prefix);
                }
                Ok(None) => {}
                Err(e) => warn!(%player, "Failed to load chat prefix: {}", e),
            }
        });
    }

    /// Drop the cache entry when a player disconnects
    pub fn evict(&self, player: Uuid) {
        self.shard(player).write().remove(&player);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::host::api::HostApiClient;

    fn module() -> Arc<PrefixModule> {
        let config = Config {
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
        };
        PrefixModule::new(DataStoreClient::new(HostApiClient::new(&config)), true)
    }

    #[test]
    fn set_get_clear() {
        let module = module();
        let player = Uuid::new_v4();

        assert_eq!(module.get(player), None);
        module.set(player, "MVP".to_string());
        assert_eq!(module.get(player), Some("MVP".to_string()));
        module.clear(player);
        assert_eq!(module.get(player), None);
    }

    #[test]
    fn players_stripe_across_shards_independently() {
        let module = module();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        module.set(a, "A".to_string());
        module.set(b, "B".to_string());

        assert_eq!(module.get(a), Some("A".to_string()));
        assert_eq!(module.get(b), Some("B".to_string()));
        module.evict(a);
        assert_eq!(module.get(a), None);
        assert_eq!(module.get(b), Some("B".to_string()));
    }
}
