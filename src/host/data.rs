//! Structured data storage client
//!
//! Small JSON records keyed by (collection, key), used for things like chat
//! prefixes that must survive restarts.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::warn;

use super::api::{HostApiClient, HostApiError};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DataRecord {
    collection: String,
    key: String,
    value: serde_json::Value,
}

#[derive(Clone)]
pub struct DataStoreClient {
    client: HostApiClient,
}

impl DataStoreClient {
    pub fn new(client: HostApiClient) -> Self {
        Self { client }
    }

    /// Store a record, replacing any existing one under the same key
    pub async fn store<T: Serialize>(
        &self,
        collection: &str,
        key: &str,
        value: &T,
    ) -> Result<(), HostApiError> {
        let record = DataRecord {
            collection: collection.to_string(),
            key: key.to_string(),
            value: serde_json::to_value(value).map_err(|e| HostApiError::Api {
                status: 0,
                body: e.to_string(),
            })?,
        };
        self.client
            .upsert("data_store", &record, "collection,key")
            .await
    }

    /// Fire-and-forget store from synchronous game code.
    ///
    /// The value is serialized up front; the spawned task only carries the
    /// resulting JSON.
    pub fn store_detached<T: Serialize>(&self, collection: &'static str, key: String, value: T) {
        let value = match serde_json::to_value(&value) {
            Ok(v) => v,
            Err(e) => {
                warn!(collection, key, "Failed to serialize record: {}", e);
                return;
            }
        };
        let this = self.clone();
        tokio::spawn(async move {
            if let Err(e) = this.store(collection, &key, &value).await {
                warn!(collection, key, "Failed to store record: {}", e);
            }
        });
    }

    /// Load a record, `None` when absent
    pub async fn load<T: DeserializeOwned>(
        &self,
        collection: &str,
        key: &str,
    ) -> Result<Option<T>, HostApiError> {
        let query = format!("collection=eq.{}&key=eq.{}", collection, key);
        let record: Option<DataRecord> = self.client.get_one("data_store", &query).await?;
        match record {
            Some(r) => serde_json::from_value(r.value)
                .map(Some)
                .map_err(|e| HostApiError::Api { status: 0, body: e.to_string() }),
            None => Ok(None),
        }
    }

    /// Remove a record if it exists
    pub async fn remove(&self, collection: &str, key: &str) -> Result<(), HostApiError> {
        let query = format!("collection=eq.{}&key=eq.{}", collection, key);
        self.client.delete("data_store", &query).await
    }

    /// Fire-and-forget removal from synchronous game code
    pub fn remove_detached(&self, collection: &'static str, key: String) {
        let this = self.clone();
        tokio::spawn(async move {
            if let Err(e) = this.remove(collection, &key).await {
                warn!(collection, key, "Failed to remove record: {}", e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::cell::Cell;

    fn client() -> DataStoreClient {
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
        DataStoreClient::new(HostApiClient::new(&config))
    }

    #[tokio::test]
    async fn store_detached_accepts_send_only_values() {
        let data = client();
        // Cell is Send but not Sync; only the serialized JSON crosses into
        // the spawned task
        data.store_detached("test_records", "counter".to_string(), Cell::new(7u32));
        data.store_detached("test_records", "text".to_string(), "hello");
    }
}
