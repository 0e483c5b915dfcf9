//! Demo world management
//!
//! Lets operators load, unload and delete persistent demo worlds stored in
//! the platform world bucket, independent of the match world.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

use crate::game::HostMsg;
use crate::host::world::WorldStoreClient;

pub struct WorldDemoModule {
    store: WorldStoreClient,
    /// Local directory downloaded worlds unpack into
    worlds_dir: PathBuf,
    loaded: Mutex<HashSet<String>>,
    outbound: broadcast::Sender<HostMsg>,
}

impl WorldDemoModule {
    pub fn new(
        store: WorldStoreClient,
        worlds_dir: PathBuf,
        outbound: broadcast::Sender<HostMsg>,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            worlds_dir,
            loaded: Mutex::new(HashSet::new()),
            outbound,
        })
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.lock().contains(name)
    }

    fn reply(&self, player: Uuid, message: String) {
        let _ = self.outbound.send(HostMsg::PlayerMessage { player, message });
    }

    /// Download a stored world and mark it loaded
    pub fn load(self: &Arc<Self>, player: Uuid, name: String) {
        if self.is_loaded(&name) {
            self.reply(player, format!("World '{}' is already loaded", name));
            return;
        }
        let this = Arc::clone(self);
        tokio::spawn(async move {
            match this.store.load(&name).await {
                Ok(bytes) => {
                    let path = this.worlds_dir.join(&name);
                    if let Err(e) = tokio::fs::create_dir_all(&this.worlds_dir).await {
                        warn!(world = %name, "Failed to create worlds dir: {}", e);
                        this.reply(player, format!("Failed to load world '{}'", name));
                        return;
                    }
                    if let Err(e) = tokio::fs::write(&path, bytes).await {
                        warn!(world = %name, "Failed to write world: {}", e);
                        this.reply(player, format!("Failed to load world '{}'", name));
                        return;
                    }
                    this.loaded.lock().insert(name.clone());
                    info!(world = %name, "Demo world loaded");
                    this.reply(player, format!("World '{}' loaded", name));
                }
                Err(e) => {
                    warn!(world = %name, "Failed to download world: {}", e);
                    this.reply(player, format!("World '{}' could not be downloaded", name));
                }
            }
        });
    }

    /// Unload a previously loaded world
    pub fn unload(self: &Arc<Self>, player: Uuid, name: &str) {
        if self.loaded.lock().remove(name) {
            info!(world = %name, "Demo world unloaded");
            self.reply(player, format!("World '{}' unloaded", name));
        } else {
            self.reply(player, format!("World '{}' is not loaded", name));
        }
    }

    /// Delete a stored world from the bucket, unloading it first
    pub fn delete(self: &Arc<Self>, player: Uuid, name: String) {
        self.loaded.lock().remove(&name);
        let this = Arc::clone(self);
        tokio::spawn(async move {
            match this.store.delete(&name).await {
                Ok(()) => {
                    info!(world = %name, "Demo world deleted");
                    this.reply(player, format!("World '{}' deleted", name));
                }
                Err(e) => {
                    warn!(world = %name, "Failed to delete world: {}", e);
                    this.reply(player, format!("Failed to delete world '{}'", name));
                }
            }
        });
    }
}
