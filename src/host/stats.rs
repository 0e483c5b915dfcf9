//! Player statistic and leaderboard clients

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use super::api::{HostApiClient, HostApiError};

/// Statistic names awarded by the game
pub mod stat {
    pub const WINS: &str = "Wins";
    pub const KILLS: &str = "Kills";
    pub const DEATHS: &str = "Deaths";
}

#[derive(Debug, Clone, Serialize)]
struct StatIncrement<'a> {
    player_id: Uuid,
    stat_name: &'a str,
    amount: i64,
}

/// Persistent per-player statistics
#[derive(Clone)]
pub struct StatsClient {
    client: HostApiClient,
}

impl StatsClient {
    pub fn new(client: HostApiClient) -> Self {
        Self { client }
    }

    /// Award `amount` to a named stat for one player
    pub async fn award(
        &self,
        player_id: Uuid,
        stat_name: &str,
        amount: i64,
    ) -> Result<(), HostApiError> {
        let args = StatIncrement { player_id, stat_name, amount };
        self.client.rpc("increment_stat", &args).await
    }

    /// Fire-and-forget stat award from synchronous game code
    pub fn award_detached(&self, player_id: Uuid, stat_name: &'static str, amount: i64) {
        let this = self.clone();
        tokio::spawn(async move {
            if let Err(e) = this.award(player_id, stat_name, amount).await {
                warn!(%player_id, stat_name, "Failed to award stat: {}", e);
            }
        });
    }
}

#[derive(Debug, Clone, Serialize)]
struct LeaderboardIncrement<'a> {
    player_id: Uuid,
    board: &'a str,
    amount: i64,
}

/// Ranked per-game leaderboards
#[derive(Clone)]
pub struct LeaderboardClient {
    client: HostApiClient,
}

impl LeaderboardClient {
    pub fn new(client: HostApiClient) -> Self {
        Self { client }
    }

    /// Increment a player's score on a named board
    pub async fn increment(
        &self,
        player_id: Uuid,
        board: &str,
        amount: i64,
    ) -> Result<(), HostApiError> {
        let args = LeaderboardIncrement { player_id, board, amount };
        self.client.rpc("increment_leaderboard", &args).await
    }

    /// Fire-and-forget leaderboard increment from synchronous game code
    pub fn increment_detached(&self, player_id: Uuid, board: &'static str, amount: i64) {
        let this = self.clone();
        tokio::spawn(async move {
            if let Err(e) = this.increment(player_id, board, amount).await {
                warn!(%player_id, board, "Failed to increment leaderboard: {}", e);
            }
        });
    }
}
