//! Time utilities for the simulation loop

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Minecraft-style tick rate
pub const TICKS_PER_SECOND: u32 = 20;

/// Simulation step rate; the deferred-action queue drains once per step
pub const STEP_MILLIS: u64 = 1_000 / TICKS_PER_SECOND as u64;

/// Convert seconds to game ticks
pub fn secs_to_ticks(secs: u32) -> u32 {
    secs * TICKS_PER_SECOND
}

/// Duration of a single simulation step
pub fn step_duration() -> Duration {
    Duration::from_millis(STEP_MILLIS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_convert_to_ticks() {
        assert_eq!(secs_to_ticks(5), 100);
        assert_eq!(secs_to_ticks(0), 0);
    }

    #[test]
    fn step_matches_tick_rate() {
        assert_eq!(step_duration().as_millis() as u64 * TICKS_PER_SECOND as u64, 1_000);
    }
}
