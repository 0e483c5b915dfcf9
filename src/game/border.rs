//! World border shrink pacing
//!
//! The border starts at the map's configured size and shrinks towards the
//! minimum as players are eliminated. Shrink time scales with the share of
//! the original lobby still alive, so a busy match shrinks slowly and a
//! near-final duel closes fast.

use crate::host::world::WorldBorder;

/// Seconds a shrink from `current_size` should take.
///
/// `current_size / initial_size` discounts time already shrunk away;
/// `alive * (player_rate / initial_players)` scales with the alive share.
pub fn shrink_seconds(
    current_size: f64,
    initial_size: f64,
    alive: usize,
    initial_players: usize,
    base_rate: u32,
    player_rate: u32,
) -> u32 {
    let initial_players = initial_players.max(1) as f64;
    let size_factor = if initial_size > 0.0 { current_size / initial_size } else { 1.0 };
    let player_factor = alive as f64 * (player_rate as f64 / initial_players);
    let seconds = size_factor * player_factor * base_rate as f64;
    (seconds.round() as u32).max(1)
}

/// Per-match border pacing state
#[derive(Debug, Clone)]
pub struct BorderMechanic {
    base_rate: u32,
    player_rate: u32,
    min_size: f64,
    initial_size: f64,
    initial_players: usize,
}

impl BorderMechanic {
    pub fn new(base_rate: u32, player_rate: u32, min_size: f64) -> Self {
        Self {
            base_rate,
            player_rate,
            min_size,
            initial_size: 0.0,
            initial_players: 0,
        }
    }

    /// Apply the game's border damage settings and record the starting size
    pub fn arm(&mut self, border: &mut WorldBorder, initial_players: usize) {
        border.damage_per_second = 0.1;
        border.damage_buffer = 0.0;
        border.warning_distance = 10;
        self.initial_size = border.size;
        self.initial_players = initial_players;
    }

    /// Recompute the shrink target for the current alive count.
    ///
    /// Returns the shrink duration so the caller can announce it.
    pub fn retarget(&self, border: &mut WorldBorder, alive: usize) -> u32 {
        let seconds = shrink_seconds(
            border.size,
            self.initial_size,
            alive,
            self.initial_players,
            self.base_rate,
            self.player_rate,
        );
        border.shrink_to(self.min_size, seconds);
        seconds
    }

    pub fn min_size(&self) -> f64 {
        self.min_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::world::{Position, WorldBorder};

    #[test]
    fn full_lobby_full_border() {
        // untouched 512 border, 5 of 10 players alive, rates 60/24
        assert_eq!(shrink_seconds(512.0, 512.0, 5, 10, 60, 24), 720);
    }

    #[test]
    fn shrunk_border_discounts_time() {
        let full = shrink_seconds(512.0, 512.0, 5, 10, 60, 24);
        let half = shrink_seconds(256.0, 512.0, 5, 10, 60, 24);
        assert_eq!(half * 2, full);
    }

    #[test]
    fn fewer_alive_shrinks_faster() {
        let five = shrink_seconds(512.0, 512.0, 5, 10, 60, 24);
        let two = shrink_seconds(512.0, 512.0, 2, 10, 60, 24);
        assert!(two < five);
    }

    #[test]
    fn degenerate_inputs_stay_positive() {
        assert!(shrink_seconds(0.0, 512.0, 0, 0, 60, 24) >= 1);
    }

    #[test]
    fn retarget_sets_border_target() {
        let mut border = WorldBorder::new(Position::ORIGIN, 512.0);
        let mut mechanic = BorderMechanic::new(60, 24, 10.0);
        mechanic.arm(&mut border, 10);

        let seconds = mechanic.retarget(&mut border, 5);

        assert_eq!(seconds, 720);
        let target = border.target.expect("border should be shrinking");
        assert_eq!(target.size, 10.0);
        assert_eq!(target.remaining_ticks, 720 * crate::util::time::TICKS_PER_SECOND);
        assert_eq!(border.damage_per_second, 0.1);
        assert_eq!(border.warning_distance, 10);
    }
}
