//! Player-facing message templates

pub const GAME_STARTING: &str = "The game has started. Good luck!";
pub const GAME_ENDED_NO_WINNER: &str = "The game is over. Nobody won!";
pub const WAITING_FOR_PLAYERS: &str = "Waiting for more players...";
pub const BORDER_SHRINKING: &str = "The border is shrinking!";

pub fn winner_was(name: &str) -> String {
    format!("The game is over. {} won!", name)
}

pub fn eliminated(name: &str) -> String {
    format!("{} has been eliminated!", name)
}

pub fn killed_by(victim: &str, killer: &str) -> String {
    format!("{} was slain by {}!", victim, killer)
}

pub fn players_needed(missing: usize) -> String {
    format!("Waiting for {} more player(s) to start", missing)
}

pub fn compass_target(name: &str, distance: f64) -> String {
    format!("Nearest player: {} ({:.0}m away)", name, distance)
}

pub fn compass_uses_left(uses: u32) -> String {
    format!("Tracking compass has {} use(s) left", uses)
}
