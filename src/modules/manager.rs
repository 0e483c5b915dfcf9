//! Operator game management command

use uuid::Uuid;

use crate::game::{GameState, SurvivalGames};

/// Handle `/game <subcommand>`
pub fn handle_game_command(game: &mut SurvivalGames, player: Uuid, args: &[String]) {
    match args.first().map(String::as_str) {
        Some("stop") => {
            if game.state() == GameState::Started {
                game.message(player, "Stopping the game".to_string());
                game.request_game_state(GameState::Ended);
            } else {
                game.message(player, "No running game to stop".to_string());
            }
        }
        Some("state") => {
            game.message(player, format!("Game state: {:?}", game.state()));
        }
        _ => {
            game.message(player, "Usage: /game <stop|state>".to_string());
        }
    }
}
