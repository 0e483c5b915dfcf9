//! Tracking compass: points at the nearest living opponent
//!
//! Each compass carries a limited number of uses; loot chests drop five-use
//! compasses.

use uuid::Uuid;

use crate::host::session::{ItemStack, Material};

use super::dispatch::EventCtx;
use super::state::PlayerState;
use super::survival::SurvivalGames;
use super::text;
use super::{GameEvent, HostEvent};

pub fn create_tracking_compass(uses: u32) -> ItemStack {
    ItemStack {
        material: Material::TrackingCompass,
        amount: 1,
        uses: Some(uses),
    }
}

/// Use a compass charge to locate the nearest other alive participant
pub fn use_compass(game: &mut SurvivalGames, ctx: &mut EventCtx) {
    let GameEvent::Host(HostEvent::Interact { player, item: Some(Material::TrackingCompass) }) =
        ctx.event
    else {
        return;
    };
    if !game.player_state(*player).map(PlayerState::is_alive).unwrap_or(false) {
        return;
    }
    let Some(origin) = game.sessions().read(*player, |s| s.position) else {
        return;
    };

    let nearest = game
        .alive_players()
        .into_iter()
        .filter(|id| id != player)
        .filter_map(|id| {
            game.sessions()
                .read(id, |s| (id, s.name.clone(), origin.horizontal_distance(&s.position)))
        })
        .min_by(|a, b| a.2.total_cmp(&b.2));

    let Some((_, name, distance)) = nearest else {
        game.message(*player, "No other players to track".to_string());
        return;
    };

    let remaining = spend_use(game, *player);
    game.message(*player, text::compass_target(&name, distance));
    if let Some(uses) = remaining {
        game.message(*player, text::compass_uses_left(uses));
    }
}

/// Decrement the held compass's uses, removing it when spent.
///
/// Returns the remaining uses, `None` when the compass was consumed or
/// unlimited.
fn spend_use(game: &mut SurvivalGames, player: Uuid) -> Option<u32> {
    game.sessions()
        .update(player, |s| {
            let index = s
                .inventory
                .iter()
                .position(|i| i.material == Material::TrackingCompass)?;
            let uses = s.inventory[index].uses?;
            if uses <= 1 {
                s.inventory.remove(index);
                None
            } else {
                let remaining = uses - 1;
                s.inventory[index].uses = Some(remaining);
                Some(remaining)
            }
        })
        .flatten()
}
