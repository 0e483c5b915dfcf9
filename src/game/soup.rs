//! Healing soup: mushroom stew heals instead of feeding

use crate::host::session::{EffectKind, Material};
use crate::util::time::secs_to_ticks;

use super::dispatch::EventCtx;
use super::state::PlayerState;
use super::survival::SurvivalGames;
use super::{GameEvent, HostEvent};

const REGEN_SECS: u32 = 4;
const FOOD_RESTORED: u32 = 3;

/// Consume a mushroom stew for regeneration and a little food
///
/// The default consume outcome is cancelled so the stew acts as an instant
/// heal item rather than slow food.
pub fn drink_soup(game: &mut SurvivalGames, ctx: &mut EventCtx) {
    let GameEvent::Host(HostEvent::Consume { player, item: Material::MushroomStew }) = ctx.event
    else {
        return;
    };
    if !game.player_state(*player).map(PlayerState::is_alive).unwrap_or(false) {
        return;
    }
    let consumed = game
        .sessions()
        .update(*player, |s| {
            let Some(index) = s
                .inventory
                .iter()
                .position(|i| i.material == Material::MushroomStew)
            else {
                return false;
            };
            if s.inventory[index].amount > 1 {
                s.inventory[index].amount -= 1;
            } else {
                s.inventory.remove(index);
            }
            s.add_effect(EffectKind::Regeneration, secs_to_ticks(REGEN_SECS));
            s.food_level = (s.food_level + FOOD_RESTORED).min(20);
            true
        })
        .unwrap_or(false);
    if consumed {
        ctx.cancel();
    }
}
