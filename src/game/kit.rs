//! The single starter kit every participant plays with

use crate::host::session::{
    EffectKind, ItemStack, Material, PlayerSession, EFFECT_UNTIL_REMOVED,
};

use super::dispatch::EventCtx;
use super::state::PlayerState;
use super::survival::SurvivalGames;
use super::{DamageCause, GameEvent, HostEvent};

/// Fall damage immunity
pub const WEIGHTLESS: &str = "weightless";
/// Invisibility while sneaking
pub const SNEAKY: &str = "sneaky";

/// Grant the starter kit: leather armor, a stone sword and both abilities
pub fn grant(session: &mut PlayerSession) {
    session.equipment.helmet = Some(Material::LeatherHelmet);
    session.equipment.chestplate = Some(Material::LeatherChestplate);
    session.equipment.leggings = Some(Material::LeatherLeggings);
    session.equipment.boots = Some(Material::LeatherBoots);
    session.equipment.main_hand = Some(ItemStack::of(Material::StoneSword));
    session.abilities.push(WEIGHTLESS);
    session.abilities.push(SNEAKY);
}

/// Remove kit abilities and their lingering effects
pub fn strip(session: &mut PlayerSession) {
    session.abilities.clear();
    session.remove_effect(EffectKind::Invisibility);
}

/// Cancel fall damage for sessions carrying the weightless ability
pub fn cancel_fall_damage(game: &mut SurvivalGames, ctx: &mut EventCtx) {
    if let GameEvent::Host(HostEvent::Damage { victim, cause: DamageCause::Fall, .. }) = ctx.event {
        let weightless = game
            .sessions()
            .read(*victim, |s| s.has_ability(WEIGHTLESS))
            .unwrap_or(false);
        if weightless {
            ctx.cancel();
        }
    }
}

/// Toggle invisibility with sneaking for alive sneaky sessions
pub fn sneak_invisibility(game: &mut SurvivalGames, ctx: &mut EventCtx) {
    let GameEvent::Host(HostEvent::SneakToggle { player, sneaking }) = ctx.event else {
        return;
    };
    let alive = game.player_state(*player).map(PlayerState::is_alive).unwrap_or(false);
    game.sessions().update(*player, |s| {
        if *sneaking && alive && s.has_ability(SNEAKY) {
            s.add_effect(EffectKind::Invisibility, EFFECT_UNTIL_REMOVED);
        } else {
            s.remove_effect(EffectKind::Invisibility);
        }
    });
}
