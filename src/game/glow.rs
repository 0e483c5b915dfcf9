//! Damage glow: combat briefly outlines the victim, invisibility included

use crate::host::session::EffectKind;
use crate::util::time::secs_to_ticks;

use super::dispatch::EventCtx;
use super::survival::SurvivalGames;
use super::{DamageCause, GameEvent, HostEvent};

const GLOW_SECS: u32 = 5;

/// Apply a glowing outline to players hit by another player
pub fn glow_on_damage(game: &mut SurvivalGames, ctx: &mut EventCtx) {
    if ctx.is_cancelled() {
        return;
    }
    let GameEvent::Host(HostEvent::Damage { victim, attacker: Some(_), cause, .. }) = ctx.event
    else {
        return;
    };
    if !matches!(cause, DamageCause::Attack | DamageCause::Projectile) {
        return;
    }
    game.sessions().update(*victim, |s| {
        s.add_effect(EffectKind::Glowing, secs_to_ticks(GLOW_SECS));
    });
}
