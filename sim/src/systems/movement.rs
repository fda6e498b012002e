//! Movement system - applies velocity to position and bounces off arena walls.

use crate::components::*;
use crate::config::BattleConfig;
use bevy_ecs::prelude::*;

/// Resource containing the delta time for the current tick.
#[derive(Resource, Default)]
pub struct DeltaTime(pub f32);

/// Resource containing the simulation time at the start of the current tick.
///
/// Conversion stamps and threshold lookups read this, so every system in a
/// tick sees the same instant.
#[derive(Resource, Default, Debug, Clone, Copy)]
pub struct SimTime(pub f32);

/// Advance one axis, bouncing if the step would push the body out of `[0, extent]`.
///
/// On a bounce the velocity flips and the position stays put for this tick.
#[inline]
fn step_axis(pos: &mut f32, vel: &mut f32, delta: f32, radius: f32, extent: f32) {
    let next = *pos + *vel * delta;
    if next - radius < 0.0 || next + radius > extent {
        *vel = -*vel;
    } else {
        *pos = next;
    }
}

/// System that applies velocity to position.
pub fn movement_system(
    dt: Res<DeltaTime>,
    config: Res<BattleConfig>,
    mut query: Query<(&mut Position, &mut Velocity, &Body)>,
) {
    let delta = dt.0;
    let (width, height) = (config.arena_width, config.arena_height);
    for (mut pos, mut vel, body) in query.iter_mut() {
        let (pos, vel) = (&mut *pos, &mut *vel);
        step_axis(&mut pos.x, &mut vel.vx, delta, body.wall_radius, width);
        step_axis(&mut pos.y, &mut vel.vy, delta, body.wall_radius, height);
    }
}
