//! Render bridge
//!
//! Flattens a [`Snapshot`] into a contiguous `Vec<f32>` that a renderer
//! (a GPU instance buffer, a WebGL client, an engine plugin) can upload
//! without parsing JSON.
//!
//! # Buffer Layout (Version 1.0)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │ HEADER (HEADER_SIZE elements)                                   │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ [0] particle_count (as f32)                                     │
//! │ [1] dominant_team  (TEAM_A / TEAM_B)                            │
//! │ [2] time           (seconds)                                    │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ PARTICLE DATA (particle_count × PARTICLE_STRIDE elements)       │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ For each particle i (offset = HEADER_SIZE + i * STRIDE):        │
//! │   [+0] id       - Particle ID (u32 as f32)                      │
//! │   [+1] x        - X position                                    │
//! │   [+2] y        - Y position                                    │
//! │   [+3] vx       - X velocity (units/sec)                        │
//! │   [+4] vy       - Y velocity (units/sec)                        │
//! │   [+5] radius   - Collision radius                              │
//! │   [+6] team     - TEAM_A / TEAM_B                               │
//! │   [+7] flash    - 1.0 if converted during the last update       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Particles appear in snapshot order (ascending id), so the same snapshot
//! always produces the same buffer.

use crate::components::{ParticleId, Team};
use crate::world::Snapshot;
use std::collections::HashSet;

/// Number of f32 values per particle.
pub const PARTICLE_STRIDE: usize = 8;

/// Number of f32 values in the buffer header.
pub const HEADER_SIZE: usize = 3;

/// Team id: team A
pub const TEAM_A: f32 = 0.0;
/// Team id: team B
pub const TEAM_B: f32 = 1.0;

pub const FIELD_ID: usize = 0;
pub const FIELD_X: usize = 1;
pub const FIELD_Y: usize = 2;
pub const FIELD_VX: usize = 3;
pub const FIELD_VY: usize = 4;
pub const FIELD_RADIUS: usize = 5;
pub const FIELD_TEAM: usize = 6;
pub const FIELD_FLASH: usize = 7;

#[inline]
pub fn team_to_id(team: Team) -> f32 {
    match team {
        Team::A => TEAM_A,
        Team::B => TEAM_B,
    }
}

/// Flatten a snapshot into the render buffer.
pub fn snapshot_to_buffer(snapshot: &Snapshot) -> Vec<f32> {
    let mut buffer = Vec::with_capacity(calculate_buffer_size(snapshot.particles.len()));
    write_buffer(snapshot, &mut buffer);
    buffer
}

/// Like [`snapshot_to_buffer`], reusing `buffer`'s allocation.
pub fn write_buffer(snapshot: &Snapshot, buffer: &mut Vec<f32>) {
    buffer.clear();
    buffer.reserve(calculate_buffer_size(snapshot.particles.len()));

    buffer.push(snapshot.particles.len() as f32);
    buffer.push(team_to_id(snapshot.dominant));
    buffer.push(snapshot.time);

    let flashed: HashSet<ParticleId> = snapshot
        .events
        .conversions
        .iter()
        .map(|event| event.converted)
        .collect();

    for particle in &snapshot.particles {
        buffer.push(particle.id as f32);
        buffer.push(particle.x);
        buffer.push(particle.y);
        buffer.push(particle.vx);
        buffer.push(particle.vy);
        buffer.push(particle.radius);
        buffer.push(team_to_id(particle.team));
        buffer.push(if flashed.contains(&ParticleId(particle.id)) { 1.0 } else { 0.0 });
    }

    debug_assert_eq!(
        buffer.len(),
        calculate_buffer_size(snapshot.particles.len()),
        "Buffer size mismatch"
    );
}

#[inline]
pub fn calculate_buffer_size(particle_count: usize) -> usize {
    HEADER_SIZE + particle_count * PARTICLE_STRIDE
}

/// Particle count from a buffer header, or `None` if the header is truncated.
#[inline]
pub fn parse_particle_count(buffer: &[f32]) -> Option<usize> {
    if buffer.len() < HEADER_SIZE {
        return None;
    }
    Some(buffer[0] as usize)
}

#[inline]
pub const fn particle_offset(index: usize) -> usize {
    HEADER_SIZE + index * PARTICLE_STRIDE
}
