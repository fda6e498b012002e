//! Snapshot types.
//!
//! The `Snapshot` struct provides a serializable view of the battle that a
//! renderer or a replay tool can consume without touching the ECS world.

use crate::components::*;
use crate::systems::dominance::DominanceState;
use crate::systems::events::FrameEvents;
use crate::systems::scoring::{Outcome, TeamCounts};
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// State of a single particle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleSnapshot {
    pub id: u32,
    pub team: Team,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub radius: f32,
    /// `None` until the particle takes part in its first conversion.
    pub last_conversion: Option<f32>,
}

/// Complete battle state after a fixed update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Fixed updates run so far.
    pub tick: u64,
    /// Elapsed simulation time in seconds.
    pub time: f32,
    pub dominant: Team,
    pub submissive: Team,
    pub counts: TeamCounts,
    pub outcome: Outcome,
    /// Particles ordered by id.
    pub particles: Vec<ParticleSnapshot>,
    /// Events raised by the most recent fixed update.
    pub events: FrameEvents,
}

impl Snapshot {
    /// Create a snapshot from the ECS world.
    pub fn from_world(world: &mut World, tick: u64, time: f32) -> Self {
        let mut query = world.query::<(
            &ParticleId,
            &Team,
            &Position,
            &Velocity,
            &Body,
            &LastConversion,
        )>();

        let mut particles: Vec<ParticleSnapshot> = query
            .iter(world)
            .map(|(id, team, pos, vel, body, last)| ParticleSnapshot {
                id: id.0,
                team: *team,
                x: pos.x,
                y: pos.y,
                vx: vel.vx,
                vy: vel.vy,
                radius: body.radius,
                last_conversion: last.0.is_finite().then_some(last.0),
            })
            .collect();
        particles.sort_by_key(|p| p.id);

        let counts = TeamCounts::from_teams(particles.iter().map(|p| &p.team));
        let state = world
            .get_resource::<DominanceState>()
            .copied()
            .unwrap_or_default();
        let outcome = world
            .get_resource::<Outcome>()
            .copied()
            .unwrap_or_default();
        let events = world
            .get_resource::<FrameEvents>()
            .cloned()
            .unwrap_or_default();

        Self {
            tick,
            time,
            dominant: state.dominant(),
            submissive: state.submissive(),
            counts,
            outcome,
            particles,
            events,
        }
    }

    /// Serialize snapshot to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
