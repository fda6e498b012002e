//! Per-frame event log.
//!
//! Collision and dominance systems append here; an outer layer (sound,
//! flashes, pop animations) reads the log from the snapshot. The log only
//! ever holds the events of the most recent fixed update.

use crate::components::{ParticleId, Team};
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// A submissive particle was recruited by a dominant one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConversionEvent {
    pub converter: ParticleId,
    pub converted: ParticleId,
    /// Team the converted particle joined.
    pub team: Team,
    pub x: f32,
    pub y: f32,
    pub time: f32,
}

/// A submissive particle was removed on contact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PopEvent {
    pub popped: ParticleId,
    pub by: ParticleId,
    /// Team the popped particle belonged to.
    pub team: Team,
    pub x: f32,
    pub y: f32,
    pub time: f32,
}

/// Dominant and submissive labels were exchanged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwapEvent {
    pub time: f32,
    /// Dominant team after the swap.
    pub dominant: Team,
    /// Submissive count that triggered the swap.
    pub submissive_count: u32,
    pub threshold: u32,
}

/// Events raised during the current fixed update.
#[derive(Resource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameEvents {
    pub conversions: Vec<ConversionEvent>,
    pub pops: Vec<PopEvent>,
    pub swaps: Vec<SwapEvent>,
}

impl FrameEvents {
    pub fn clear(&mut self) {
        self.conversions.clear();
        self.pops.clear();
        self.swaps.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.conversions.is_empty() && self.pops.is_empty() && self.swaps.is_empty()
    }
}

/// System that empties the log at the start of a frame.
pub fn clear_frame_events_system(mut events: ResMut<FrameEvents>) {
    events.clear();
}
