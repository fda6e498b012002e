//! Dominance rule - which team converts which, and when that flips.
//!
//! Two halves:
//! - [`convert_pair`]: the per-contact rule, applied by the collision system.
//! - [`dominance_swap_system`]: once per frame, swaps the labels when the
//!   submissive team has shrunk to the scheduled threshold.

use crate::components::{LastConversion, Team};
use crate::config::{BattleConfig, InitialDominance};
use crate::systems::events::{FrameEvents, SwapEvent};
use crate::systems::movement::SimTime;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Global dominant/submissive labels.
///
/// The two fields always name different teams.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DominanceState {
    dominant: Team,
    submissive: Team,
}

impl Default for DominanceState {
    fn default() -> Self {
        Self::with_dominant(Team::A)
    }
}

impl DominanceState {
    pub fn with_dominant(dominant: Team) -> Self {
        Self {
            dominant,
            submissive: dominant.other(),
        }
    }

    /// Pick the starting labels from the initial team sizes.
    pub fn initial(policy: InitialDominance, count_a: u32, count_b: u32) -> Self {
        let dominant = match policy {
            InitialDominance::Fixed(team) => team,
            InitialDominance::FewerIsSubmissive if count_a < count_b => Team::B,
            InitialDominance::FewerIsDominant if count_b < count_a => Team::B,
            _ => Team::A,
        };
        Self::with_dominant(dominant)
    }

    pub fn dominant(&self) -> Team {
        self.dominant
    }

    pub fn submissive(&self) -> Team {
        self.submissive
    }

    pub fn is_dominant(&self, team: Team) -> bool {
        self.dominant == team
    }

    /// Exchange the two labels.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.dominant, &mut self.submissive);
    }
}

/// Which member of a pair was converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairMember {
    First,
    Second,
}

/// Apply the conversion rule to one colliding pair.
///
/// If one member is dominant, the other submissive, and the dominant one is
/// off cooldown, the submissive member joins the dominant team and both get
/// stamped with `now`. Returns the converted member, or `None` if nothing
/// changed.
pub fn convert_pair(
    state: &DominanceState,
    cooldown: f32,
    now: f32,
    first: (&mut Team, &mut LastConversion),
    second: (&mut Team, &mut LastConversion),
) -> Option<PairMember> {
    let (first_team, first_last) = first;
    let (second_team, second_last) = second;

    let converted = if *first_team == state.dominant && *second_team == state.submissive {
        if !first_last.is_ready(now, cooldown) {
            return None;
        }
        *second_team = state.dominant;
        PairMember::Second
    } else if *second_team == state.dominant && *first_team == state.submissive {
        if !second_last.is_ready(now, cooldown) {
            return None;
        }
        *first_team = state.dominant;
        PairMember::First
    } else {
        return None;
    };

    first_last.stamp(now);
    second_last.stamp(now);
    Some(converted)
}

/// Outcome of one swap check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapCheck {
    pub submissive_count: u32,
    pub threshold: u32,
    pub swapped: bool,
}

/// Swap the labels if `submissive_count` is at or below the threshold for `elapsed`.
pub fn evaluate_swap(
    state: &mut DominanceState,
    config: &BattleConfig,
    elapsed: f32,
    submissive_count: u32,
) -> SwapCheck {
    let threshold = config.threshold_schedule.threshold_at(elapsed);
    let swapped = submissive_count <= threshold;
    if swapped {
        state.swap();
    }
    SwapCheck {
        submissive_count,
        threshold,
        swapped,
    }
}

/// System that re-evaluates the global swap once per frame.
pub fn dominance_swap_system(
    time: Res<SimTime>,
    config: Res<BattleConfig>,
    mut state: ResMut<DominanceState>,
    mut events: ResMut<FrameEvents>,
    query: Query<&Team>,
) {
    let submissive = state.submissive();
    let submissive_count = query.iter().filter(|team| **team == submissive).count() as u32;

    let check = evaluate_swap(&mut state, &config, time.0, submissive_count);
    if check.swapped {
        info!(
            time = time.0,
            dominant = state.dominant().name(),
            submissive_count,
            threshold = check.threshold,
            "dominance swapped"
        );
        events.swaps.push(SwapEvent {
            time: time.0,
            dominant: state.dominant(),
            submissive_count,
            threshold: check.threshold,
        });
    }
}
