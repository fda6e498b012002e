//! Battle configuration.
//!
//! `BattleConfig` is a plain `serde` struct inserted into the ECS world as a
//! resource. It can be built in code or loaded from TOML; keys missing from
//! the file keep their compiled defaults. Every constructor path funnels
//! through [`BattleConfig::validate`].

use crate::components::Team;
use crate::spatial::{reach_for, MAX_NEIGHBOR_REACH};
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// Frames per second the default speeds were tuned for.
const REFERENCE_FPS: f32 = 60.0;

/// Errors produced while building or loading a [`BattleConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cell_size must be positive and finite, got {0}")]
    InvalidCellSize(f32),
    #[error("arena extents must be positive and finite, got {width}x{height}")]
    InvalidArena { width: f32, height: f32 },
    #[error("fixed_timestep must be positive and finite, got {0}")]
    InvalidTimestep(f32),
    #[error("conversion_cooldown must be non-negative and finite, got {0}")]
    InvalidCooldown(f32),
    #[error("threshold schedule must contain at least one phase")]
    EmptySchedule,
    #[error("threshold phase {index} boundary {starts_after} must be finite and greater than the previous one")]
    UnorderedSchedule { index: usize, starts_after: f32 },
    #[error("team {team:?}: {reason}")]
    InvalidTeam { team: Team, reason: &'static str },
    #[error("grow rule: {0}")]
    InvalidGrowth(&'static str),
    #[error(
        "cell_size {cell_size} needs {rings} neighbour rings for particles of radius {max_radius}, at most {max} are supported"
    )]
    CellTooSmall {
        cell_size: f32,
        max_radius: f32,
        rings: i32,
        max: i32,
    },
    #[error("max_updates_per_step must be at least 1")]
    InvalidUpdateCap,
    #[error("time_limit must be positive and finite, got {0}")]
    InvalidTimeLimit(f32),
    #[error("failed to parse battle config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to read battle config: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// THRESHOLD SCHEDULE
// ============================================================================

/// One step of the threshold schedule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdPhase {
    /// The phase applies once elapsed time is strictly greater than this.
    pub starts_after: f32,
    /// Swap dominance when the submissive count is at or below this.
    pub threshold: u32,
}

impl ThresholdPhase {
    pub fn new(starts_after: f32, threshold: u32) -> Self {
        Self {
            starts_after,
            threshold,
        }
    }
}

/// Piecewise-constant map from elapsed time to a submissive-count threshold.
///
/// Phase boundaries are half-open: an instant exactly on a boundary still
/// belongs to the earlier phase. The first phase also covers everything up
/// to its own boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThresholdSchedule {
    phases: Vec<ThresholdPhase>,
}

impl ThresholdSchedule {
    /// Build a schedule, checking that it is non-empty and its boundaries increase.
    pub fn new(phases: Vec<ThresholdPhase>) -> Result<Self, ConfigError> {
        let schedule = Self { phases };
        schedule.validate()?;
        Ok(schedule)
    }

    /// A schedule with a single threshold for all time.
    pub fn constant(threshold: u32) -> Self {
        Self {
            phases: vec![ThresholdPhase::new(0.0, threshold)],
        }
    }

    pub fn phases(&self) -> &[ThresholdPhase] {
        &self.phases
    }

    /// Threshold in effect at `elapsed` seconds.
    pub fn threshold_at(&self, elapsed: f32) -> u32 {
        self.phases
            .iter()
            .rev()
            .find(|phase| elapsed > phase.starts_after)
            .or_else(|| self.phases.first())
            .map(|phase| phase.threshold)
            .unwrap_or(0)
    }

    /// Whether thresholds never increase as time advances.
    pub fn is_monotone(&self) -> bool {
        self.phases
            .windows(2)
            .all(|pair| pair[1].threshold <= pair[0].threshold)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.phases.is_empty() {
            return Err(ConfigError::EmptySchedule);
        }
        let mut previous = f32::NEG_INFINITY;
        for (index, phase) in self.phases.iter().enumerate() {
            if !phase.starts_after.is_finite() || phase.starts_after <= previous {
                return Err(ConfigError::UnorderedSchedule {
                    index,
                    starts_after: phase.starts_after,
                });
            }
            previous = phase.starts_after;
        }
        Ok(())
    }
}

impl Default for ThresholdSchedule {
    fn default() -> Self {
        Self {
            phases: vec![
                ThresholdPhase::new(0.0, 180),
                ThresholdPhase::new(11.0, 50),
                ThresholdPhase::new(31.0, 0),
            ],
        }
    }
}

// ============================================================================
// RULES & POLICIES
// ============================================================================

/// What happens when two particles overlap.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CollisionRule {
    /// The dominant particle recruits the submissive one, subject to cooldown.
    #[default]
    Convert,
    /// The submissive particle is removed on contact with a dominant one.
    Pop,
    /// Both particles grow, regardless of team.
    Grow { growth: f32, max_radius: f32 },
}

/// How the dominant team is picked at spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialDominance {
    /// The smaller team starts submissive. Ties go to team A as dominant.
    #[default]
    FewerIsSubmissive,
    /// The smaller team starts dominant. Ties go to team A as dominant.
    FewerIsDominant,
    /// The given team starts dominant.
    Fixed(Team),
}

/// Spawn parameters for one team.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamSetup {
    pub count: u32,
    /// Speed per axis in units per second.
    pub speed: f32,
    pub radius: f32,
    /// Bounce radius; falls back to `radius` when absent.
    pub wall_radius: Option<f32>,
}

impl TeamSetup {
    pub fn wall_radius(&self) -> f32 {
        self.wall_radius.unwrap_or(self.radius)
    }

    fn validate(&self, team: Team) -> Result<(), ConfigError> {
        if !(self.radius > 0.0) || !self.radius.is_finite() {
            return Err(ConfigError::InvalidTeam {
                team,
                reason: "radius must be positive",
            });
        }
        if !(self.wall_radius() > 0.0) || !self.wall_radius().is_finite() {
            return Err(ConfigError::InvalidTeam {
                team,
                reason: "wall_radius must be positive",
            });
        }
        if !(self.speed >= 0.0) || !self.speed.is_finite() {
            return Err(ConfigError::InvalidTeam {
                team,
                reason: "speed must be non-negative",
            });
        }
        Ok(())
    }
}

impl Default for TeamSetup {
    fn default() -> Self {
        Self {
            count: 700,
            speed: 0.7 * REFERENCE_FPS,
            radius: 15.0,
            wall_radius: None,
        }
    }
}

// ============================================================================
// BATTLE CONFIG
// ============================================================================

/// Complete configuration for a battle.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    /// Arena width in world units (particles bounce inside `[0, width]`).
    pub arena_width: f32,
    /// Arena height in world units.
    pub arena_height: f32,
    /// Fixed timestep in seconds.
    pub fixed_timestep: f32,
    /// Edge length of a spatial grid cell.
    pub cell_size: f32,
    /// Seconds a dominant particle must wait between conversions.
    pub conversion_cooldown: f32,
    pub threshold_schedule: ThresholdSchedule,
    pub collision_rule: CollisionRule,
    pub initial_dominance: InitialDominance,
    pub team_a: TeamSetup,
    pub team_b: TeamSetup,
    /// RNG seed for spawning.
    pub seed: u64,
    /// Most fixed updates one `step` call may run; the rest of the backlog is dropped.
    pub max_updates_per_step: u32,
    /// Optional battle length in seconds; the leader wins on expiry.
    pub time_limit: Option<f32>,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            arena_width: 1080.0,
            arena_height: 1920.0,
            fixed_timestep: 1.0 / REFERENCE_FPS,
            cell_size: 50.0,
            conversion_cooldown: 0.06,
            threshold_schedule: ThresholdSchedule::default(),
            collision_rule: CollisionRule::Convert,
            initial_dominance: InitialDominance::FewerIsSubmissive,
            team_a: TeamSetup::default(),
            team_b: TeamSetup::default(),
            seed: 33,
            max_updates_per_step: 8,
            time_limit: None,
        }
    }
}

impl BattleConfig {
    /// Parse and validate a config from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: BattleConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Serialize to pretty TOML.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn team(&self, team: Team) -> &TeamSetup {
        match team {
            Team::A => &self.team_a,
            Team::B => &self.team_b,
        }
    }

    /// Largest collision radius any particle can reach under this config.
    pub fn max_radius(&self) -> f32 {
        let spawned = self.team_a.radius.max(self.team_b.radius);
        match self.collision_rule {
            CollisionRule::Grow { max_radius, .. } => spawned.max(max_radius),
            _ => spawned,
        }
    }

    /// Check every field, rejecting values the simulation cannot run with.
    ///
    /// Smells that only degrade behaviour (rising thresholds, cells smaller
    /// than a particle) are logged rather than rejected.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.cell_size > 0.0) || !self.cell_size.is_finite() {
            return Err(ConfigError::InvalidCellSize(self.cell_size));
        }
        let arena_ok = |v: f32| v > 0.0 && v.is_finite();
        if !arena_ok(self.arena_width) || !arena_ok(self.arena_height) {
            return Err(ConfigError::InvalidArena {
                width: self.arena_width,
                height: self.arena_height,
            });
        }
        if !(self.fixed_timestep > 0.0) || !self.fixed_timestep.is_finite() {
            return Err(ConfigError::InvalidTimestep(self.fixed_timestep));
        }
        if !(self.conversion_cooldown >= 0.0) || !self.conversion_cooldown.is_finite() {
            return Err(ConfigError::InvalidCooldown(self.conversion_cooldown));
        }
        self.threshold_schedule.validate()?;
        self.team_a.validate(Team::A)?;
        self.team_b.validate(Team::B)?;

        if let CollisionRule::Grow { growth, max_radius } = self.collision_rule {
            if !(growth > 0.0) || !growth.is_finite() {
                return Err(ConfigError::InvalidGrowth("growth must be positive"));
            }
            if !max_radius.is_finite()
                || max_radius < self.team_a.radius
                || max_radius < self.team_b.radius
            {
                return Err(ConfigError::InvalidGrowth(
                    "max_radius must be at least every team's radius",
                ));
            }
        }

        let rings = reach_for(self.max_radius(), self.cell_size);
        if rings > MAX_NEIGHBOR_REACH {
            return Err(ConfigError::CellTooSmall {
                cell_size: self.cell_size,
                max_radius: self.max_radius(),
                rings,
                max: MAX_NEIGHBOR_REACH,
            });
        }
        if self.max_updates_per_step == 0 {
            return Err(ConfigError::InvalidUpdateCap);
        }

        if let Some(limit) = self.time_limit {
            if !(limit > 0.0) || !limit.is_finite() {
                return Err(ConfigError::InvalidTimeLimit(limit));
            }
        }

        if !self.threshold_schedule.is_monotone() {
            warn!(
                phases = ?self.threshold_schedule.phases(),
                "threshold schedule rises over time; dominance swaps may flap"
            );
        }
        if self.cell_size < 2.0 * self.max_radius() {
            warn!(
                cell_size = self.cell_size,
                max_radius = self.max_radius(),
                "cell size is smaller than a particle diameter; collision scan will widen its reach"
            );
        }
        Ok(())
    }
}
