//! Battle Sim - Core
//!
//! A deterministic, fixed-timestep ECS simulation of two particle teams
//! fighting over an arena: a uniform grid finds overlaps, the dominant team
//! converts (or pops) the submissive one on contact, and the roles swap
//! whenever the submissive team shrinks to a scheduled threshold.
//! Uses `bevy_ecs` for the entity-component-system architecture.

pub mod api;
pub mod components;
pub mod config;
pub mod profiler;
pub mod render_bridge;
pub mod spatial;
pub mod systems;
pub mod world;

pub use api::BattleSim;
pub use components::*;
pub use config::{
    BattleConfig, CollisionRule, ConfigError, InitialDominance, TeamSetup, ThresholdPhase,
    ThresholdSchedule,
};
pub use spatial::{SpatialEntry, SpatialGrid};
pub use systems::*;
pub use world::Snapshot;
