//! ECS Systems for the battle simulation.
//!
//! Systems contain the logic that operates on components.
//!
//! ## Frame Order
//!
//! Each fixed update runs four phases, strictly in order:
//!
//! **1. Dominance** - `clear_frame_events_system`, then
//! `dominance_swap_system` compares the submissive head count against the
//! threshold for the current time and swaps the labels if it is at or below.
//!
//! **2. Spatial** - `spatial_grid_update_system` rebuilds the grid from the
//! positions at the start of the frame.
//!
//! **3. Collision** - `collision_system` gathers overlapping pairs from the
//! grid and applies the configured rule against live component state.
//!
//! **4. Movement** - `movement_system` advances positions and bounces off
//! walls, then `scoreboard_system` counts teams and records the outcome.

pub mod collision;
pub mod dominance;
pub mod events;
pub mod movement;
pub mod scoring;
pub mod serialization;

pub use collision::*;
pub use dominance::*;
pub use events::*;
pub use movement::*;
pub use scoring::*;
pub use serialization::*;
