//! ECS Components for the battle simulation.
//!
//! Components are pure data containers attached to particles.
//! All game logic lives in systems that query these components.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

// ============================================================================
// SPATIAL COMPONENTS
// ============================================================================

/// 2D position in the arena (x grows right, y grows down).
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// 2D velocity vector in units per second.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub vx: f32,
    pub vy: f32,
}

impl Velocity {
    pub fn new(vx: f32, vy: f32) -> Self {
        Self { vx, vy }
    }
}

/// Circular body of a particle.
///
/// `radius` is used for particle-vs-particle overlap, `wall_radius` for
/// bouncing off the arena edges. They only differ for oversized attackers
/// whose reach is larger than their footprint.
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub radius: f32,
    pub wall_radius: f32,
}

impl Body {
    pub fn new(radius: f32) -> Self {
        Self {
            radius,
            wall_radius: radius,
        }
    }

    pub fn with_wall_radius(radius: f32, wall_radius: f32) -> Self {
        Self {
            radius,
            wall_radius,
        }
    }

    /// Grow the collision radius, never exceeding `max_radius`.
    pub fn grow(&mut self, amount: f32, max_radius: f32) {
        if self.radius < max_radius {
            self.radius = (self.radius + amount).min(max_radius);
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::new(15.0)
    }
}

// ============================================================================
// IDENTITY COMPONENTS
// ============================================================================

/// Stable identifier for a particle, assigned at spawn.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticleId(pub u32);

/// Team tag. Every particle is on exactly one of the two teams.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    A,
    B,
}

impl Team {
    /// The opposing team.
    #[inline]
    pub fn other(self) -> Team {
        match self {
            Team::A => Team::B,
            Team::B => Team::A,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Team::A => "A",
            Team::B => "B",
        }
    }
}

// ============================================================================
// CONVERSION COMPONENTS
// ============================================================================

/// Simulation time (seconds) at which this particle last converted another
/// particle or was converted itself.
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LastConversion(pub f32);

impl Default for LastConversion {
    fn default() -> Self {
        Self(f32::NEG_INFINITY)
    }
}

impl LastConversion {
    /// Whether at least `cooldown` seconds have passed since the last conversion.
    #[inline]
    pub fn is_ready(&self, now: f32, cooldown: f32) -> bool {
        now - self.0 >= cooldown
    }

    pub fn stamp(&mut self, now: f32) {
        self.0 = now;
    }
}

// ============================================================================
// BUNDLES
// ============================================================================

/// Bundle for spawning a complete particle.
#[derive(Bundle)]
pub struct ParticleBundle {
    pub id: ParticleId,
    pub team: Team,
    pub position: Position,
    pub velocity: Velocity,
    pub body: Body,
    pub last_conversion: LastConversion,
}

impl ParticleBundle {
    pub fn new(id: u32, team: Team, position: Position, velocity: Velocity, body: Body) -> Self {
        Self {
            id: ParticleId(id),
            team,
            position,
            velocity,
            body,
            last_conversion: LastConversion::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_other_is_involution() {
        assert_eq!(Team::A.other(), Team::B);
        assert_eq!(Team::B.other(), Team::A);
        assert_eq!(Team::A.other().other(), Team::A);
    }

    #[test]
    fn test_last_conversion_starts_ready() {
        let last = LastConversion::default();
        assert!(last.is_ready(0.0, 0.06));
        assert!(last.is_ready(-100.0, 1000.0));
    }

    #[test]
    fn test_last_conversion_cooldown() {
        let mut last = LastConversion::default();
        last.stamp(1.0);
        assert!(!last.is_ready(1.05, 0.06));
        assert!(last.is_ready(1.07, 0.06));
    }

    #[test]
    fn test_body_grow_caps_at_max() {
        let mut body = Body::new(5.0);
        body.grow(1.0, 6.5);
        assert_eq!(body.radius, 6.0);
        body.grow(1.0, 6.5);
        assert_eq!(body.radius, 6.5);
        body.grow(1.0, 6.5);
        assert_eq!(body.radius, 6.5);
        // Wall radius is unaffected by growth.
        assert_eq!(body.wall_radius, 5.0);
    }
}
