//! Scoring system - live team counts and the battle outcome.
//!
//! Runs last in a tick. A victory is recorded the first frame one team has
//! no particles left and is never revoked afterwards.

use crate::components::Team;
use crate::config::BattleConfig;
use crate::systems::movement::{DeltaTime, SimTime};
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Live particle count per team.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamCounts {
    pub a: u32,
    pub b: u32,
}

impl TeamCounts {
    pub fn total(&self) -> u32 {
        self.a + self.b
    }

    /// Team with strictly more particles, if any.
    pub fn leader(&self) -> Option<Team> {
        match self.a.cmp(&self.b) {
            std::cmp::Ordering::Greater => Some(Team::A),
            std::cmp::Ordering::Less => Some(Team::B),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn from_teams<'a>(teams: impl IntoIterator<Item = &'a Team>) -> Self {
        let mut counts = Self::default();
        for team in teams {
            match team {
                Team::A => counts.a += 1,
                Team::B => counts.b += 1,
            }
        }
        counts
    }
}

/// State of the battle.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Outcome {
    #[default]
    InProgress,
    /// The other team was wiped out.
    Victory { winner: Team },
    /// The time limit elapsed first; `leader` is `None` on a tie.
    TimeUp { leader: Option<Team> },
}

impl Outcome {
    pub fn is_decided(&self) -> bool {
        !matches!(self, Outcome::InProgress)
    }
}

/// Decide the outcome from the counts after a tick ending at `elapsed`.
pub fn judge(counts: &TeamCounts, elapsed: f32, time_limit: Option<f32>) -> Outcome {
    if counts.total() > 0 {
        if counts.a == 0 {
            return Outcome::Victory { winner: Team::B };
        }
        if counts.b == 0 {
            return Outcome::Victory { winner: Team::A };
        }
    }
    match time_limit {
        Some(limit) if elapsed >= limit => Outcome::TimeUp {
            leader: counts.leader(),
        },
        _ => Outcome::InProgress,
    }
}

/// System that refreshes team counts and records the outcome once decided.
pub fn scoreboard_system(
    time: Res<SimTime>,
    dt: Res<DeltaTime>,
    config: Res<BattleConfig>,
    mut counts: ResMut<TeamCounts>,
    mut outcome: ResMut<Outcome>,
    query: Query<&Team>,
) {
    *counts = TeamCounts::from_teams(query.iter());

    if outcome.is_decided() {
        return;
    }
    let elapsed = time.0 + dt.0;
    let judged = judge(&counts, elapsed, config.time_limit);
    if judged.is_decided() {
        info!(?judged, a = counts.a, b = counts.b, elapsed, "battle decided");
        *outcome = judged;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_judge_victory() {
        let counts = TeamCounts { a: 0, b: 12 };
        assert_eq!(judge(&counts, 1.0, None), Outcome::Victory { winner: Team::B });
        let counts = TeamCounts { a: 3, b: 0 };
        assert_eq!(judge(&counts, 1.0, Some(0.5)), Outcome::Victory { winner: Team::A });
    }

    #[test]
    fn test_judge_time_up() {
        let counts = TeamCounts { a: 4, b: 9 };
        assert_eq!(judge(&counts, 29.9, Some(30.0)), Outcome::InProgress);
        assert_eq!(
            judge(&counts, 30.0, Some(30.0)),
            Outcome::TimeUp { leader: Some(Team::B) }
        );
        let tied = TeamCounts { a: 5, b: 5 };
        assert_eq!(judge(&tied, 31.0, Some(30.0)), Outcome::TimeUp { leader: None });
    }

    #[test]
    fn test_empty_arena_is_not_a_victory() {
        assert_eq!(judge(&TeamCounts::default(), 5.0, None), Outcome::InProgress);
    }

    fn scoring_world() -> World {
        let mut world = World::new();
        world.insert_resource(SimTime(0.0));
        world.insert_resource(DeltaTime(0.5));
        world.insert_resource(BattleConfig::default());
        world.insert_resource(TeamCounts::default());
        world.insert_resource(Outcome::default());
        world
    }

    #[test]
    fn test_scoreboard_counts_teams() {
        let mut world = scoring_world();
        world.spawn(Team::A);
        world.spawn(Team::A);
        world.spawn(Team::B);

        let mut schedule = Schedule::default();
        schedule.add_systems(scoreboard_system);
        schedule.run(&mut world);

        assert_eq!(*world.resource::<TeamCounts>(), TeamCounts { a: 2, b: 1 });
        assert_eq!(*world.resource::<Outcome>(), Outcome::InProgress);
    }

    #[test]
    fn test_victory_is_sticky() {
        let mut world = scoring_world();
        let lone = world.spawn(Team::B).id();
        world.spawn(Team::A);

        let mut schedule = Schedule::default();
        schedule.add_systems(scoreboard_system);
        schedule.run(&mut world);
        assert_eq!(*world.resource::<Outcome>(), Outcome::InProgress);

        world.entity_mut(lone).insert(Team::A);
        schedule.run(&mut world);
        assert_eq!(*world.resource::<Outcome>(), Outcome::Victory { winner: Team::A });

        // Even if team B reappears, the recorded winner stands.
        world.spawn(Team::B);
        schedule.run(&mut world);
        assert_eq!(*world.resource::<Outcome>(), Outcome::Victory { winner: Team::A });
        assert_eq!(world.resource::<TeamCounts>().b, 1);
    }
}
