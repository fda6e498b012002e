//! Public API for the simulation.
//!
//! `BattleSim` owns the ECS world and the four phase schedules, and is the
//! only thing a driver (the demo, a renderer, a test) needs to touch.
//!
//! ## Fixed Timestep
//!
//! `step(dt)` accumulates wall-clock time and runs as many fixed updates as
//! fit. Every fixed update sees the same timestep, so a run depends only on
//! the config and its seed, never on the frame rate of the caller.
//!
//! ## Frame Order
//!
//! dominance swap → spatial rebuild → collision → movement and scoring.
//! See [`crate::systems`] for what each phase does.

use crate::components::*;
use crate::config::{BattleConfig, ConfigError};
use crate::profiler::{Phase, Profiler};
use crate::spatial::{spatial_grid_update_system, SpatialGrid};
use crate::systems::*;
use crate::world::Snapshot;
use bevy_ecs::prelude::*;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

/// The battle simulation container.
pub struct BattleSim {
    world: World,
    /// Phase schedules, run in order each fixed update.
    phases: Vec<(Phase, Schedule)>,
    tick: u64,
    time: f32,
    /// Accumulated time for fixed timestep.
    time_accumulator: f32,
    next_id: u32,
    profiler: Option<Profiler>,
}

impl BattleSim {
    /// Validate `config` and build an empty arena.
    ///
    /// The starting dominance labels come from the team counts in the
    /// config, whether or not [`populate`](Self::populate) is called.
    pub fn new(config: BattleConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut world = World::new();
        world.insert_resource(DeltaTime(config.fixed_timestep));
        world.insert_resource(SimTime(0.0));
        world.insert_resource(SpatialGrid::new(config.cell_size));
        world.insert_resource(DominanceState::initial(
            config.initial_dominance,
            config.team_a.count,
            config.team_b.count,
        ));
        world.insert_resource(FrameEvents::default());
        world.insert_resource(TeamCounts::default());
        world.insert_resource(Outcome::default());

        debug!(
            arena_width = config.arena_width,
            arena_height = config.arena_height,
            cell_size = config.cell_size,
            rule = ?config.collision_rule,
            dominant = world.resource::<DominanceState>().dominant().name(),
            "battle created"
        );
        world.insert_resource(config);

        let mut dominance = Schedule::default();
        dominance.add_systems((clear_frame_events_system, dominance_swap_system).chain());

        let mut spatial = Schedule::default();
        spatial.add_systems(spatial_grid_update_system);

        let mut collision = Schedule::default();
        collision.add_systems(collision_system);

        let mut movement = Schedule::default();
        movement.add_systems((movement_system, scoreboard_system).chain());

        Ok(Self {
            world,
            phases: vec![
                (Phase::Dominance, dominance),
                (Phase::Spatial, spatial),
                (Phase::Collision, collision),
                (Phase::Movement, movement),
            ],
            tick: 0,
            time: 0.0,
            time_accumulator: 0.0,
            next_id: 0,
            profiler: None,
        })
    }

    /// Build a battle and spawn both teams from the config.
    pub fn with_population(config: BattleConfig) -> Result<Self, ConfigError> {
        let mut sim = Self::new(config)?;
        sim.populate();
        Ok(sim)
    }

    /// Spawn team A then team B at seeded random positions.
    ///
    /// Positions are uniform over the arena inset by the wall radius, and
    /// each velocity component is `±speed` on a coin flip.
    pub fn populate(&mut self) {
        let config = self.config().clone();
        let mut rng = SmallRng::seed_from_u64(config.seed);

        for team in [Team::A, Team::B] {
            let setup = *config.team(team);
            let inset = setup.wall_radius();
            for _ in 0..setup.count {
                let x = sample_axis(&mut rng, inset, config.arena_width);
                let y = sample_axis(&mut rng, inset, config.arena_height);
                let vx = if rng.gen_bool(0.5) { setup.speed } else { -setup.speed };
                let vy = if rng.gen_bool(0.5) { setup.speed } else { -setup.speed };
                self.spawn_particle(team, Position::new(x, y), Velocity::new(vx, vy));
            }
        }

        let counts = *self.team_counts();
        debug!(a = counts.a, b = counts.b, seed = config.seed, "arena populated");
    }

    /// Spawn one particle with its team's body from the config.
    pub fn spawn_particle(&mut self, team: Team, position: Position, velocity: Velocity) -> Entity {
        let setup = self.config().team(team);
        let body = Body::with_wall_radius(setup.radius, setup.wall_radius());
        self.spawn_particle_with_body(team, position, velocity, body)
    }

    /// Spawn one particle with an explicit body.
    pub fn spawn_particle_with_body(
        &mut self,
        team: Team,
        position: Position,
        velocity: Velocity,
        body: Body,
    ) -> Entity {
        let id = self.next_id;
        self.next_id += 1;

        {
            let mut counts = self.world.resource_mut::<TeamCounts>();
            match team {
                Team::A => counts.a += 1,
                Team::B => counts.b += 1,
            }
        }

        self.world
            .spawn(ParticleBundle::new(id, team, position, velocity, body))
            .id()
    }

    /// Step the simulation forward by `dt` seconds of wall-clock time.
    ///
    /// Runs at most `max_updates_per_step` fixed updates; any backlog beyond
    /// that is dropped, keeping only the sub-step remainder. Returns the
    /// number of fixed updates that ran.
    pub fn step(&mut self, dt: f32) -> u32 {
        if !dt.is_finite() || dt < 0.0 {
            warn!(dt, "ignoring invalid step delta");
            return 0;
        }
        let (fixed_dt, max_updates) = {
            let config = self.config();
            (config.fixed_timestep, config.max_updates_per_step)
        };

        self.time_accumulator += dt;

        let mut updates = 0;
        while updates < max_updates && self.time_accumulator >= fixed_dt {
            self.fixed_update(fixed_dt);
            self.time_accumulator -= fixed_dt;
            updates += 1;
        }

        if self.time_accumulator >= fixed_dt {
            let dropped = self.time_accumulator;
            self.time_accumulator %= fixed_dt;
            warn!(
                dropped_seconds = dropped - self.time_accumulator,
                max_updates, "step backlog exceeded update cap"
            );
        }
        updates
    }

    /// Run exactly one fixed update, ignoring the accumulator.
    pub fn step_fixed(&mut self) {
        let fixed_dt = self.config().fixed_timestep;
        self.fixed_update(fixed_dt);
    }

    /// Run a single fixed timestep update.
    fn fixed_update(&mut self, dt: f32) {
        self.world.resource_mut::<SimTime>().0 = self.time;
        self.world.resource_mut::<DeltaTime>().0 = dt;

        for (phase, schedule) in &mut self.phases {
            match self.profiler.as_mut() {
                Some(profiler) => profiler.time_phase(*phase, || schedule.run(&mut self.world)),
                None => schedule.run(&mut self.world),
            }
        }
        if let Some(profiler) = self.profiler.as_mut() {
            profiler.tick();
        }

        self.tick += 1;
        self.time += dt;
    }

    /// Start recording per-phase timings.
    pub fn enable_profiling(&mut self) {
        self.profiler.get_or_insert_with(Profiler::new);
    }

    pub fn profiler(&self) -> Option<&Profiler> {
        self.profiler.as_ref()
    }

    /// Get a snapshot of the current simulation state.
    pub fn snapshot(&mut self) -> Snapshot {
        Snapshot::from_world(&mut self.world, self.tick, self.time)
    }

    /// Get the snapshot as a JSON string.
    pub fn snapshot_json(&mut self) -> Result<String, serde_json::Error> {
        self.snapshot().to_json()
    }

    pub fn config(&self) -> &BattleConfig {
        self.world.resource::<BattleConfig>()
    }

    pub fn dominance(&self) -> &DominanceState {
        self.world.resource::<DominanceState>()
    }

    pub fn team_counts(&self) -> &TeamCounts {
        self.world.resource::<TeamCounts>()
    }

    pub fn outcome(&self) -> &Outcome {
        self.world.resource::<Outcome>()
    }

    /// Events raised by the most recent fixed update.
    pub fn frame_events(&self) -> &FrameEvents {
        self.world.resource::<FrameEvents>()
    }

    /// Get the current tick number.
    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Get the elapsed simulation time.
    pub fn current_time(&self) -> f32 {
        self.time
    }

    /// Get the spatial grid as of the last rebuild (for debugging/visualization).
    pub fn spatial_grid(&self) -> &SpatialGrid {
        self.world.resource::<SpatialGrid>()
    }

    /// Get direct access to the ECS world (for advanced usage).
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Get mutable access to the ECS world (for advanced usage).
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}

/// Uniform sample in `[inset, extent - inset]`, or the centre if the range is empty.
fn sample_axis(rng: &mut SmallRng, inset: f32, extent: f32) -> f32 {
    let (low, high) = (inset, extent - inset);
    if low < high {
        rng.gen_range(low..=high)
    } else {
        extent * 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CollisionRule, InitialDominance, TeamSetup, ThresholdSchedule};

    fn small_config(count: u32) -> BattleConfig {
        let team = TeamSetup {
            count,
            speed: 60.0,
            radius: 8.0,
            wall_radius: None,
        };
        BattleConfig {
            arena_width: 240.0,
            arena_height: 240.0,
            cell_size: 20.0,
            threshold_schedule: ThresholdSchedule::constant(0),
            team_a: team,
            team_b: team,
            ..Default::default()
        }
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = BattleConfig {
            cell_size: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            BattleSim::new(config),
            Err(ConfigError::InvalidCellSize(_))
        ));

        let config = BattleConfig {
            cell_size: 0.001,
            ..Default::default()
        };
        assert!(matches!(
            BattleSim::new(config),
            Err(ConfigError::CellTooSmall { .. })
        ));
    }

    #[test]
    fn test_new_world_is_empty() {
        let sim = BattleSim::new(BattleConfig::default()).unwrap();
        assert_eq!(sim.current_tick(), 0);
        assert_eq!(sim.team_counts().total(), 0);
        assert_eq!(*sim.outcome(), Outcome::InProgress);
    }

    #[test]
    fn test_populate_spawns_inside_arena() {
        let mut config = small_config(30);
        config.team_b.count = 20;
        let mut sim = BattleSim::with_population(config).unwrap();

        assert_eq!(*sim.team_counts(), TeamCounts { a: 30, b: 20 });
        // Fewer particles start submissive.
        assert_eq!(sim.dominance().submissive(), Team::B);

        let snapshot = sim.snapshot();
        assert_eq!(snapshot.particles.len(), 50);
        for p in &snapshot.particles {
            assert!(p.x >= 8.0 && p.x <= 232.0);
            assert!(p.y >= 8.0 && p.y <= 232.0);
            assert_eq!(p.vx.abs(), 60.0);
            assert_eq!(p.vy.abs(), 60.0);
        }
        assert!(snapshot.particles[..30].iter().all(|p| p.team == Team::A));
    }

    #[test]
    fn test_step_uses_fixed_timestep() {
        let config = BattleConfig {
            fixed_timestep: 0.25,
            ..Default::default()
        };
        let mut sim = BattleSim::new(config).unwrap();

        assert_eq!(sim.step(0.125), 0);
        assert_eq!(sim.step(0.5), 2);
        assert_eq!(sim.current_tick(), 2);
        assert_eq!(sim.step(0.125), 1);
        assert_eq!(sim.current_time(), 0.75);
        assert_eq!(sim.step(f32::NAN), 0);
        assert_eq!(sim.step(-1.0), 0);
    }

    #[test]
    fn test_step_caps_updates_and_drops_backlog() {
        let config = BattleConfig {
            fixed_timestep: 1.0,
            max_updates_per_step: 4,
            ..Default::default()
        };
        let mut sim = BattleSim::new(config).unwrap();

        // Large enough that subtracting the timestep no longer changes the f32.
        assert_eq!(sim.step(33_554_432.0), 4);
        assert_eq!(sim.step(1.0e9), 4);
        assert_eq!(sim.current_tick(), 8);

        // The backlog is gone; only whole new steps run.
        assert_eq!(sim.step(0.5), 0);
        assert_eq!(sim.step(0.5), 1);
    }

    #[test]
    fn test_four_particle_walkthrough() {
        // A/B pair overlapping, the other two far apart and still.
        let config = BattleConfig {
            fixed_timestep: 0.035,
            conversion_cooldown: 0.06,
            threshold_schedule: ThresholdSchedule::constant(0),
            initial_dominance: InitialDominance::Fixed(Team::A),
            ..Default::default()
        };
        let mut sim = BattleSim::new(config).unwrap();
        let a1 = sim.spawn_particle(Team::A, Position::new(100.0, 100.0), Velocity::default());
        let b1 = sim.spawn_particle(Team::B, Position::new(120.0, 100.0), Velocity::default());
        sim.spawn_particle(Team::A, Position::new(600.0, 600.0), Velocity::default());
        sim.spawn_particle(Team::B, Position::new(900.0, 1500.0), Velocity::default());

        sim.step_fixed();
        let world = sim.world();
        assert_eq!(*world.get::<Team>(b1).unwrap(), Team::A);
        assert_eq!(world.get::<LastConversion>(a1).unwrap().0, 0.0);
        assert_eq!(world.get::<LastConversion>(b1).unwrap().0, 0.0);
        assert_eq!(sim.frame_events().conversions.len(), 1);
        assert_eq!(*sim.team_counts(), TeamCounts { a: 3, b: 1 });

        // t = 0.035 and t = 0.07: same team now, nothing happens.
        sim.step_fixed();
        sim.step_fixed();
        assert!(sim.frame_events().conversions.is_empty());
        assert_eq!(sim.world().get::<LastConversion>(b1).unwrap().0, 0.0);
        assert_eq!(sim.dominance().dominant(), Team::A);
        assert_eq!(*sim.outcome(), Outcome::InProgress);
    }

    #[test]
    fn test_same_seed_same_battle() {
        let run = || {
            let mut sim = BattleSim::with_population(small_config(40)).unwrap();
            for _ in 0..120 {
                sim.step_fixed();
            }
            sim.snapshot_json().unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_different_seed_different_layout() {
        let mut a = BattleSim::with_population(small_config(10)).unwrap();
        let mut config = small_config(10);
        config.seed = 34;
        let mut b = BattleSim::with_population(config).unwrap();
        assert_ne!(a.snapshot().particles, b.snapshot().particles);
    }

    #[test]
    fn test_convert_battle_conserves_particles() {
        let mut sim = BattleSim::with_population(small_config(40)).unwrap();
        let mut conversions = 0;
        for _ in 0..300 {
            sim.step_fixed();
            conversions += sim.frame_events().conversions.len();
            assert_eq!(sim.team_counts().total(), 80);
        }
        assert!(conversions > 0);
    }

    #[test]
    fn test_pop_battle_only_removes_submissive() {
        let mut config = small_config(20);
        config.collision_rule = CollisionRule::Pop;
        config.initial_dominance = InitialDominance::Fixed(Team::A);
        let mut sim = BattleSim::with_population(config).unwrap();

        let mut popped = 0;
        for _ in 0..600 {
            sim.step_fixed();
            for event in &sim.frame_events().pops {
                assert_eq!(event.team, Team::B);
                popped += 1;
            }
        }
        let counts = *sim.team_counts();
        assert_eq!(counts.a, 20);
        assert_eq!(counts.b as usize, 20 - popped);
        assert!(popped > 0);
        assert_eq!(sim.snapshot().particles.len() as u32, counts.total());
    }

    #[test]
    fn test_grow_battle_respects_max_radius() {
        let mut config = small_config(20);
        config.collision_rule = CollisionRule::Grow {
            growth: 0.5,
            max_radius: 12.0,
        };
        let mut sim = BattleSim::with_population(config).unwrap();
        for _ in 0..300 {
            sim.step_fixed();
        }
        let snapshot = sim.snapshot();
        assert!(snapshot.particles.iter().all(|p| p.radius <= 12.0));
        assert!(snapshot.particles.iter().any(|p| p.radius > 8.0));
    }

    #[test]
    fn test_time_limit_ends_battle() {
        let mut config = small_config(0);
        config.fixed_timestep = 0.1;
        config.time_limit = Some(0.5);
        let mut sim = BattleSim::new(config).unwrap();
        sim.spawn_particle(Team::A, Position::new(20.0, 20.0), Velocity::default());
        sim.spawn_particle(Team::B, Position::new(200.0, 200.0), Velocity::default());

        for _ in 0..3 {
            sim.step_fixed();
        }
        assert_eq!(*sim.outcome(), Outcome::InProgress);
        for _ in 0..3 {
            sim.step_fixed();
        }
        assert_eq!(*sim.outcome(), Outcome::TimeUp { leader: None });
    }

    #[test]
    fn test_profiling_records_every_phase() {
        let mut sim = BattleSim::with_population(small_config(10)).unwrap();
        assert!(sim.profiler().is_none());
        sim.enable_profiling();
        for _ in 0..5 {
            sim.step_fixed();
        }
        let profiler = sim.profiler().unwrap();
        assert_eq!(profiler.tick_count(), 5);
        for phase in Phase::ALL {
            assert_eq!(profiler.phase(phase).call_count, 5);
        }
    }

    #[test]
    fn test_spatial_grid_populated() {
        let mut sim = BattleSim::with_population(small_config(25)).unwrap();
        sim.step_fixed();
        assert_eq!(sim.spatial_grid().total_count(), 50);
    }

    #[test]
    fn test_stress_1400_particles() {
        use std::time::Instant;

        let mut sim = BattleSim::with_population(BattleConfig::default()).unwrap();
        assert_eq!(sim.team_counts().total(), 1400);

        let start = Instant::now();
        for _ in 0..120 {
            sim.step_fixed();
        }
        let elapsed = start.elapsed();
        println!(
            "1400 particles, 120 ticks in {:?} ({:.2} ms/tick)",
            elapsed,
            elapsed.as_secs_f64() * 1000.0 / 120.0
        );

        assert_eq!(sim.team_counts().total(), 1400);
        assert!(elapsed.as_secs() < 60, "Simulation too slow: {:?}", elapsed);
    }
}
