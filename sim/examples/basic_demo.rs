//! Basic demonstration of the battle simulation.
//!
//! Run with: cargo run --example basic_demo [-- path/to/battle.toml]
//! Set RUST_LOG=battle_sim=info to see swaps and the outcome as they happen.

use battle_sim::{BattleConfig, BattleSim, Outcome};

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let config = match std::env::args().nth(1) {
        Some(path) => match BattleConfig::load(&path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("failed to load {path}: {err}");
                std::process::exit(1);
            }
        },
        None => BattleConfig {
            time_limit: Some(40.0),
            ..BattleConfig::default()
        },
    };

    let mut sim = match BattleSim::with_population(config) {
        Ok(sim) => sim,
        Err(err) => {
            eprintln!("invalid config: {err}");
            std::process::exit(1);
        }
    };
    sim.enable_profiling();

    println!("=== Color Battle - Simulation Demo ===\n");
    print_status(&sim);

    let frame_dt = 1.0 / 60.0;
    let mut swaps = 0;
    let mut conversions = 0;
    // Five minutes of simulated time at most.
    for frame in 1..=18_000 {
        if sim.step(frame_dt) > 0 {
            let events = sim.frame_events();
            swaps += events.swaps.len();
            conversions += events.conversions.len() + events.pops.len();
        }
        if frame % 300 == 0 {
            print_status(&sim);
        }
        if *sim.outcome() != Outcome::InProgress {
            break;
        }
    }

    println!("\n--- Finished after {} ticks ---", sim.current_tick());
    print_status(&sim);
    println!("  swaps: {swaps}, conversions: {conversions}");
    println!("  outcome: {:?}", sim.outcome());

    if let Some(profiler) = sim.profiler() {
        println!("\n{profiler}");
        profiler.log_summary();
    }
}

fn print_status(sim: &BattleSim) {
    let counts = sim.team_counts();
    println!(
        "t={:>6.2}s  A={:>4}  B={:>4}  dominant={}",
        sim.current_time(),
        counts.a,
        counts.b,
        sim.dominance().dominant().name()
    );
}
