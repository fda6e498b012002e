//! Per-phase frame profiler.
//!
//! `BattleSim` times each of its four phases when profiling is enabled with
//! [`BattleSim::enable_profiling`](crate::api::BattleSim::enable_profiling).
//! Times are wall clock and never feed back into the simulation.

use std::fmt;
use std::time::{Duration, Instant};
use tracing::info;

/// The four phases of a fixed update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Dominance,
    Spatial,
    Collision,
    Movement,
}

impl Phase {
    pub const ALL: [Phase; 4] = [
        Phase::Dominance,
        Phase::Spatial,
        Phase::Collision,
        Phase::Movement,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Phase::Dominance => "dominance",
            Phase::Spatial => "spatial",
            Phase::Collision => "collision",
            Phase::Movement => "movement",
        }
    }

    fn index(self) -> usize {
        match self {
            Phase::Dominance => 0,
            Phase::Spatial => 1,
            Phase::Collision => 2,
            Phase::Movement => 3,
        }
    }
}

/// Statistics for one phase.
#[derive(Debug, Default, Clone, Copy)]
pub struct PhaseStats {
    pub total_time: Duration,
    pub call_count: u64,
    pub min_time: Option<Duration>,
    pub max_time: Option<Duration>,
}

impl PhaseStats {
    pub fn avg_time(&self) -> Duration {
        if self.call_count == 0 {
            return Duration::ZERO;
        }
        let avg = self.total_time.as_nanos() / u128::from(self.call_count);
        Duration::from_nanos(u64::try_from(avg).unwrap_or(u64::MAX))
    }

    fn record(&mut self, elapsed: Duration) {
        self.total_time += elapsed;
        self.call_count += 1;
        self.min_time = Some(self.min_time.map_or(elapsed, |m| m.min(elapsed)));
        self.max_time = Some(self.max_time.map_or(elapsed, |m| m.max(elapsed)));
    }
}

/// Accumulated phase timings over a run.
#[derive(Debug, Default, Clone)]
pub struct Profiler {
    phases: [PhaseStats; 4],
    tick_count: u64,
}

impl Profiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one measured run of `phase`.
    pub fn record(&mut self, phase: Phase, elapsed: Duration) {
        self.phases[phase.index()].record(elapsed);
    }

    /// Time a phase using a closure.
    pub fn time_phase<F, R>(&mut self, phase: Phase, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let result = f();
        self.record(phase, start.elapsed());
        result
    }

    /// Increment the tick counter.
    pub fn tick(&mut self) {
        self.tick_count += 1;
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn phase(&self, phase: Phase) -> &PhaseStats {
        &self.phases[phase.index()]
    }

    /// Sum of all phase totals.
    pub fn total_time(&self) -> Duration {
        self.phases.iter().map(|s| s.total_time).sum()
    }

    /// Emit one `info` event per phase.
    pub fn log_summary(&self) {
        for phase in Phase::ALL {
            let stats = self.phase(phase);
            info!(
                phase = phase.name(),
                ticks = self.tick_count,
                total_us = micros(stats.total_time),
                avg_us = micros(stats.avg_time()),
                max_us = micros(stats.max_time.unwrap_or(Duration::ZERO)),
                "phase timing"
            );
        }
    }

    /// Reset all profiling data.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

impl fmt::Display for Profiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Phase timings ({} ticks) ===", self.tick_count)?;
        writeln!(
            f,
            "{:<12} {:>12} {:>12} {:>12} {:>12} {:>8}",
            "Phase", "Total", "Avg", "Min", "Max", "% Time"
        )?;
        let total = self.total_time();
        for phase in Phase::ALL {
            let stats = self.phase(phase);
            let pct = if total.as_nanos() > 0 {
                stats.total_time.as_nanos() as f64 / total.as_nanos() as f64 * 100.0
            } else {
                0.0
            };
            writeln!(
                f,
                "{:<12} {:>12.2?} {:>12.2?} {:>12.2?} {:>12.2?} {:>7.1}%",
                phase.name(),
                stats.total_time,
                stats.avg_time(),
                stats.min_time.unwrap_or(Duration::ZERO),
                stats.max_time.unwrap_or(Duration::ZERO),
                pct
            )?;
        }
        write!(f, "{:<12} {:>12.2?}", "TOTAL", total)
    }
}
