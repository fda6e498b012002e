//! Serialization utilities for snapshots and frame events.

use crate::systems::events::FrameEvents;
use crate::world::Snapshot;

/// Serialize a snapshot to JSON bytes.
pub fn snapshot_to_json(snapshot: &Snapshot) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(snapshot)
}

/// Serialize a snapshot to a JSON string.
pub fn snapshot_to_json_string(snapshot: &Snapshot) -> Result<String, serde_json::Error> {
    serde_json::to_string(snapshot)
}

/// Deserialize a snapshot from JSON bytes.
pub fn snapshot_from_json(data: &[u8]) -> Result<Snapshot, serde_json::Error> {
    serde_json::from_slice(data)
}

/// Deserialize a snapshot from a JSON string.
pub fn snapshot_from_json_string(data: &str) -> Result<Snapshot, serde_json::Error> {
    serde_json::from_str(data)
}

/// Serialize one frame's events as a single JSON line, for event logs.
pub fn events_to_json_line(events: &FrameEvents) -> Result<String, serde_json::Error> {
    let mut line = serde_json::to_string(events)?;
    line.push('\n');
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{ParticleId, Team};
    use crate::systems::events::{ConversionEvent, SwapEvent};
    use crate::systems::scoring::{Outcome, TeamCounts};
    use crate::world::ParticleSnapshot;

    #[test]
    fn test_snapshot_json_restores_outcome_and_events() {
        let mut events = FrameEvents::default();
        events.conversions.push(ConversionEvent {
            converter: ParticleId(1),
            converted: ParticleId(2),
            team: Team::A,
            x: 5.0,
            y: 6.0,
            time: 1.5,
        });
        events.swaps.push(SwapEvent {
            time: 1.5,
            dominant: Team::B,
            submissive_count: 40,
            threshold: 50,
        });
        let snapshot = Snapshot {
            tick: 90,
            time: 1.5,
            dominant: Team::B,
            submissive: Team::A,
            counts: TeamCounts { a: 40, b: 0 },
            outcome: Outcome::Victory { winner: Team::A },
            particles: vec![ParticleSnapshot {
                id: 2,
                team: Team::A,
                x: 5.0,
                y: 6.0,
                vx: 0.0,
                vy: 0.0,
                radius: 15.0,
                last_conversion: Some(1.5),
            }],
            events,
        };

        let json = snapshot_to_json_string(&snapshot).unwrap();
        let restored = snapshot_from_json_string(&json).unwrap();

        assert_eq!(restored.tick, 90);
        assert_eq!(restored.outcome, Outcome::Victory { winner: Team::A });
        assert_eq!(restored.events, snapshot.events);
        assert_eq!(restored.particles, snapshot.particles);

        let bytes = snapshot_to_json(&snapshot).unwrap();
        assert_eq!(snapshot_from_json(&bytes).unwrap().counts.a, 40);
    }

    #[test]
    fn test_events_line_is_newline_terminated() {
        let line = events_to_json_line(&FrameEvents::default()).unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
    }
}
