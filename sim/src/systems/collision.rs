//! Collision system - finds overlapping particles and applies the collision rule.
//!
//! ## Phases
//!
//! 1. **Gather** - read-only walk over the spatial grid. Each occupied cell
//!    (in sorted order) tests its own unordered pairs, then pairs against its
//!    forward neighbour cells, so every overlapping pair is reported exactly
//!    once. Cells are independent here; with `--features parallel` they are
//!    processed with rayon and the per-cell results concatenated in order.
//!
//! 2. **Apply** - sequential. Each gathered pair is resolved against the
//!    *live* components, so a particle converted or popped earlier in the
//!    scan is judged by its new state, not by the grid's copy.

use crate::components::*;
use crate::config::{BattleConfig, CollisionRule};
use crate::spatial::{
    forward_offset_count, forward_offsets, Cell, SpatialEntry, SpatialGrid, MAX_NEIGHBOR_REACH,
};
use crate::systems::dominance::{convert_pair, DominanceState, PairMember};
use crate::systems::events::{ConversionEvent, FrameEvents, PopEvent};
use crate::systems::movement::SimTime;
use bevy_ecs::prelude::*;
use std::collections::HashSet;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Two overlapping particles, as seen by the grid at rebuild time.
pub type CollisionPair = (SpatialEntry, SpatialEntry);

/// Overlapping pairs involving `cell`: its own pairs plus pairs with forward neighbours.
fn pairs_for_cell(grid: &SpatialGrid, cell: Cell, offsets: &[Cell]) -> Vec<CollisionPair> {
    let mut pairs = Vec::new();
    let entries = grid.cell_entries(cell);

    for (i, a) in entries.iter().enumerate() {
        for b in &entries[i + 1..] {
            if a.overlaps(b) {
                pairs.push((*a, *b));
            }
        }
    }

    for &(dx, dy) in offsets {
        let neighbors = grid.cell_entries((cell.0 + dx, cell.1 + dy));
        if neighbors.is_empty() {
            continue;
        }
        for a in entries {
            for b in neighbors {
                if a.overlaps(b) {
                    pairs.push((*a, *b));
                }
            }
        }
    }

    pairs
}

/// Overlapping pairs involving `cells[index]`: its own pairs plus pairs with
/// every later occupied cell within `reach` rings.
///
/// Used instead of the offset table when the reach is so wide that walking
/// the occupied cells is cheaper than walking the neighbourhood.
fn pairs_for_cell_direct(
    grid: &SpatialGrid,
    cells: &[Cell],
    index: usize,
    reach: i32,
) -> Vec<CollisionPair> {
    let mut pairs = pairs_for_cell(grid, cells[index], &[]);
    let (cx, cy) = cells[index];
    let entries = grid.cell_entries(cells[index]);

    for &(nx, ny) in &cells[index + 1..] {
        let ring = (i64::from(nx) - i64::from(cx))
            .abs()
            .max((i64::from(ny) - i64::from(cy)).abs());
        if ring > i64::from(reach) {
            continue;
        }
        for a in entries {
            for b in grid.cell_entries((nx, ny)) {
                if a.overlaps(b) {
                    pairs.push((*a, *b));
                }
            }
        }
    }

    pairs
}

/// Collect every overlapping pair in the grid, each exactly once, in a
/// deterministic order.
pub fn gather_overlapping_pairs(grid: &SpatialGrid) -> Vec<CollisionPair> {
    let cells = grid.occupied_cells();
    let reach = grid.neighbor_reach();

    let offsets = match forward_offset_count(reach) {
        Some(count) if reach <= MAX_NEIGHBOR_REACH || count <= cells.len() => {
            Some(forward_offsets(reach))
        }
        _ => None,
    };

    #[cfg(feature = "parallel")]
    let per_cell: Vec<Vec<CollisionPair>> = match &offsets {
        Some(offsets) => cells
            .par_iter()
            .map(|&cell| pairs_for_cell(grid, cell, offsets))
            .collect(),
        None => (0..cells.len())
            .into_par_iter()
            .map(|i| pairs_for_cell_direct(grid, &cells, i, reach))
            .collect(),
    };

    #[cfg(not(feature = "parallel"))]
    let per_cell: Vec<Vec<CollisionPair>> = match &offsets {
        Some(offsets) => cells
            .iter()
            .map(|&cell| pairs_for_cell(grid, cell, offsets))
            .collect(),
        None => (0..cells.len())
            .map(|i| pairs_for_cell_direct(grid, &cells, i, reach))
            .collect(),
    };

    per_cell.into_iter().flatten().collect()
}

/// System that scans for overlaps and applies the configured collision rule.
pub fn collision_system(
    mut commands: Commands,
    grid: Res<SpatialGrid>,
    config: Res<BattleConfig>,
    time: Res<SimTime>,
    state: Res<DominanceState>,
    mut events: ResMut<FrameEvents>,
    mut query: Query<(&ParticleId, &mut Team, &mut Body, &mut LastConversion)>,
) {
    let pairs = gather_overlapping_pairs(&grid);
    if pairs.is_empty() {
        return;
    }
    let now = time.0;

    match config.collision_rule {
        CollisionRule::Convert => {
            for (a, b) in &pairs {
                let Ok([(id_a, mut team_a, _, mut last_a), (id_b, mut team_b, _, mut last_b)]) =
                    query.get_many_mut([a.entity, b.entity])
                else {
                    continue;
                };
                let converted = convert_pair(
                    &state,
                    config.conversion_cooldown,
                    now,
                    (&mut *team_a, &mut *last_a),
                    (&mut *team_b, &mut *last_b),
                );
                let (converter, converted, at) = match converted {
                    Some(PairMember::First) => (id_b, id_a, a),
                    Some(PairMember::Second) => (id_a, id_b, b),
                    None => continue,
                };
                events.conversions.push(ConversionEvent {
                    converter: *converter,
                    converted: *converted,
                    team: state.dominant(),
                    x: at.x,
                    y: at.y,
                    time: now,
                });
            }
        }
        CollisionRule::Pop => {
            let mut popped: HashSet<Entity> = HashSet::new();
            for (a, b) in &pairs {
                if popped.contains(&a.entity) || popped.contains(&b.entity) {
                    continue;
                }
                let Ok([(id_a, team_a, _, _), (id_b, team_b, _, _)]) =
                    query.get_many([a.entity, b.entity])
                else {
                    continue;
                };
                let (victim, victim_id, attacker_id, victim_team) =
                    if state.is_dominant(*team_a) && *team_b == state.submissive() {
                        (b, *id_b, *id_a, *team_b)
                    } else if state.is_dominant(*team_b) && *team_a == state.submissive() {
                        (a, *id_a, *id_b, *team_a)
                    } else {
                        continue;
                    };
                popped.insert(victim.entity);
                commands.entity(victim.entity).despawn();
                events.pops.push(PopEvent {
                    popped: victim_id,
                    by: attacker_id,
                    team: victim_team,
                    x: victim.x,
                    y: victim.y,
                    time: now,
                });
            }
        }
        CollisionRule::Grow { growth, max_radius } => {
            for (a, b) in &pairs {
                let Ok([(_, _, mut body_a, _), (_, _, mut body_b, _)]) =
                    query.get_many_mut([a.entity, b.entity])
                else {
                    continue;
                };
                body_a.grow(growth, max_radius);
                body_b.grow(growth, max_radius);
            }
        }
    }
}
