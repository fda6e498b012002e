//! Spatial partitioning for broad-phase collision.
//!
//! Particles are bucketed by the cell containing their center. A particle's
//! circle can spill into neighbouring cells, so pair searches must look at
//! surrounding cells too; [`SpatialGrid::neighbor_reach`] says how many rings.

use crate::components::{Body, Position, Team};
use bevy_ecs::prelude::*;
use std::collections::HashMap;

/// Cell coordinate: `(floor(x / cell_size), floor(y / cell_size))`.
pub type Cell = (i32, i32);

/// Largest neighbour reach, in cell rings, that the offset-based pair scan
/// will walk. Configs needing more are rejected by `BattleConfig::validate`;
/// grids built by hand past it fall back to pairing occupied cells directly.
pub const MAX_NEIGHBOR_REACH: i32 = 16;

/// Rings needed so that circles of `max_radius` in cells of `cell_size`
/// are always found, at least one. Saturates instead of overflowing.
pub fn reach_for(max_radius: f32, cell_size: f32) -> i32 {
    let rings = (2.0 * max_radius / cell_size).ceil();
    if rings.is_nan() || rings <= 1.0 {
        1
    } else {
        // `as` saturates at i32::MAX for huge or infinite values.
        rings as i32
    }
}

/// Grid-based spatial partitioning structure.
///
/// Rebuilt from scratch every frame; nothing persists between rebuilds.
#[derive(Resource, Debug)]
pub struct SpatialGrid {
    /// Cell size in world units.
    pub cell_size: f32,
    /// Map from cell coordinates to the particles whose centers are in it.
    cells: HashMap<Cell, Vec<SpatialEntry>>,
    /// Number of entries across all cells.
    count: usize,
    /// Largest collision radius inserted since the last clear.
    max_radius: f32,
}

/// Entry in a spatial cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialEntry {
    pub entity: Entity,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub team: Team,
}

impl SpatialEntry {
    /// Strict circle overlap, compared on squared distances.
    #[inline]
    pub fn overlaps(&self, other: &SpatialEntry) -> bool {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let reach = self.radius + other.radius;
        dx * dx + dy * dy < reach * reach
    }
}

impl Default for SpatialGrid {
    fn default() -> Self {
        Self::new(50.0)
    }
}

impl SpatialGrid {
    /// Create a new spatial grid with the given cell size.
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            cells: HashMap::new(),
            count: 0,
            max_radius: 0.0,
        }
    }

    /// Convert world coordinates to cell coordinates.
    #[inline]
    pub fn world_to_cell(&self, x: f32, y: f32) -> Cell {
        (
            (x / self.cell_size).floor() as i32,
            (y / self.cell_size).floor() as i32,
        )
    }

    /// Clear all entries (call at start of each frame before rebuilding).
    pub fn clear(&mut self) {
        self.cells.clear();
        self.count = 0;
        self.max_radius = 0.0;
    }

    /// Insert a particle at its center.
    pub fn insert(&mut self, entry: SpatialEntry) {
        let cell = self.world_to_cell(entry.x, entry.y);
        self.cells.entry(cell).or_default().push(entry);
        self.count += 1;
        self.max_radius = self.max_radius.max(entry.radius);
    }

    /// Clear and refill from an iterator of entries.
    pub fn rebuild(&mut self, entries: impl IntoIterator<Item = SpatialEntry>) {
        self.clear();
        for entry in entries {
            self.insert(entry);
        }
    }

    /// Entries bucketed in `cell` (empty if the cell is unoccupied).
    pub fn cell_entries(&self, cell: Cell) -> &[SpatialEntry] {
        self.cells.get(&cell).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Get count of entities in a cell.
    pub fn cell_count(&self, cell: Cell) -> usize {
        self.cell_entries(cell).len()
    }

    /// Get total entity count.
    pub fn total_count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Largest collision radius currently in the grid.
    pub fn max_radius(&self) -> f32 {
        self.max_radius
    }

    /// Occupied cells in ascending order, for deterministic traversal.
    pub fn occupied_cells(&self) -> Vec<Cell> {
        let mut cells: Vec<Cell> = self.cells.keys().copied().collect();
        cells.sort_unstable();
        cells
    }

    /// Number of cell rings around a cell that can hold an overlapping partner.
    ///
    /// Two circles overlap only if their centers are closer than
    /// `2 * max_radius`, so that many cells (at least one ring) must be searched.
    pub fn neighbor_reach(&self) -> i32 {
        reach_for(self.max_radius, self.cell_size)
    }

    /// Get all cells (for debugging/visualization).
    pub fn all_cells(&self) -> impl Iterator<Item = (&Cell, &Vec<SpatialEntry>)> {
        self.cells.iter()
    }
}

/// Offsets to the "forward" half of the neighbourhood within `reach` rings.
///
/// Exactly one of `d` and `-d` is included for every non-zero offset, so
/// scanning a cell against its forward neighbours visits each cross-cell
/// pair once.
///
/// Callers should check [`forward_offset_count`] first; a reach past
/// [`MAX_NEIGHBOR_REACH`] produces an impractically large table.
pub fn forward_offsets(reach: i32) -> Vec<Cell> {
    let mut offsets = Vec::with_capacity(forward_offset_count(reach).unwrap_or(0));
    for dx in 0..=reach {
        for dy in -reach..=reach {
            if dx > 0 || dy > 0 {
                offsets.push((dx, dy));
            }
        }
    }
    offsets
}

/// Number of forward offsets for `reach` rings, `((2r + 1)^2 - 1) / 2`,
/// or `None` if it does not fit in `usize`.
pub fn forward_offset_count(reach: i32) -> Option<usize> {
    let side = usize::try_from(reach)
        .ok()?
        .checked_mul(2)?
        .checked_add(1)?;
    Some(side.checked_mul(side)? / 2)
}

/// System that rebuilds the spatial grid each frame.
pub fn spatial_grid_update_system(
    mut grid: ResMut<SpatialGrid>,
    query: Query<(Entity, &Position, &Body, &Team)>,
) {
    grid.rebuild(query.iter().map(|(entity, pos, body, team)| SpatialEntry {
        entity,
        x: pos.x,
        y: pos.y,
        radius: body.radius,
        team: *team,
    }));
}
