//! Volume direction index: a capped uniform-grid spatial structure
//! supporting approximate local parallelism queries during chord growth.
//!
//! Cell lists store **indices** into an append-only `records` array
//! rather than raw pointers, and that array is reserved at full
//! field-derived capacity up front, so a push never invalidates an
//! index already linked into a cell list. This is the sound
//! re-architecture of a design that would otherwise rely on raw pointers
//! surviving a growing array's reallocation, which it cannot.

use crate::error::ScSnicError;

/// Default grid resolution along each spatial axis.
pub const DEFAULT_GRID: u32 = 32;
/// Default cap on records retained per cell.
pub const DEFAULT_MAX_RECORDS_PER_CELL: u32 = 64;
/// Default number of contributing records at which a query stops early.
pub const DEFAULT_K_NEIGH: usize = 8;
/// Default Euclidean distance beyond which a record does not contribute.
pub const DEFAULT_R_MAX: f32 = 8.0;

/// A single `(position, unit direction)` sample.
#[derive(Debug, Clone, Copy)]
struct DirectionRecord {
    pos: [f32; 3],
    dir: [f32; 3],
}

#[derive(Debug, Clone, Copy, Default)]
struct SpatialCell {
    head: Option<u32>,
    count: u32,
}

/// Capped uniform-grid index of direction samples.
#[derive(Debug, Clone)]
pub struct VolumeDirectionIndex {
    records: Vec<DirectionRecord>,
    next: Vec<Option<u32>>,
    cells: Vec<SpatialCell>,
    grid: u32,
    max_records_per_cell: u32,
    k_neigh: usize,
    r_max: f32,
    extent: [f32; 3],
}

impl VolumeDirectionIndex {
    /// Create an index over a field of extent `(lz, ly, lx)`, with
    /// `capacity` records reserved up front (an upper bound derived from
    /// the field size, e.g. its voxel count, keeps every future `add`
    /// index-stable).
    pub fn new(
        lz: u32,
        ly: u32,
        lx: u32,
        capacity: usize,
        grid: u32,
        max_records_per_cell: u32,
        k_neigh: usize,
        r_max: f32,
    ) -> Result<Self, ScSnicError> {
        if grid == 0 {
            return Err(ScSnicError::General("tracker grid resolution cannot be 0"));
        }
        let mut records = Vec::new();
        records.try_reserve_exact(capacity)?;
        let mut next = Vec::new();
        next.try_reserve_exact(capacity)?;

        let mut cells = Vec::new();
        cells.try_reserve_exact((grid as usize).pow(3))?;
        cells.extend(std::iter::repeat(SpatialCell::default()).take((grid as usize).pow(3)));

        Ok(Self {
            records,
            next,
            cells,
            grid,
            max_records_per_cell,
            k_neigh,
            r_max,
            extent: [lz.max(1) as f32, ly.max(1) as f32, lx.max(1) as f32],
        })
    }

    /// Construct with every tunable at its documented default.
    pub fn with_defaults(lz: u32, ly: u32, lx: u32, capacity: usize) -> Result<Self, ScSnicError> {
        Self::new(
            lz,
            ly,
            lx,
            capacity,
            DEFAULT_GRID,
            DEFAULT_MAX_RECORDS_PER_CELL,
            DEFAULT_K_NEIGH,
            DEFAULT_R_MAX,
        )
    }

    /// Number of records ever added, including those a full cell later
    /// declined to link (they remain in the array but are unreachable
    /// from any cell list).
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if no record has ever been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn cell_index(&self, pos: [f32; 3]) -> usize {
        let g = self.grid as f32;
        let qz = ((pos[0] / self.extent[0]) * g) as i64;
        let qy = ((pos[1] / self.extent[1]) * g) as i64;
        let qx = ((pos[2] / self.extent[2]) * g) as i64;
        let clamp = |v: i64| v.clamp(0, self.grid as i64 - 1) as usize;
        let (qz, qy, qx) = (clamp(qz), clamp(qy), clamp(qx));
        qz * (self.grid as usize) * (self.grid as usize) + qy * (self.grid as usize) + qx
    }

    /// Append a direction record at `pos`, linking it into its cell's
    /// list unless that cell is already at `max_records_per_cell`.
    pub fn add(&mut self, pos: [f32; 3], dir: [f32; 3]) -> Result<(), ScSnicError> {
        self.records.try_reserve(1)?;
        self.next.try_reserve(1)?;
        let idx = self.records.len() as u32;
        self.records.push(DirectionRecord { pos, dir });

        let cell_idx = self.cell_index(pos);
        let cell = &mut self.cells[cell_idx];
        if cell.count < self.max_records_per_cell {
            self.next.push(cell.head);
            cell.head = Some(idx);
            cell.count += 1;
        } else {
            self.next.push(None);
        }
        Ok(())
    }

    /// Mean `|dir . record.dir|` over up to `k_neigh` records within
    /// `r_max` of `pos`, visiting the 3x3x3 block of cells around `pos`'s
    /// own cell. Returns `1.0` if no record contributed (no local
    /// context yet, interpreted as "do not penalise").
    #[must_use]
    pub fn parallel_score(&self, pos: [f32; 3], dir: [f32; 3]) -> f32 {
        let g = self.grid as i64;
        let center = self.cell_coords(pos);

        let mut total = 0.0f32;
        let mut contributed = 0usize;

        'blocks: for dz in -1..=1 {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let cz = center.0 + dz;
                    let cy = center.1 + dy;
                    let cx = center.2 + dx;
                    if !(0..g).contains(&cz) || !(0..g).contains(&cy) || !(0..g).contains(&cx) {
                        continue;
                    }
                    let cell_idx = (cz as usize) * (self.grid as usize) * (self.grid as usize)
                        + (cy as usize) * (self.grid as usize)
                        + (cx as usize);
                    let mut cursor = self.cells[cell_idx].head;
                    while let Some(idx) = cursor {
                        let record = &self.records[idx as usize];
                        let d = dist(pos, record.pos);
                        if d <= self.r_max {
                            total += dot(dir, record.dir).abs();
                            contributed += 1;
                            if contributed >= self.k_neigh {
                                break 'blocks;
                            }
                        }
                        cursor = self.next[idx as usize];
                    }
                }
            }
        }

        if contributed == 0 {
            1.0
        } else {
            total / contributed as f32
        }
    }

    fn cell_coords(&self, pos: [f32; 3]) -> (i64, i64, i64) {
        let g = self.grid as f32;
        let qz = ((pos[0] / self.extent[0]) * g) as i64;
        let qy = ((pos[1] / self.extent[1]) * g) as i64;
        let qx = ((pos[2] / self.extent[2]) * g) as i64;
        let clamp = |v: i64| v.clamp(0, self.grid as i64 - 1);
        (clamp(qz), clamp(qy), clamp(qx))
    }
}

fn dist(a: [f32; 3], b: [f32; 3]) -> f32 {
    let dz = a[0] - b[0];
    let dy = a[1] - b[1];
    let dx = a[2] - b[2];
    (dz * dz + dy * dy + dx * dx).sqrt()
}

fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tracker_scores_one_everywhere() {
        let tracker = VolumeDirectionIndex::with_defaults(32, 32, 32, 16).unwrap();
        assert_eq!(tracker.parallel_score([0.0, 0.0, 0.0], [1.0, 0.0, 0.0]), 1.0);
    }

    #[test]
    fn aligned_and_perpendicular_queries() {
        let mut tracker = VolumeDirectionIndex::with_defaults(32, 32, 32, 16).unwrap();
        tracker.add([0.0, 0.0, 0.0], [1.0, 0.0, 0.0]).unwrap();
        assert!((tracker.parallel_score([0.0, 0.0, 0.0], [1.0, 0.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(tracker.parallel_score([0.0, 0.0, 0.0], [0.0, 1.0, 0.0]).abs() < 1e-6);
    }

    #[test]
    fn records_beyond_r_max_do_not_contribute() {
        let mut tracker =
            VolumeDirectionIndex::new(256, 256, 256, 16, 32, 64, 8, 1.0).unwrap();
        tracker.add([0.0, 0.0, 0.0], [1.0, 0.0, 0.0]).unwrap();
        let score = tracker.parallel_score([100.0, 100.0, 100.0], [1.0, 0.0, 0.0]);
        assert_eq!(score, 1.0);
    }

    #[test]
    fn cell_cap_drops_excess_records_without_error() {
        let mut tracker = VolumeDirectionIndex::new(32, 32, 32, 64, 32, 2, 8, 8.0).unwrap();
        for _ in 0..10 {
            tracker.add([0.0, 0.0, 0.0], [1.0, 0.0, 0.0]).unwrap();
        }
        assert_eq!(tracker.len(), 10);
        // Score is still well-defined; it just reflects at most 2
        // contributing records from the capped cell.
        let score = tracker.parallel_score([0.0, 0.0, 0.0], [1.0, 0.0, 0.0]);
        assert!((0.0..=1.0).contains(&score));
    }
}
