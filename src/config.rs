//! Pipeline configuration: every tunable named in the core components,
//! collected so the binary can load them from an optional TOML file
//! (layered under CLI overrides) and so tests can build fixed
//! configurations without touching the CLI layer.

use crate::chord::ChordGrowConfig;
use crate::tracker::{DEFAULT_GRID, DEFAULT_K_NEIGH, DEFAULT_MAX_RECORDS_PER_CELL, DEFAULT_R_MAX};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// SNIC clustering tunables.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SnicConfig {
    /// Seed lattice stride.
    pub d_seed: u32,
    /// Compactness weight.
    pub m: f32,
    /// Minimum cluster voxel count surviving the filter pass.
    pub n_min: u32,
    /// Minimum cluster mean intensity surviving the filter pass.
    pub c_min: f32,
}

impl Default for SnicConfig {
    fn default() -> Self {
        Self {
            d_seed: 2,
            m: 1.0,
            n_min: 0,
            c_min: 0.0,
        }
    }
}

/// Volume direction index tunables.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrackerConfig {
    /// Grid resolution along each spatial axis.
    pub grid: u32,
    /// Cap on direction records retained per grid cell.
    pub max_records_per_cell: u32,
    /// Number of contributing records at which a query stops early.
    pub k_neigh: usize,
    /// Euclidean distance beyond which a record does not contribute.
    pub r_max: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            grid: DEFAULT_GRID,
            max_records_per_cell: DEFAULT_MAX_RECORDS_PER_CELL,
            k_neigh: DEFAULT_K_NEIGH,
            r_max: DEFAULT_R_MAX,
        }
    }
}

/// Chord-grower configuration, mirrored here so it can be (de)serialized
/// alongside the rest of the pipeline. Converts to/from
/// [`ChordGrowConfig`].
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChordConfig {
    /// Weight on raw adjacency edge strength in a step's score.
    pub w_strength: f32,
    /// Weight on axial progress in a step's score.
    pub w_progress: f32,
    /// Weight on the volume direction index's parallelism prior.
    pub w_parallel: f32,
    /// Weight on alignment with the chord's recent step directions.
    pub w_alignment: f32,
    /// Minimum axial progress a candidate step must make to be taken.
    pub progress_threshold: f32,
    /// Minimum smoothness a candidate step must have to be taken.
    pub smoothness_threshold: f32,
    /// A chord shorter than this, summed over both growth directions,
    /// is discarded.
    pub min_chord_length: usize,
    /// Growth in either direction stops once a chord reaches this length.
    pub max_chord_length: usize,
    /// Number of axial layers seeds are distributed across.
    pub num_layers: u32,
    /// Minimum adjacency degree a seed must have to be eligible.
    pub min_connections: usize,
    /// Percentile above which a layer's superpixels are eligible seeds.
    pub seed_percentile: f32,
    /// Number of recent step directions kept for smoothness scoring.
    pub max_recent_dirs: usize,
    /// Target number of chords to grow per chunk invocation.
    pub target_count: usize,
}

impl Default for ChordConfig {
    fn default() -> Self {
        let g = ChordGrowConfig::default();
        Self {
            w_strength: g.w_strength,
            w_progress: g.w_progress,
            w_parallel: g.w_parallel,
            w_alignment: g.w_alignment,
            progress_threshold: g.progress_threshold,
            smoothness_threshold: g.smoothness_threshold,
            min_chord_length: g.min_chord_length,
            max_chord_length: g.max_chord_length,
            num_layers: g.num_layers,
            min_connections: g.min_connections,
            seed_percentile: g.seed_percentile,
            max_recent_dirs: g.max_recent_dirs,
            target_count: 64,
        }
    }
}

impl From<ChordConfig> for ChordGrowConfig {
    fn from(c: ChordConfig) -> Self {
        ChordGrowConfig {
            w_strength: c.w_strength,
            w_progress: c.w_progress,
            w_parallel: c.w_parallel,
            w_alignment: c.w_alignment,
            progress_threshold: c.progress_threshold,
            smoothness_threshold: c.smoothness_threshold,
            min_chord_length: c.min_chord_length,
            max_chord_length: c.max_chord_length,
            num_layers: c.num_layers,
            min_connections: c.min_connections,
            seed_percentile: c.seed_percentile,
            max_recent_dirs: c.max_recent_dirs,
        }
    }
}

/// Every tunable needed to run the pipeline end to end on one chunk.
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PipelineConfig {
    /// SNIC clustering tunables.
    pub snic: SnicConfig,
    /// Volume direction index tunables.
    pub tracker: TrackerConfig,
    /// Chord-grower tunables.
    pub chord: ChordConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = PipelineConfig::default();
        assert_eq!(config.snic.d_seed, 2);
        assert!((config.chord.w_strength - 0.1).abs() < 1e-6);
        assert!((config.chord.w_progress - 0.7).abs() < 1e-6);
        assert_eq!(config.chord.min_chord_length, 8);
        assert_eq!(config.tracker.grid, 32);
    }

    #[test]
    fn chord_config_weights_sum_to_one() {
        let c = ChordConfig::default();
        let sum = c.w_strength + c.w_progress + c.w_parallel + c.w_alignment;
        assert!((sum - 1.0).abs() < 1e-6);
    }
}
