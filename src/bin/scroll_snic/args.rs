use clap::Parser;
use std::path::PathBuf;

/// Axial direction chords advance along, as a CLI-friendly mirror of
/// [`scroll_snic::chord::Axis`].
#[derive(Debug, Clone, Copy)]
pub enum AxisArg {
    Z,
    Y,
    X,
}

impl std::str::FromStr for AxisArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            s if s.eq_ignore_ascii_case("z") => Ok(Self::Z),
            s if s.eq_ignore_ascii_case("y") => Ok(Self::Y),
            s if s.eq_ignore_ascii_case("x") => Ok(Self::X),
            other => Err(format!("unknown axis '{other}', expected z, y, or x")),
        }
    }
}

impl std::fmt::Display for AxisArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Z => write!(f, "z"),
            Self::Y => write!(f, "y"),
            Self::X => write!(f, "x"),
        }
    }
}

impl From<AxisArg> for scroll_snic::chord::Axis {
    fn from(axis: AxisArg) -> Self {
        match axis {
            AxisArg::Z => scroll_snic::chord::Axis::Z,
            AxisArg::Y => scroll_snic::chord::Axis::Y,
            AxisArg::X => scroll_snic::chord::Axis::X,
        }
    }
}

#[derive(Debug, Parser)]
#[clap(version, about, long_about = None)]
pub struct Opt {
    /// Path or URL root of the scroll volume zarr store.
    #[clap(long, parse(from_os_str))]
    pub volume: PathBuf,

    /// Optional fiber mask zarr store, dilated before being written
    /// alongside each chunk's results.
    #[clap(long, parse(from_os_str))]
    pub fiber_mask: Option<PathBuf>,

    /// Output directory for per-chunk CSV (and optional mesh) results.
    #[clap(short, long, parse(from_os_str))]
    pub output: PathBuf,

    /// First Z chunk index, inclusive.
    #[clap(long, default_value_t = 0)]
    pub z_start: u32,

    /// Last Z chunk index, exclusive.
    #[clap(long, default_value_t = 1)]
    pub z_end: u32,

    /// First Y chunk index, inclusive.
    #[clap(long, default_value_t = 0)]
    pub y_start: u32,

    /// Last Y chunk index, exclusive.
    #[clap(long, default_value_t = 1)]
    pub y_end: u32,

    /// First X chunk index, inclusive.
    #[clap(long, default_value_t = 0)]
    pub x_start: u32,

    /// Last X chunk index, exclusive.
    #[clap(long, default_value_t = 1)]
    pub x_end: u32,

    /// Voxel extent of a single zarr chunk along each axis.
    #[clap(long, default_value_t = 128)]
    pub chunk_dim: u32,

    /// SNIC seed lattice stride.
    #[clap(long, default_value_t = 2)]
    pub d_seed: u32,

    /// SNIC compactness weight.
    #[clap(short, default_value_t = 10.0)]
    pub m: f32,

    /// Minimum adjacency degree a chord seed must have.
    #[clap(long, default_value_t = 4)]
    pub min_connections: usize,

    /// Axis chords advance along.
    #[clap(short, long, default_value = "z")]
    pub axis: AxisArg,

    /// Target number of chords to grow per chunk.
    #[clap(long, default_value_t = 64)]
    pub target_count: usize,

    /// Optional TOML file overriding the default pipeline configuration,
    /// itself overridden by any more specific flag above.
    #[clap(long, parse(from_os_str))]
    pub config: Option<PathBuf>,

    /// Worker thread count, defaulting to the available parallelism.
    #[clap(long)]
    pub threads: Option<usize>,

    /// Gzip-compress the output CSV files.
    #[clap(long)]
    pub gzip: bool,

    /// Seed for the deterministic chord-seed RNG.
    #[clap(long, default_value_t = 0)]
    pub seed: u64,

    /// Print a one-line summary (chunk count, chord count, time) per chunk.
    #[clap(short, long)]
    pub verbose: bool,
}
