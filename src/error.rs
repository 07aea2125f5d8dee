//! Error enums for volumetric superpixel and chord calculation.
use std::collections::TryReserveError;

/// Error for field, SNIC, adjacency, direction-index and chord-growing
/// calculations, and for the ambient I/O/format collaborators around them.
#[derive(Clone, Debug)]
pub enum ScSnicError {
    /// The field's `(lz, ly, lx)` dimensions are `0`.
    InvalidFieldDimension,
    /// The supplied buffer length does not match `lz * ly * lx`.
    MismatchedFieldBuffer,
    /// `d_seed` is `0`.
    ZeroSeedStride,
    /// A voxel or neighbor coordinate fell outside the field.
    InputOutOfBounds,
    /// A label outside the live superpixel range, or the unassigned
    /// sentinel, was used where a live superpixel was required.
    InvalidSuperpixel,
    /// Pop attempted on an empty heap.
    HeapEmpty,
    /// Reserving space for a collection required by the calculation failed.
    AllocationFailure,
    /// A distance calculation produced a `NaN`.
    NanDistance,
    /// An error occurred while initializing SNIC seeds.
    SeedError(SeedErrorKind),
    /// Space could not be reserved for a collection required in superpixel
    /// calculation.
    Reserve(TryReserveError),
    /// A container-format decode or encode failed.
    Format(String),
    /// The remote or local chunk store could not be reached, or returned
    /// malformed data.
    Fetch(String),
    /// An I/O error occurred.
    Io(String),
    /// A CSV read or write error occurred.
    Csv(String),
    /// A JSON metadata parse error occurred.
    Json(String),
    /// A general error occurred.
    General(&'static str),
}

impl std::fmt::Display for ScSnicError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidFieldDimension => write!(f, "field dimension cannot be 0"),
            Self::MismatchedFieldBuffer => {
                write!(f, "field buffer length does not match lz * ly * lx")
            }
            Self::ZeroSeedStride => write!(f, "seed stride d_seed cannot be 0"),
            Self::InputOutOfBounds => write!(f, "voxel or neighbor coordinate out of bounds"),
            Self::InvalidSuperpixel => write!(f, "label does not index a live superpixel"),
            Self::HeapEmpty => write!(f, "pop from an empty heap"),
            Self::AllocationFailure => write!(f, "allocation failed for a required collection"),
            Self::NanDistance => write!(f, "NaN encountered in a distance calculation"),
            Self::SeedError(e) => write!(f, "{e}"),
            Self::Reserve(e) => write!(f, "{e}"),
            Self::Format(e) => write!(f, "format error: {e}"),
            Self::Fetch(e) => write!(f, "chunk fetch error: {e}"),
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::Csv(e) => write!(f, "csv error: {e}"),
            Self::Json(e) => write!(f, "json error: {e}"),
            Self::General(e) => write!(f, "{e}"),
        }
    }
}

/// Errors that can occur while selecting SNIC seeds.
#[derive(Clone, Debug)]
pub enum SeedErrorKind {
    /// Index out of bounds for seed initialization.
    InvalidFieldIndex,
    /// The total number of seeds is too large to be stored in a vector.
    InvalidTotalSeeds,
}

impl std::fmt::Display for SeedErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidFieldIndex => write!(f, "invalid field index for seed initialization"),
            Self::InvalidTotalSeeds => write!(f, "total number of seeds too large"),
        }
    }
}

impl std::error::Error for ScSnicError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Reserve(e) => e.source(),
            _ => None,
        }
    }
}

impl From<TryReserveError> for ScSnicError {
    fn from(error: TryReserveError) -> Self {
        Self::Reserve(error)
    }
}

impl From<&'static str> for ScSnicError {
    fn from(error: &'static str) -> Self {
        Self::General(error)
    }
}

impl From<std::io::Error> for ScSnicError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<csv::Error> for ScSnicError {
    fn from(error: csv::Error) -> Self {
        Self::Csv(error.to_string())
    }
}

impl From<serde_json::Error> for ScSnicError {
    fn from(error: serde_json::Error) -> Self {
        Self::Json(error.to_string())
    }
}
