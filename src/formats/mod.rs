//! Container-format decoders and encoders, one submodule per format this
//! crate's collaborators need to read or write. Each format is a narrow,
//! self-contained codec operating on plain buffers and [`ScalarField`]s;
//! none of them depend on core types beyond that.
//!
//! [`ScalarField`]: crate::field::ScalarField

pub mod nrrd;
pub mod obj;
pub mod ply;
pub mod ppm;
pub mod tiff;
pub mod vcps;
pub mod zarr;
