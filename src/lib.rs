//! Tomographic scroll volume processing: SNIC volumetric superpixel
//! clustering over a dense scalar field, chord growing across the
//! resulting superpixel adjacency graph, and the collaborators needed
//! to get real scroll data in and processed results back out.
//!
//! ## Pipeline
//!
//! 1. A chunk of volume data is fetched ([`fetch`]) or decoded from a
//!    container format ([`formats`]) into a [`field::ScalarField`].
//! 2. The field is optionally denoised, normalized, or segmented
//!    ([`preprocess`]) before clustering.
//! 3. [`snic::snic`] partitions the field into superpixels.
//! 4. [`adjacency::build_adjacency`] links superpixels that share a
//!    face, building the graph [`chord::grow_chords`] walks to grow
//!    fiber-following chords.
//! 5. Results are persisted as CSV ([`csv_io`]) or, for visual
//!    inspection, extracted as a mesh ([`mesh::march`]) and written out
//!    via [`formats::ply`] or [`formats::obj`].
//!
//! ```
//! use scroll_snic::field::ScalarField;
//! use scroll_snic::snic::snic;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let field = ScalarField::new(4, 4, 4)?;
//! let output = snic(&field, 2, 10.0)?;
//! assert!(!output.superpixels.is_empty());
//! # Ok(())
//! # }
//! ```
#![forbid(
    absolute_paths_not_starting_with_crate,
    missing_docs,
    non_ascii_idents,
    noop_method_call,
    unsafe_code,
    unused_results
)]
#![warn(
    clippy::cast_lossless,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]

pub mod adjacency;
pub mod chord;
pub mod config;
pub mod csv_io;
pub mod error;
pub mod fetch;
pub mod field;
pub mod formats;
mod heap;
pub mod mesh;
pub mod preprocess;
pub mod seed;
pub mod snic;
pub mod tracker;
