//! Seed selection for chord growing.
//!
//! Candidate chord starting points are drawn from the superpixels a SNIC
//! run already produced, not from the raw field: the field has already
//! been summarized into `(centroid, mean intensity, size)` tuples by the
//! time this module runs, so there is no perturbation step here the way
//! there is for SNIC's own 2-D lattice seeding — a superpixel's centroid
//! already is a noise-robust position estimate.
//!
//! Superpixels are bucketed into [`NUM_LAYERS`] axial layers by their
//! centroid `z`, and within each layer only the brightest superpixels
//! (above the `percentile`-th percentile of that layer's mean intensity)
//! are eligible, before up to `target_count / NUM_LAYERS` are drawn from
//! the eligible set without replacement. This resolves this crate's
//! chosen reading of "prefer bright superpixels as chord seeds": the
//! default `percentile` is `75.0`, though the alternate low-percentile
//! behaviour seen in some reference material is reachable by passing a
//! low value instead.

use crate::adjacency::AdjacencyGraph;
use crate::error::{ScSnicError, SeedErrorKind};
use crate::snic::Superpixel;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Number of axial (z) layers seeds are distributed across.
pub const NUM_LAYERS: u32 = 256;

/// Pick chord seed superpixel labels from a completed SNIC run.
///
/// `superpixels` is 1-indexed parallel to `adjacency` (index `0` vacant,
/// as throughout this crate). `lz` is the field's extent along the axial
/// dimension, used to bucket superpixel centroids into [`NUM_LAYERS`]
/// layers. `target_count` is the desired total seed count across all
/// layers (the actual count may be lower if a layer has fewer eligible
/// superpixels than its share). `percentile` is in `0.0..=100.0`.
/// `min_connections` gates eligibility on adjacency degree, per the
/// growth step's requirement that a seed already have enough neighbours
/// to be worth growing from. `rng_seed` seeds a deterministic RNG, so the
/// same inputs always produce the same seed set.
///
/// Returns labels in `1..=k_max`, in no particular order.
pub fn select_chord_seeds(
    superpixels: &[Superpixel],
    adjacency: &AdjacencyGraph,
    lz: u32,
    target_count: usize,
    percentile: f32,
    min_connections: usize,
    rng_seed: u64,
) -> Result<Vec<u32>, ScSnicError> {
    if lz == 0 {
        return Err(ScSnicError::SeedError(SeedErrorKind::InvalidFieldIndex));
    }
    let k_max = superpixels.len().saturating_sub(1);
    let per_layer_target = (target_count / NUM_LAYERS as usize).max(1);

    let mut layers: Vec<Vec<u32>> = vec![Vec::new(); NUM_LAYERS as usize];
    for k in 1..=k_max {
        let sp = superpixels[k];
        if sp.n == 0 {
            continue;
        }
        if adjacency.neighbors(k as u32)?.len() < min_connections {
            continue;
        }
        let layer = layer_of(sp.z, lz);
        layers[layer].push(k as u32);
    }

    let mut rng = rand::rngs::StdRng::seed_from_u64(rng_seed);
    let mut seeds = Vec::new();
    seeds.try_reserve(target_count.min(k_max))?;

    for labels in &layers {
        if labels.is_empty() {
            continue;
        }
        let threshold = intensity_percentile(superpixels, labels, percentile);
        let mut eligible: Vec<u32> = labels
            .iter()
            .copied()
            .filter(|&k| superpixels[k as usize].c >= threshold)
            .collect();
        eligible.shuffle(&mut rng);
        eligible.truncate(per_layer_target);
        seeds.extend(eligible);
        if seeds.len() >= target_count {
            break;
        }
    }

    Ok(seeds)
}

fn layer_of(centroid_z: f32, lz: u32) -> usize {
    let layer = ((centroid_z / lz as f32) * NUM_LAYERS as f32) as i64;
    layer.clamp(0, NUM_LAYERS as i64 - 1) as usize
}

/// Value at `percentile` of the mean intensities of the superpixels named
/// by `labels`, using nearest-rank interpolation over a sorted copy.
fn intensity_percentile(superpixels: &[Superpixel], labels: &[u32], percentile: f32) -> f32 {
    let mut values: Vec<f32> = labels.iter().map(|&k| superpixels[k as usize].c).collect();
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    if values.is_empty() {
        return f32::INFINITY;
    }
    let rank = ((percentile.clamp(0.0, 100.0) / 100.0) * (values.len() - 1) as f32).round();
    values[rank as usize]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjacency::build_adjacency;
    use crate::field::ScalarField;
    use crate::snic::snic;

    #[test]
    fn seeds_are_drawn_from_live_superpixels() {
        let mut field = ScalarField::new(16, 16, 16).unwrap();
        for (i, v) in field.as_mut_slice().iter_mut().enumerate() {
            *v = (i % 256) as f32;
        }
        let output = snic(&field, 2, 1.0).unwrap();
        let adjacency = build_adjacency(&field, &output).unwrap();
        let seeds = select_chord_seeds(&output.superpixels, &adjacency, 16, 32, 75.0, 0, 7).unwrap();
        assert!(!seeds.is_empty());
        for &k in &seeds {
            assert!((1..=output.k_max() as u32).contains(&k));
        }
    }

    #[test]
    fn zero_percentile_admits_every_superpixel_in_a_layer() {
        let mut field = ScalarField::new(8, 8, 8).unwrap();
        for v in field.as_mut_slice() {
            *v = 10.0;
        }
        let output = snic(&field, 2, 1.0).unwrap();
        let adjacency = build_adjacency(&field, &output).unwrap();
        let seeds = select_chord_seeds(&output.superpixels, &adjacency, 8, 1000, 0.0, 0, 1).unwrap();
        // Every layer admits all its superpixels at percentile 0, capped
        // only by per-layer target, so raising target_count way past
        // k_max should approach k_max (bounded by per-layer caps).
        assert!(seeds.len() <= output.k_max());
    }

    #[test]
    fn deterministic_for_a_fixed_seed() {
        let mut field = ScalarField::new(16, 16, 16).unwrap();
        for (i, v) in field.as_mut_slice().iter_mut().enumerate() {
            *v = (i % 200) as f32;
        }
        let output = snic(&field, 2, 1.0).unwrap();
        let adjacency = build_adjacency(&field, &output).unwrap();
        let a = select_chord_seeds(&output.superpixels, &adjacency, 16, 40, 75.0, 0, 42).unwrap();
        let b = select_chord_seeds(&output.superpixels, &adjacency, 16, 40, 75.0, 0, 42).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn min_connections_excludes_low_degree_superpixels() {
        let mut field = ScalarField::new(16, 16, 16).unwrap();
        for (i, v) in field.as_mut_slice().iter_mut().enumerate() {
            *v = (i % 256) as f32;
        }
        let output = snic(&field, 2, 1.0).unwrap();
        let adjacency = build_adjacency(&field, &output).unwrap();
        let seeds = select_chord_seeds(&output.superpixels, &adjacency, 16, 40, 0.0, 1000, 3).unwrap();
        assert!(seeds.is_empty());
    }

    #[test]
    fn rejects_zero_lz() {
        let field = ScalarField::new(4, 4, 4).unwrap();
        let output = snic(&field, 2, 1.0).unwrap();
        let adjacency = build_adjacency(&field, &output).unwrap();
        assert!(select_chord_seeds(&output.superpixels, &adjacency, 0, 10, 75.0, 0, 1).is_err());
    }
}
