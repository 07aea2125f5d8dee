//! Pure preprocessing hooks over [`ScalarField`]s, feeding the core
//! clustering/chord pipeline. Grounded in `preprocess.h` (denoise, flood
//! fill) and `volcano.h`'s pooling/histogram sections.
//!
//! These are intentionally narrow: general image-processing utilities
//! are out of scope, only the named hooks below are implemented.

use crate::error::ScSnicError;
use crate::field::ScalarField;
use std::collections::VecDeque;

const NEIGHBORS_6: [[i32; 3]; 6] = [
    [-1, 0, 0],
    [1, 0, 0],
    [0, -1, 0],
    [0, 1, 0],
    [0, 0, -1],
    [0, 0, 1],
];

/// Box-filter denoise over a `kernel`-sized (odd, centered) window,
/// grounded in `vs_avgpool_denoise`.
pub fn avgpool_denoise(field: &ScalarField, kernel: u32) -> Result<ScalarField, ScSnicError> {
    if kernel == 0 {
        return Err(ScSnicError::General("kernel size cannot be 0"));
    }
    let (lz, ly, lx) = field.dims();
    let half = (kernel / 2) as i64;
    let mut out = ScalarField::new(lz, ly, lx)?;

    for z in 0..lz as i64 {
        for y in 0..ly as i64 {
            for x in 0..lx as i64 {
                let mut sum = 0.0f32;
                let mut count = 0u32;
                for zi in -half..=half {
                    for yi in -half..=half {
                        for xi in -half..=half {
                            let (nz, ny, nx) = (z + zi, y + yi, x + xi);
                            if nz < 0
                                || ny < 0
                                || nx < 0
                                || nz >= lz as i64
                                || ny >= ly as i64
                                || nx >= lx as i64
                            {
                                continue;
                            }
                            sum += field
                                .get(nz, ny, nx)
                                .ok_or(ScSnicError::InputOutOfBounds)?;
                            count += 1;
                        }
                    }
                }
                let avg = if count > 0 { sum / count as f32 } else { 0.0 };
                out.set(z, y, x, avg)?;
            }
        }
    }
    Ok(out)
}

/// Flood-fill-gated cleanup: voxels at or above `start_threshold` seed a
/// fill that spreads through 6-connected neighbors at or above `iso`;
/// everything the fill never reaches is zeroed. Grounded in
/// `flood_fill_f32`/`segment_and_clean_f32`.
pub fn segment_and_clean(
    field: &ScalarField,
    iso: f32,
    start_threshold: f32,
) -> Result<ScalarField, ScSnicError> {
    let (lz, ly, lx) = field.dims();
    let mut visited = vec![false; field.len()];
    let mut queue: VecDeque<(u32, u32, u32)> = VecDeque::new();

    for z in 0..lz {
        for y in 0..ly {
            for x in 0..lx {
                let idx = field.linear_index(z, y, x);
                if field.as_slice()[idx] >= start_threshold {
                    visited[idx] = true;
                    queue.push_back((z, y, x));
                }
            }
        }
    }

    let mut mask = vec![false; field.len()];
    for &(z, y, x) in &queue {
        let idx = field.linear_index(z, y, x);
        mask[idx] = true;
    }

    while let Some((z, y, x)) = queue.pop_front() {
        for offset in NEIGHBORS_6 {
            let nz = z as i64 + offset[0] as i64;
            let ny = y as i64 + offset[1] as i64;
            let nx = x as i64 + offset[2] as i64;
            if nz < 0 || ny < 0 || nx < 0 || nz >= lz as i64 || ny >= ly as i64 || nx >= lx as i64
            {
                continue;
            }
            let (nz, ny, nx) = (nz as u32, ny as u32, nx as u32);
            let idx = field.linear_index(nz, ny, nx);
            if visited[idx] || field.as_slice()[idx] < iso {
                continue;
            }
            visited[idx] = true;
            mask[idx] = true;
            queue.push_back((nz, ny, nx));
        }
    }

    let data: Vec<f32> = field
        .as_slice()
        .iter()
        .zip(mask.iter())
        .map(|(&v, &m)| if m { v } else { 0.0 })
        .collect();
    ScalarField::from_vec(lz, ly, lx, data)
}

/// Pooling reduction kind for [`pool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolKind {
    /// Window mean.
    Avg,
    /// Window maximum.
    Max,
    /// Window sum.
    Sum,
}

/// Downsample `field` by striding a `kernel`-sized window with the given
/// `stride`, reducing each window per `kind`. Grounded in `volcano.h`'s
/// `avgpool`/commented-out `maxpool`, generalized to a single function.
pub fn pool(
    field: &ScalarField,
    kernel: u32,
    stride: u32,
    kind: PoolKind,
) -> Result<ScalarField, ScSnicError> {
    if kernel == 0 || stride == 0 {
        return Err(ScSnicError::General("kernel and stride must be non-zero"));
    }
    let (lz, ly, lx) = field.dims();
    let out_lz = (lz + stride - 1) / stride;
    let out_ly = (ly + stride - 1) / stride;
    let out_lx = (lx + stride - 1) / stride;
    let mut out = ScalarField::new(out_lz, out_ly, out_lx)?;

    for z in 0..out_lz {
        for y in 0..out_ly {
            for x in 0..out_lx {
                let mut values: Vec<f32> = Vec::with_capacity((kernel * kernel * kernel) as usize);
                for zi in 0..kernel {
                    for yi in 0..kernel {
                        for xi in 0..kernel {
                            let nz = z * stride + zi;
                            let ny = y * stride + yi;
                            let nx = x * stride + xi;
                            if nz >= lz || ny >= ly || nx >= lx {
                                continue;
                            }
                            values.push(field.get(nz as i64, ny as i64, nx as i64).unwrap());
                        }
                    }
                }
                let reduced = match kind {
                    PoolKind::Avg => {
                        if values.is_empty() {
                            0.0
                        } else {
                            values.iter().sum::<f32>() / values.len() as f32
                        }
                    }
                    PoolKind::Max => values.iter().cloned().fold(f32::NEG_INFINITY, f32::max),
                    PoolKind::Sum => values.iter().sum(),
                };
                out.set(z as i64, y as i64, x as i64, reduced)?;
            }
        }
    }
    Ok(out)
}

/// Rescale `field`'s values into `0.0..=1.0` by its observed min/max.
/// A constant field maps to all zeros.
pub fn normalize(field: &ScalarField) -> Result<ScalarField, ScSnicError> {
    let (lz, ly, lx) = field.dims();
    let min = field.as_slice().iter().cloned().fold(f32::INFINITY, f32::min);
    let max = field.as_slice().iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;
    let data: Vec<f32> = if range <= 0.0 {
        vec![0.0; field.len()]
    } else {
        field.as_slice().iter().map(|&v| (v - min) / range).collect()
    };
    ScalarField::from_vec(lz, ly, lx, data)
}

/// Histogram equalization into `num_bins` buckets, grounded in
/// `histogram_new`/`chunk_histogram`/`get_bin_index`. Output values are
/// remapped to `0.0..=1.0` by cumulative bin frequency.
pub fn equalize_histogram(field: &ScalarField, num_bins: usize) -> Result<ScalarField, ScSnicError> {
    if num_bins == 0 {
        return Err(ScSnicError::General("num_bins cannot be 0"));
    }
    let (lz, ly, lx) = field.dims();
    let min = field.as_slice().iter().cloned().fold(f32::INFINITY, f32::min);
    let max = field.as_slice().iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    if max <= min {
        return ScalarField::from_vec(lz, ly, lx, vec![0.0; field.len()]);
    }
    let bin_width = (max - min) / num_bins as f32;

    let bin_of = |v: f32| -> usize {
        if v <= min {
            0
        } else if v >= max {
            num_bins - 1
        } else {
            (((v - min) / bin_width) as usize).min(num_bins - 1)
        }
    };

    let mut counts = vec![0u64; num_bins];
    for &v in field.as_slice() {
        counts[bin_of(v)] += 1;
    }
    let total: u64 = counts.iter().sum();

    let mut cumulative = vec![0u64; num_bins];
    let mut running = 0u64;
    for (slot, &count) in cumulative.iter_mut().zip(counts.iter()) {
        running += count;
        *slot = running;
    }

    let data: Vec<f32> = field
        .as_slice()
        .iter()
        .map(|&v| cumulative[bin_of(v)] as f32 / total as f32)
        .collect();
    ScalarField::from_vec(lz, ly, lx, data)
}

/// Permute axes by letter string, e.g. `transpose(field, "zyx", "zxy")`
/// swaps the `y` and `x` axes. Grounded in `volcano.c`'s `vs_transpose`.
pub fn transpose(field: &ScalarField, from_axes: &str, to_axes: &str) -> Result<ScalarField, ScSnicError> {
    let from: Vec<char> = from_axes.chars().collect();
    let to: Vec<char> = to_axes.chars().collect();
    if from.len() != 3 || to.len() != 3 || !["z", "y", "x"].iter().all(|a| from.contains(&a.chars().next().unwrap())) {
        return Err(ScSnicError::Format("axis strings must be a permutation of z, y, x".into()));
    }
    let (lz, ly, lx) = field.dims();
    let dims = [lz, ly, lx];
    let axis_index = |c: char| from.iter().position(|&f| f == c).unwrap();
    let perm: Vec<usize> = to.iter().map(|&c| axis_index(c)).collect();

    let out_dims = [dims[perm[0]], dims[perm[1]], dims[perm[2]]];
    let mut out = ScalarField::new(out_dims[0], out_dims[1], out_dims[2])?;

    for z in 0..lz {
        for y in 0..ly {
            for x in 0..lx {
                let coords = [z, y, x];
                let out_coords = [coords[perm[0]], coords[perm[1]], coords[perm[2]]];
                let value = field.get(z as i64, y as i64, x as i64).unwrap();
                out.set(
                    out_coords[0] as i64,
                    out_coords[1] as i64,
                    out_coords[2] as i64,
                    value,
                )?;
            }
        }
    }
    Ok(out)
}

/// Binary dilation of a `0.0`/non-zero mask field by `radius` steps of
/// 6-connected growth. Grounded in `volcano.c`'s `vs_dilate`, used there
/// to grow the fiber mask before chord-to-fiber attribution.
pub fn dilate(mask_field: &ScalarField, radius: u32) -> Result<ScalarField, ScSnicError> {
    let (lz, ly, lx) = mask_field.dims();
    let mut current: Vec<bool> = mask_field.as_slice().iter().map(|&v| v != 0.0).collect();

    for _ in 0..radius {
        let mut next = current.clone();
        for z in 0..lz {
            for y in 0..ly {
                for x in 0..lx {
                    let idx = mask_field.linear_index(z, y, x);
                    if current[idx] {
                        continue;
                    }
                    for offset in NEIGHBORS_6 {
                        let nz = z as i64 + offset[0] as i64;
                        let ny = y as i64 + offset[1] as i64;
                        let nx = x as i64 + offset[2] as i64;
                        if nz < 0 || ny < 0 || nx < 0 || nz >= lz as i64 || ny >= ly as i64 || nx >= lx as i64 {
                            continue;
                        }
                        let nidx = mask_field.linear_index(nz as u32, ny as u32, nx as u32);
                        if current[nidx] {
                            next[idx] = true;
                            break;
                        }
                    }
                }
            }
        }
        current = next;
    }

    let data: Vec<f32> = current.into_iter().map(|b| if b { 1.0 } else { 0.0 }).collect();
    ScalarField::from_vec(lz, ly, lx, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(lz: u32, ly: u32, lx: u32) -> ScalarField {
        let mut field = ScalarField::new(lz, ly, lx).unwrap();
        for (i, v) in field.as_mut_slice().iter_mut().enumerate() {
            *v = i as f32;
        }
        field
    }

    #[test]
    fn avgpool_denoise_preserves_a_uniform_field() {
        let mut field = ScalarField::new(4, 4, 4).unwrap();
        field.as_mut_slice().fill(5.0);
        let out = avgpool_denoise(&field, 3).unwrap();
        assert!(out.as_slice().iter().all(|&v| (v - 5.0).abs() < 1e-5));
    }

    #[test]
    fn segment_and_clean_drops_regions_the_fill_never_reaches() {
        let mut field = ScalarField::new(1, 1, 4).unwrap();
        field.as_mut_slice().copy_from_slice(&[10.0, 10.0, 0.0, 10.0]);
        let out = segment_and_clean(&field, 5.0, 5.0).unwrap();
        assert_eq!(out.as_slice(), &[10.0, 10.0, 0.0, 0.0]);
    }

    #[test]
    fn pool_avg_and_max_agree_on_a_uniform_field() {
        let mut field = ScalarField::new(4, 4, 4).unwrap();
        field.as_mut_slice().fill(3.0);
        let avg = pool(&field, 2, 2, PoolKind::Avg).unwrap();
        let max = pool(&field, 2, 2, PoolKind::Max).unwrap();
        assert_eq!(avg.dims(), (2, 2, 2));
        assert!(avg.as_slice().iter().all(|&v| v == 3.0));
        assert!(max.as_slice().iter().all(|&v| v == 3.0));
    }

    #[test]
    fn normalize_maps_min_and_max_to_0_and_1() {
        let field = ramp(1, 1, 4);
        let out = normalize(&field).unwrap();
        assert_eq!(out.as_slice()[0], 0.0);
        assert_eq!(out.as_slice()[3], 1.0);
    }

    #[test]
    fn equalize_histogram_is_monotone_in_input_order() {
        let field = ramp(1, 1, 8);
        let out = equalize_histogram(&field, 4).unwrap();
        for pair in out.as_slice().windows(2) {
            assert!(pair[1] >= pair[0]);
        }
    }

    #[test]
    fn transpose_swaps_y_and_x() {
        let mut field = ScalarField::new(1, 2, 3).unwrap();
        for (i, v) in field.as_mut_slice().iter_mut().enumerate() {
            *v = i as f32;
        }
        let out = transpose(&field, "zyx", "zxy").unwrap();
        assert_eq!(out.dims(), (1, 3, 2));
        assert_eq!(out.get(0, 1, 0).unwrap(), field.get(0, 0, 1).unwrap());
    }

    #[test]
    fn dilate_by_one_grows_a_single_voxel_to_its_6_neighbors() {
        let mut mask = ScalarField::new(3, 3, 3).unwrap();
        mask.set(1, 1, 1, 1.0).unwrap();
        let out = dilate(&mask, 1).unwrap();
        assert_eq!(out.get(1, 1, 0).unwrap(), 1.0);
        assert_eq!(out.get(0, 0, 0).unwrap(), 0.0);
    }
}
