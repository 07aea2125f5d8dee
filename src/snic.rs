//! Simple non-iterative clustering (SNIC) over a dense 3-D scalar field.
//!
//! Label convention: `0` means "unassigned"; live labels are `1..=k_max`.
//! The superpixel array is sized `k_max + 1` and index `0` stays vacant,
//! since labels start at `1`. This "0-based with a zero sentinel"
//! convention keeps `k as usize` a valid, non-offset index into both
//! `labels` and `superpixels` everywhere, at the cost of one unused
//! array slot.
//!
//! Indexing of the field and of `labels` is `z * ly * lx + y * lx + x`
//! (z-major, then y, then x) throughout, consistently, with no
//! alternative ordering used anywhere else in this crate.

use crate::error::ScSnicError;
use crate::field::ScalarField;
use crate::heap::{HeapNode, MinHeap};

/// Accumulator/centroid record for one SNIC cluster.
///
/// During growth, `c`, `z`, `y`, `x` are running sums weighted by `n`;
/// [`snic`] finalizes them into means by dividing by `n` before returning.
#[derive(Debug, Clone, Copy, Default)]
pub struct Superpixel {
    /// Mean intensity after finalization (sum of intensity during growth).
    pub c: f32,
    /// Centroid z (sum of z during growth).
    pub z: f32,
    /// Centroid y (sum of y during growth).
    pub y: f32,
    /// Centroid x (sum of x during growth).
    pub x: f32,
    /// Number of voxels claimed by this cluster.
    pub n: u32,
}

/// Output of a SNIC run: one label per voxel, and one accumulator per
/// cluster (index `0` vacant, as documented on the module).
#[derive(Debug, Clone)]
pub struct SnicOutput {
    /// `labels[idx(z, y, x)]` is the cluster id of voxel `(z, y, x)`, or `0`
    /// if unassigned. SNIC's own loop guard makes `0` unreachable on a
    /// successful return; it appears here for the benefit of callers that
    /// inspect intermediate state.
    pub labels: Vec<u32>,
    /// `superpixels[k]` for `k in 1..=k_max`; index `0` is vacant.
    pub superpixels: Vec<Superpixel>,
}

impl SnicOutput {
    /// Number of live superpixels, not counting the vacant index `0`.
    #[must_use]
    pub fn k_max(&self) -> usize {
        self.superpixels.len().saturating_sub(1)
    }

    /// Filtering pass: drop clusters whose `n < n_min` or
    /// whose mean intensity `c < c_min`, compacting the superpixel array
    /// and remapping labels so every remaining label still indexes a live
    /// superpixel.
    ///
    /// Returns the number of surviving superpixels.
    pub fn filter(&mut self, n_min: u32, c_min: f32) -> usize {
        let k_max = self.k_max();
        let mut label_map = vec![0u32; k_max + 1];
        let mut new_count = 0u32;

        for k in 1..=k_max {
            let sp = self.superpixels[k];
            if sp.n >= n_min && sp.c >= c_min {
                new_count += 1;
                label_map[k] = new_count;
                if new_count as usize != k {
                    self.superpixels[new_count as usize] = sp;
                }
            }
        }
        for k in (new_count as usize + 1)..=k_max {
            self.superpixels[k] = Superpixel::default();
        }
        self.superpixels.truncate(new_count as usize + 1);

        for label in &mut self.labels {
            if *label != 0 {
                *label = label_map[*label as usize];
            }
        }

        new_count as usize
    }
}

/// Number of seed clusters for a field with seed stride `d_seed`.
#[must_use]
pub fn seed_count(lz: u32, ly: u32, lx: u32, d_seed: u32) -> usize {
    let n = |l: u32| l.div_ceil(d_seed).max(1) as usize;
    n(lz) * n(ly) * n(lx)
}

/// Run SNIC over `field`.
///
/// `d_seed` is the seed lattice stride (default `2`); `m` is the
/// compactness weight trading positional against intensity distance.
/// `d_seed` must not be `0`.
///
/// ## Reference
/// Achanta, R., & Süsstrunk, S. *Superpixels and polygons using simple
/// non-iterative clustering.* CVPR 2017. Ported here from a 3-D
/// single-channel C implementation rather than the 2-D `Lab`-space
/// original the SNIC paper describes.
///
/// ```
/// use scroll_snic::field::ScalarField;
/// use scroll_snic::snic::snic;
///
/// let field = ScalarField::new(8, 8, 8)?;
/// let output = snic(&field, 2, 1.0)?;
/// assert_eq!(output.k_max(), 4 * 4 * 4);
/// # Ok::<(), scroll_snic::error::ScSnicError>(())
/// ```
pub fn snic(field: &ScalarField, d_seed: u32, m: f32) -> Result<SnicOutput, ScSnicError> {
    if d_seed == 0 {
        return Err(ScSnicError::ZeroSeedStride);
    }
    let (lz, ly, lx) = field.dims();
    let img_size = field.len();
    let k_max = seed_count(lz, ly, lx, d_seed);

    let invwt = (m * m * k_max as f32) / img_size as f32;

    let mut labels = Vec::new();
    labels.try_reserve_exact(img_size)?;
    labels.extend(std::iter::repeat(0u32).take(img_size));

    let mut superpixels = Vec::new();
    superpixels.try_reserve_exact(k_max + 1)?;
    superpixels.extend(std::iter::repeat(Superpixel::default()).take(k_max + 1));

    let mut heap = MinHeap::with_capacity(img_size);
    let mut k = 0u32;
    let mut z = 0;
    while z < lz {
        let mut y = 0;
        while y < ly {
            let mut x = 0;
            while x < lx {
                k += 1;
                heap.push(HeapNode { d: 0.0, k, z, y, x });
                x += d_seed;
            }
            y += d_seed;
        }
        z += d_seed;
    }

    // 6-way axis-aligned connectivity for SNIC's frontier expansion, as
    // distinct from the 26-neighbourhood used by the adjacency builder;
    // both are intentional, not an oversight.
    const NEIGHBORS: [(i64, i64, i64); 6] = [
        (1, 0, 0),
        (-1, 0, 0),
        (0, 1, 0),
        (0, -1, 0),
        (0, 0, 1),
        (0, 0, -1),
    ];

    while !heap.is_empty() {
        let node = heap.pop()?;
        let i = field.linear_index(node.z, node.y, node.x);
        if labels[i] != 0 {
            continue;
        }

        labels[i] = node.k;
        let sp = &mut superpixels[node.k as usize];
        sp.c += field.get_unchecked(node.z, node.y, node.x);
        sp.z += node.z as f32;
        sp.y += node.y as f32;
        sp.x += node.x as f32;
        sp.n += 1;
        let sp = *sp;
        let ksize = sp.n as f32;

        for &(dz, dy, dx) in &NEIGHBORS {
            let zz = node.z as i64 + dz;
            let yy = node.y as i64 + dy;
            let xx = node.x as i64 + dx;
            if !field.in_bounds(zz, yy, xx) {
                continue;
            }
            let (zz, yy, xx) = (zz as u32, yy as u32, xx as u32);
            let ii = field.linear_index(zz, yy, xx);
            if labels[ii] != 0 {
                continue;
            }

            let intensity = field.get_unchecked(zz, yy, xx);
            let dc = (255.0 * (sp.c - intensity * ksize)).powi(2);
            let dz = sp.z - zz as f32 * ksize;
            let dy = sp.y - yy as f32 * ksize;
            let dx = sp.x - xx as f32 * ksize;
            let dpos = dz * dz + dy * dy + dx * dx;
            let d = (dc + dpos * invwt) / (ksize * ksize);

            if d.is_nan() {
                return Err(ScSnicError::NanDistance);
            }

            heap.push(HeapNode {
                d,
                k: node.k,
                z: zz,
                y: yy,
                x: xx,
            });
        }
    }

    for sp in superpixels.iter_mut().skip(1) {
        if sp.n == 0 {
            continue;
        }
        let ksize = sp.n as f32;
        sp.c /= ksize;
        sp.z /= ksize;
        sp.y /= ksize;
        sp.x /= ksize;
    }

    Ok(SnicOutput { labels, superpixels })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_count_matches_the_seeding_loop_on_indivisible_dimensions() {
        // lz=9, d_seed=2: the seeding loop visits z=0,2,4,6,8 (5 positions),
        // not floor(9/2)=4.
        assert_eq!(seed_count(9, 9, 9, 2), 5 * 5 * 5);
    }

    #[test]
    fn indivisible_dimensions_do_not_overrun_the_superpixel_array() {
        let field = ScalarField::new(9, 9, 9).unwrap();
        let out = snic(&field, 2, 1.0).unwrap();
        assert_eq!(out.k_max(), 5 * 5 * 5);
        assert!(out.labels.iter().all(|&l| l != 0 && l as usize <= out.k_max()));
    }

    #[test]
    fn every_voxel_is_labelled_exactly_once() {
        let field = ScalarField::new(8, 8, 8).unwrap();
        let out = snic(&field, 2, 1.0).unwrap();
        assert!(out.labels.iter().all(|&l| l != 0));

        let mut counts = vec![0u32; out.k_max() + 1];
        for &l in &out.labels {
            counts[l as usize] += 1;
        }
        for k in 1..=out.k_max() {
            assert_eq!(counts[k], out.superpixels[k].n);
        }
    }

    #[test]
    fn uniform_field_claims_local_cubes() {
        // L=16, field constant=100, d_seed=2, m=1: every seed claims its
        // local 2x2x2 neighbourhood (n=8).
        let mut field = ScalarField::new(16, 16, 16).unwrap();
        for v in field.as_mut_slice() {
            *v = 100.0;
        }
        let out = snic(&field, 2, 1.0).unwrap();
        assert_eq!(out.k_max(), 8 * 8 * 8);
        for k in 1..=out.k_max() {
            assert_eq!(out.superpixels[k].n, 8);
        }
    }

    #[test]
    fn centroid_lies_within_bounding_box_of_its_voxels() {
        let mut field = ScalarField::new(8, 8, 8).unwrap();
        for (i, v) in field.as_mut_slice().iter_mut().enumerate() {
            *v = (i % 7) as f32 * 10.0;
        }
        let out = snic(&field, 2, 1.0).unwrap();
        let (lz, ly, lx) = field.dims();
        for k in 1..=out.k_max() {
            let mut min = [u32::MAX; 3];
            let mut max = [0u32; 3];
            let mut any = false;
            for z in 0..lz {
                for y in 0..ly {
                    for x in 0..lx {
                        if out.labels[field.linear_index(z, y, x)] == k as u32 {
                            any = true;
                            min = [min[0].min(z), min[1].min(y), min[2].min(x)];
                            max = [max[0].max(z), max[1].max(y), max[2].max(x)];
                        }
                    }
                }
            }
            if !any {
                continue;
            }
            let sp = out.superpixels[k];
            assert!(sp.z >= min[0] as f32 - 1e-3 && sp.z <= max[0] as f32 + 1e-3);
            assert!(sp.y >= min[1] as f32 - 1e-3 && sp.y <= max[1] as f32 + 1e-3);
            assert!(sp.x >= min[2] as f32 - 1e-3 && sp.x <= max[2] as f32 + 1e-3);
        }
    }

    #[test]
    fn filter_with_n_min_zero_keeps_all_clusters() {
        let field = ScalarField::new(8, 8, 8).unwrap();
        let mut out = snic(&field, 2, 1.0).unwrap();
        let k_max = out.k_max();
        let kept = out.filter(0, 0.0);
        assert_eq!(kept, k_max);
    }

    #[test]
    fn filter_on_all_zero_field_drops_everything() {
        let field = ScalarField::new(8, 8, 8).unwrap();
        let mut out = snic(&field, 2, 1.0).unwrap();
        // Every cluster has c == 0.0 on an all-zero field, so a positive
        // c_min filters all of them.
        let kept = out.filter(1, 1.0);
        assert_eq!(kept, 0);
        assert!(out.labels.iter().all(|&l| l == 0));
    }
}
