//! Superpixel adjacency graph over a 26-neighbourhood.
//!
//! Distinct from SNIC's own 6-way frontier expansion (see
//! [`crate::snic`]'s module docs): adjacency here is the full cube
//! neighbourhood, since two superpixels sharing only a diagonal boundary
//! voxel pair are still adjacent for chord-growing purposes.

use crate::error::ScSnicError;
use crate::field::ScalarField;
use crate::snic::SnicOutput;

/// Upper bound on distinct 26-neighbourhood adjacents a single superpixel
/// is expected to have. The count pass below falls back to growing past
/// this bound if it is exceeded; it exists only to size the initial
/// per-cluster scan buffer, not to cap correctness.
pub const SUPERPIXEL_MAX_NEIGHS: usize = 56;

/// One edge in the adjacency graph: a neighbouring label and the
/// accumulated boundary strength between the two superpixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjacencyEdge {
    /// The neighbouring superpixel's label.
    pub neighbor: u32,
    /// Sum of `1 - |I(v) - I(v')| / 255` over every shared 26-neighbour
    /// boundary voxel pair between the two superpixels.
    pub strength: f32,
}

/// Adjacency graph, 1-indexed parallel to a [`SnicOutput`]'s superpixels:
/// `edges[k]` lists `k`'s neighbours for `k in 1..=k_max`; index `0` is
/// vacant.
#[derive(Debug, Clone)]
pub struct AdjacencyGraph {
    edges: Vec<Vec<AdjacencyEdge>>,
}

impl AdjacencyGraph {
    /// Neighbours of superpixel `k`, or an error if `k` is `0` or exceeds
    /// the live superpixel range.
    pub fn neighbors(&self, k: u32) -> Result<&[AdjacencyEdge], ScSnicError> {
        self.edges
            .get(k as usize)
            .filter(|_| k != 0)
            .map(Vec::as_slice)
            .ok_or(ScSnicError::InvalidSuperpixel)
    }

    /// Number of live superpixels, not counting the vacant index `0`.
    #[must_use]
    pub fn k_max(&self) -> usize {
        self.edges.len().saturating_sub(1)
    }
}

/// Build the adjacency graph for a completed SNIC run over `field`.
///
/// Two passes over every voxel's forward 26-neighbourhood (each unordered
/// pair visited once): first counts distinct neighbours per cluster to
/// size each row, then accumulates boundary strength.
pub fn build_adjacency(
    field: &ScalarField,
    output: &SnicOutput,
) -> Result<AdjacencyGraph, ScSnicError> {
    let k_max = output.k_max();
    let (lz, ly, lx) = field.dims();

    // Forward half of the 26-neighbourhood: each unordered voxel pair is
    // visited from exactly one of its two members.
    let offsets: Vec<(i64, i64, i64)> = {
        let mut v = Vec::new();
        for dz in -1..=1 {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    if (dz, dy, dx) == (0, 0, 0) {
                        continue;
                    }
                    if dz > 0 || (dz == 0 && dy > 0) || (dz == 0 && dy == 0 && dx > 0) {
                        v.push((dz, dy, dx));
                    }
                }
            }
        }
        v
    };

    let mut seen: Vec<Vec<u32>> = Vec::new();
    seen.try_reserve_exact(k_max + 1)?;
    seen.extend((0..=k_max).map(|_| Vec::with_capacity(0)));

    for z in 0..lz {
        for y in 0..ly {
            for x in 0..lx {
                let i = field.linear_index(z, y, x);
                let label = output.labels[i];
                if label == 0 {
                    continue;
                }
                for &(dz, dy, dx) in &offsets {
                    let zz = z as i64 + dz;
                    let yy = y as i64 + dy;
                    let xx = x as i64 + dx;
                    if !field.in_bounds(zz, yy, xx) {
                        continue;
                    }
                    let j = field.linear_index(zz as u32, yy as u32, xx as u32);
                    let other = output.labels[j];
                    if other == 0 || other == label {
                        continue;
                    }
                    record_seen(&mut seen[label as usize], other);
                    record_seen(&mut seen[other as usize], label);
                }
            }
        }
    }

    let mut edges: Vec<Vec<AdjacencyEdge>> = Vec::new();
    edges.try_reserve_exact(k_max + 1)?;
    for neighbors in &seen {
        let mut row = Vec::new();
        row.try_reserve_exact(neighbors.len())?;
        row.extend(neighbors.iter().map(|&neighbor| AdjacencyEdge {
            neighbor,
            strength: 0.0,
        }));
        edges.push(row);
    }

    for z in 0..lz {
        for y in 0..ly {
            for x in 0..lx {
                let i = field.linear_index(z, y, x);
                let label = output.labels[i];
                if label == 0 {
                    continue;
                }
                let intensity_a = field.get_unchecked(z, y, x);
                for &(dz, dy, dx) in &offsets {
                    let zz = z as i64 + dz;
                    let yy = y as i64 + dy;
                    let xx = x as i64 + dx;
                    if !field.in_bounds(zz, yy, xx) {
                        continue;
                    }
                    let (uz, uy, ux) = (zz as u32, yy as u32, xx as u32);
                    let j = field.linear_index(uz, uy, ux);
                    let other = output.labels[j];
                    if other == 0 || other == label {
                        continue;
                    }
                    let intensity_b = field.get_unchecked(uz, uy, ux);
                    let contribution = 1.0 - (intensity_a - intensity_b).abs() / 255.0;
                    add_strength(&mut edges[label as usize], other, contribution);
                    add_strength(&mut edges[other as usize], label, contribution);
                }
            }
        }
    }

    Ok(AdjacencyGraph { edges })
}

fn record_seen(row: &mut Vec<u32>, label: u32) {
    if !row.contains(&label) {
        if row.is_empty() {
            row.reserve(SUPERPIXEL_MAX_NEIGHS);
        }
        row.push(label);
    }
}

fn add_strength(row: &mut [AdjacencyEdge], neighbor: u32, amount: f32) {
    if let Some(edge) = row.iter_mut().find(|e| e.neighbor == neighbor) {
        edge.strength += amount;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snic::snic;

    #[test]
    fn adjacency_is_symmetric() {
        let mut field = ScalarField::new(8, 8, 8).unwrap();
        for (i, v) in field.as_mut_slice().iter_mut().enumerate() {
            *v = (i % 17) as f32 * 5.0;
        }
        let output = snic(&field, 2, 1.0).unwrap();
        let graph = build_adjacency(&field, &output).unwrap();

        for k in 1..=graph.k_max() as u32 {
            for edge in graph.neighbors(k).unwrap() {
                let back = graph.neighbors(edge.neighbor).unwrap();
                let reciprocal = back.iter().find(|e| e.neighbor == k);
                assert!(reciprocal.is_some(), "missing reciprocal edge for {k}");
                assert!((reciprocal.unwrap().strength - edge.strength).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn no_self_loops() {
        let field = ScalarField::new(8, 8, 8).unwrap();
        let output = snic(&field, 2, 1.0).unwrap();
        let graph = build_adjacency(&field, &output).unwrap();
        for k in 1..=graph.k_max() as u32 {
            assert!(graph.neighbors(k).unwrap().iter().all(|e| e.neighbor != k));
        }
    }

    #[test]
    fn invalid_label_errors() {
        let field = ScalarField::new(4, 4, 4).unwrap();
        let output = snic(&field, 2, 1.0).unwrap();
        let graph = build_adjacency(&field, &output).unwrap();
        assert!(graph.neighbors(0).is_err());
        assert!(graph.neighbors(u32::MAX).is_err());
    }
}
