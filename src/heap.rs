//! Min-priority heap driving the SNIC frontier.
use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::error::ScSnicError;

/// A candidate `(distance, cluster, voxel)` tuple pushed onto the SNIC
/// frontier. Ordered by ascending `d`; ties are broken arbitrarily by
/// insertion order, same as `std::collections::BinaryHeap`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeapNode {
    /// Distance to the claiming cluster, as computed by SNIC's distance
    /// formula.
    pub d: f32,
    /// Cluster that would claim this voxel.
    pub k: u32,
    /// Voxel coordinates.
    pub z: u32,
    pub y: u32,
    pub x: u32,
}

impl Eq for HeapNode {}

impl PartialOrd for HeapNode {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapNode {
    /// Orders by `d` only. `d` must never be `NaN`; SNIC checks this before
    /// pushing, since a `NaN` comparison is a structural-invariant
    /// violation rather than a data-dependent condition to recover from.
    #[inline]
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.d
            .partial_cmp(&other.d)
            .expect("heap node distance must not be NaN")
    }
}

/// Min-priority heap of [`HeapNode`]s, ascending by `d`.
///
/// Built on `std::collections::BinaryHeap<Reverse<HeapNode>>`, the same
/// container a 2-D SNIC max-heap-of-negated-key trick would use,
/// generalized here to the 3-D voxel case via `Reverse` directly instead
/// of negating the key by hand.
#[derive(Debug, Clone)]
pub struct MinHeap {
    inner: BinaryHeap<Reverse<HeapNode>>,
}

impl MinHeap {
    /// Create a heap with at least `capacity` nodes pre-allocated.
    ///
    /// `capacity` should be at least `lz * ly * lx`, the total voxel
    /// count every node will ultimately be pushed for; the heap still
    /// grows past that via `BinaryHeap`'s own doubling, so no upper
    /// bound is enforced here.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: BinaryHeap::with_capacity(capacity),
        }
    }

    /// Push a candidate node.
    #[inline]
    pub fn push(&mut self, node: HeapNode) {
        self.inner.push(Reverse(node));
    }

    /// Pop the node with the smallest `d`.
    ///
    /// # Errors
    /// Returns [`ScSnicError::HeapEmpty`] if the heap has no nodes.
    #[inline]
    pub fn pop(&mut self) -> Result<HeapNode, ScSnicError> {
        self.inner
            .pop()
            .map(|Reverse(n)| n)
            .ok_or(ScSnicError::HeapEmpty)
    }

    /// Number of nodes currently in the heap.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the heap holds no nodes.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(d: f32, k: u32) -> HeapNode {
        HeapNode { d, k, z: 0, y: 0, x: 0 }
    }

    #[test]
    fn pop_from_empty_heap_errors() {
        let mut heap = MinHeap::with_capacity(4);
        assert!(matches!(heap.pop(), Err(ScSnicError::HeapEmpty)));
    }

    #[test]
    fn pops_ascending_by_distance() {
        // Push (d=1,k=1) then (d=0,k=2); first pop must be k=2 despite
        // the later push order.
        let mut heap = MinHeap::with_capacity(4);
        heap.push(node(1.0, 1));
        heap.push(node(0.0, 2));
        assert_eq!(heap.pop().unwrap().k, 2);
        assert_eq!(heap.pop().unwrap().k, 1);
        assert!(heap.is_empty());
    }

    #[test]
    fn len_tracks_pushes_and_pops() {
        let mut heap = MinHeap::with_capacity(4);
        assert_eq!(heap.len(), 0);
        heap.push(node(3.0, 1));
        heap.push(node(2.0, 2));
        assert_eq!(heap.len(), 2);
        let _ = heap.pop().unwrap();
        assert_eq!(heap.len(), 1);
    }
}
