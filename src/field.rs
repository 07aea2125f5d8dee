//! Dense 3-D scalar field, the read-only input to SNIC clustering.
use crate::error::ScSnicError;

/// A dense cube (or box) of single-precision intensities.
///
/// Indexing follows the chunk-accessor convention recommended for this
/// crate: `idx(z, y, x) = z * ly * lx + y * lx + x`, i.e. `z`-major, then
/// `y`, then `x` in natural reading order. This is the one indexing scheme
/// used throughout the crate; see the module docs on [`crate::snic`] for
/// why the alternative `z*ly*lx + x*ly + y` ordering found in some
/// reference implementations is rejected.
#[derive(Debug, Clone)]
pub struct ScalarField {
    data: Vec<f32>,
    lz: u32,
    ly: u32,
    lx: u32,
}

impl ScalarField {
    /// Create a field of the given dimensions, filled with `0.0`.
    ///
    /// `lz`, `ly`, and `lx` must not be `0`.
    pub fn new(lz: u32, ly: u32, lx: u32) -> Result<Self, ScSnicError> {
        if lz == 0 || ly == 0 || lx == 0 {
            return Err(ScSnicError::InvalidFieldDimension);
        }
        let len = field_len(lz, ly, lx)?;
        let mut data = Vec::new();
        data.try_reserve_exact(len)?;
        data.extend(std::iter::repeat(0.0f32).take(len));
        Ok(Self { data, lz, ly, lx })
    }

    /// Build a field from an existing buffer, validating its length against
    /// the claimed dimensions.
    pub fn from_vec(lz: u32, ly: u32, lx: u32, data: Vec<f32>) -> Result<Self, ScSnicError> {
        if lz == 0 || ly == 0 || lx == 0 {
            return Err(ScSnicError::InvalidFieldDimension);
        }
        let len = field_len(lz, ly, lx)?;
        if data.len() != len {
            return Err(ScSnicError::MismatchedFieldBuffer);
        }
        Ok(Self { data, lz, ly, lx })
    }

    /// Dimensions as `(lz, ly, lx)`.
    #[inline]
    #[must_use]
    pub fn dims(&self) -> (u32, u32, u32) {
        (self.lz, self.ly, self.lx)
    }

    /// Total number of voxels.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the field holds no voxels. Never true for a validly
    /// constructed field, since dimensions of `0` are rejected at
    /// construction.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw backing buffer.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Raw backing buffer, mutable.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Linear index of `(z, y, x)`, without bounds checking.
    #[inline]
    #[must_use]
    pub fn linear_index(&self, z: u32, y: u32, x: u32) -> usize {
        (z as usize) * (self.ly as usize) * (self.lx as usize)
            + (y as usize) * (self.lx as usize)
            + (x as usize)
    }

    /// Whether `(z, y, x)` lies within the field.
    #[inline]
    #[must_use]
    pub fn in_bounds(&self, z: i64, y: i64, x: i64) -> bool {
        (0..self.lz as i64).contains(&z)
            && (0..self.ly as i64).contains(&y)
            && (0..self.lx as i64).contains(&x)
    }

    /// Bounds-checked read.
    #[inline]
    #[must_use]
    pub fn get(&self, z: i64, y: i64, x: i64) -> Option<f32> {
        if self.in_bounds(z, y, x) {
            Some(self.data[self.linear_index(z as u32, y as u32, x as u32)])
        } else {
            None
        }
    }

    /// Unchecked read, for hot loops that have already validated bounds.
    #[inline]
    #[must_use]
    pub fn get_unchecked(&self, z: u32, y: u32, x: u32) -> f32 {
        self.data[self.linear_index(z, y, x)]
    }

    /// Bounds-checked write.
    #[inline]
    pub fn set(&mut self, z: i64, y: i64, x: i64, value: f32) -> Result<(), ScSnicError> {
        if !self.in_bounds(z, y, x) {
            return Err(ScSnicError::InputOutOfBounds);
        }
        let i = self.linear_index(z as u32, y as u32, x as u32);
        self.data[i] = value;
        Ok(())
    }

    /// Maximum value in the field; `f32::NEG_INFINITY` if empty (never the
    /// case for a validly constructed field).
    #[must_use]
    pub fn max(&self) -> f32 {
        self.data.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }
}

fn field_len(lz: u32, ly: u32, lx: u32) -> Result<usize, ScSnicError> {
    (lz as usize)
        .checked_mul(ly as usize)
        .and_then(|v| v.checked_mul(lx as usize))
        .ok_or(ScSnicError::InvalidFieldDimension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_dimension() {
        assert!(matches!(
            ScalarField::new(0, 4, 4),
            Err(ScSnicError::InvalidFieldDimension)
        ));
    }

    #[test]
    fn rejects_mismatched_buffer() {
        let data = vec![0.0f32; 10];
        assert!(matches!(
            ScalarField::from_vec(2, 2, 2, data),
            Err(ScSnicError::MismatchedFieldBuffer)
        ));
    }

    #[test]
    fn index_is_z_major_then_y_then_x() {
        let field = ScalarField::new(2, 3, 4).unwrap();
        // z-major, then y, then x: (0,0,1) is adjacent to (0,0,0).
        assert_eq!(field.linear_index(0, 0, 0), 0);
        assert_eq!(field.linear_index(0, 0, 1), 1);
        assert_eq!(field.linear_index(0, 1, 0), 4);
        assert_eq!(field.linear_index(1, 0, 0), 12);
    }

    #[test]
    fn bounds_checked_read_write_roundtrip() {
        let mut field = ScalarField::new(4, 4, 4).unwrap();
        field.set(1, 2, 3, 42.0).unwrap();
        assert_eq!(field.get(1, 2, 3), Some(42.0));
        assert_eq!(field.get(4, 0, 0), None);
        assert_eq!(field.get(-1, 0, 0), None);
    }
}
