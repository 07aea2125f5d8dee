//! Marching-cubes surface extraction from a [`ScalarField`], grounded in
//! `volcano.h`'s `march`/`process_cube`/`interpolate_vertex`.
//!
//! The original walks every cube of 8 neighboring voxels, thresholds
//! the 8 corner values against an isovalue to pick one of 256 cases
//! out of `edgeTable`/`triTable`, and linearly interpolates the
//! crossing point along each cut edge. This module keeps that
//! structure; only the over-allocate-then-`realloc` output buffer is
//! replaced with a plain growable `Vec`.

#[path = "mesh_tables.rs"]
mod mesh_tables;

use crate::error::ScSnicError;
use crate::field::ScalarField;
use mesh_tables::{EDGE_TABLE, TRI_TABLE};

/// A triangle mesh extracted from an isosurface.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    /// Triangle vertex positions in voxel-space `(z, y, x)` coordinates.
    pub vertices: Vec<[f32; 3]>,
    /// Triangles as index triples into `vertices`.
    pub triangles: Vec<[u32; 3]>,
}

/// The 8 corner offsets of a unit cube, in the original's winding order.
const CORNER_OFFSETS: [[u32; 3]; 8] = [
    [0, 0, 0],
    [1, 0, 0],
    [1, 1, 0],
    [0, 1, 0],
    [0, 0, 1],
    [1, 0, 1],
    [1, 1, 1],
    [0, 1, 1],
];

/// The two corner indices each of the 12 cube edges connects.
const EDGE_CORNERS: [(usize, usize); 12] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 0),
    (4, 5),
    (5, 6),
    (6, 7),
    (7, 4),
    (0, 4),
    (1, 5),
    (2, 6),
    (3, 7),
];

const EPSILON: f32 = 0.00001;

fn interpolate_vertex(isovalue: f32, v1: f32, v2: f32, p1: [f32; 3], p2: [f32; 3]) -> [f32; 3] {
    if (isovalue - v1).abs() < EPSILON {
        return p1;
    }
    if (isovalue - v2).abs() < EPSILON {
        return p2;
    }
    if (v1 - v2).abs() < EPSILON {
        return p1;
    }
    let t = (isovalue - v1) / (v2 - v1);
    [
        p1[0] + t * (p2[0] - p1[0]),
        p1[1] + t * (p2[1] - p1[1]),
        p1[2] + t * (p2[2] - p1[2]),
    ]
}

/// Appends the triangles of a single cube (with minimum corner `(z, y, x)`)
/// to `mesh`.
fn process_cube(field: &ScalarField, z: u32, y: u32, x: u32, isovalue: f32, mesh: &mut Mesh) {
    let mut corner_value = [0.0f32; 8];
    let mut corner_pos = [[0.0f32; 3]; 8];
    for (i, offset) in CORNER_OFFSETS.iter().enumerate() {
        let cz = z + offset[0];
        let cy = y + offset[1];
        let cx = x + offset[2];
        corner_value[i] = field.get_unchecked(cz, cy, cx);
        corner_pos[i] = [cz as f32, cy as f32, cx as f32];
    }

    let mut cubeindex = 0u8;
    for (i, value) in corner_value.iter().enumerate() {
        if *value < isovalue {
            cubeindex |= 1 << i;
        }
    }

    let edge_mask = EDGE_TABLE[cubeindex as usize];
    if edge_mask == 0 {
        return;
    }

    let mut edge_vertex = [[0.0f32; 3]; 12];
    for (edge, &(a, b)) in EDGE_CORNERS.iter().enumerate() {
        if edge_mask & (1 << edge) != 0 {
            edge_vertex[edge] = interpolate_vertex(
                isovalue,
                corner_value[a],
                corner_value[b],
                corner_pos[a],
                corner_pos[b],
            );
        }
    }

    let row = &TRI_TABLE[cubeindex as usize];
    let mut i = 0;
    while row[i] != -1 {
        let base = mesh.vertices.len() as u32;
        mesh.vertices.push(edge_vertex[row[i] as usize]);
        mesh.vertices.push(edge_vertex[row[i + 1] as usize]);
        mesh.vertices.push(edge_vertex[row[i + 2] as usize]);
        mesh.triangles.push([base, base + 1, base + 2]);
        i += 3;
    }
}

/// Extract an isosurface mesh at `isovalue` from `field`.
///
/// A field with any dimension less than `2` has no cubes to march and
/// yields an empty mesh.
pub fn march(field: &ScalarField, isovalue: f32) -> Result<Mesh, ScSnicError> {
    let (lz, ly, lx) = field.dims();
    let mut mesh = Mesh::default();
    if lz < 2 || ly < 2 || lx < 2 {
        return Ok(mesh);
    }
    for z in 0..lz - 1 {
        for y in 0..ly - 1 {
            for x in 0..lx - 1 {
                process_cube(field, z, y, x, isovalue, &mut mesh);
            }
        }
    }
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_below_isovalue_field_yields_empty_mesh() {
        let field = ScalarField::new(4, 4, 4).unwrap();
        let mesh = march(&field, 0.5).unwrap();
        assert!(mesh.triangles.is_empty());
    }

    #[test]
    fn a_single_hot_corner_yields_one_triangle() {
        let mut field = ScalarField::new(2, 2, 2).unwrap();
        field.set(0, 0, 0, 1.0).unwrap();
        let mesh = march(&field, 0.5).unwrap();
        assert_eq!(mesh.triangles.len(), 1);
        assert_eq!(mesh.vertices.len(), 3);
    }

    #[test]
    fn a_fully_hot_block_has_no_internal_surface() {
        let mut field = ScalarField::new(3, 3, 3).unwrap();
        for v in field.as_mut_slice() {
            *v = 1.0;
        }
        let mesh = march(&field, 0.5).unwrap();
        assert!(mesh.triangles.is_empty());
    }

    #[test]
    fn a_half_hot_slab_produces_a_planar_sheet_of_triangles() {
        let (lz, ly, lx) = (4u32, 4u32, 4u32);
        let mut field = ScalarField::new(lz, ly, lx).unwrap();
        for z in 0..lz {
            for y in 0..ly {
                for x in 0..lx {
                    if z < 2 {
                        field.set(z as i64, y as i64, x as i64, 1.0).unwrap();
                    }
                }
            }
        }
        let mesh = march(&field, 0.5).unwrap();
        assert!(!mesh.triangles.is_empty());
        for v in &mesh.vertices {
            assert!((v[0] - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn degenerate_dimensions_yield_empty_mesh_without_error() {
        let field = ScalarField::new(1, 4, 4).unwrap();
        let mesh = march(&field, 0.5).unwrap();
        assert!(mesh.triangles.is_empty());
    }
}
