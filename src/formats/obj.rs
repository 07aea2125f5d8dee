//! OBJ mesh writer/reader, grounded in `miniobj.h`'s `write_obj`/
//! `read_obj`: `v x y z` vertex lines and `f a b c` (1-based, optionally
//! `a/t/n` triples) triangle face lines.

use crate::error::ScSnicError;
use std::io::{Read, Write};

/// Write vertices and triangle indices as an OBJ mesh.
pub fn write(
    writer: &mut impl Write,
    vertices: &[[f32; 3]],
    indices: &[[u32; 3]],
) -> Result<(), ScSnicError> {
    writeln!(writer, "# volumetric chord mesh export")?;
    for v in vertices {
        writeln!(writer, "v {:.6} {:.6} {:.6}", v[0], v[1], v[2])?;
    }
    for face in indices {
        writeln!(
            writer,
            "f {} {} {}",
            face[0] + 1,
            face[1] + 1,
            face[2] + 1
        )?;
    }
    Ok(())
}

/// Read an OBJ mesh, returning `0`-based triangle indices.
///
/// Only `v` and `f` lines are interpreted; `f` lines may carry
/// `vertex/texture/normal` triples, of which only the vertex index is
/// kept. A face line with a vertex count other than 3 is a
/// [`ScSnicError::Format`] rather than silently skipped, since a
/// malformed mesh is a pipeline bug, not expected input noise.
pub fn read(reader: &mut impl Read) -> Result<(Vec<[f32; 3]>, Vec<[u32; 3]>), ScSnicError> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;

    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("v ") {
            let values: Vec<f32> = rest
                .split_whitespace()
                .map(|s| s.parse::<f32>())
                .collect::<Result<_, _>>()
                .map_err(|e| ScSnicError::Format(format!("invalid OBJ vertex line: {e}")))?;
            if values.len() != 3 {
                return Err(ScSnicError::Format("OBJ vertex line has wrong arity".into()));
            }
            vertices.push([values[0], values[1], values[2]]);
        } else if let Some(rest) = line.strip_prefix("f ") {
            let tokens: Vec<&str> = rest.split_whitespace().collect();
            if tokens.len() != 3 {
                return Err(ScSnicError::Format("only triangular OBJ faces are supported".into()));
            }
            let mut face = [0u32; 3];
            for (slot, token) in face.iter_mut().zip(tokens.iter()) {
                let vertex_index = token
                    .split('/')
                    .next()
                    .unwrap()
                    .parse::<i64>()
                    .map_err(|e| ScSnicError::Format(format!("invalid OBJ face index: {e}")))?;
                if vertex_index < 1 {
                    return Err(ScSnicError::Format("OBJ face index must be 1-based and positive".into()));
                }
                *slot = (vertex_index - 1) as u32;
            }
            indices.push(face);
        }
    }

    Ok((vertices, indices))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_plain_faces() {
        let vertices = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let indices = vec![[0u32, 1, 2]];
        let mut buf = Vec::new();
        write(&mut buf, &vertices, &indices).unwrap();
        let (back_vertices, back_indices) = read(&mut buf.as_slice()).unwrap();
        assert_eq!(back_vertices, vertices);
        assert_eq!(back_indices, indices);
    }

    #[test]
    fn reads_faces_with_texture_and_normal_indices() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1/1/1 2/2/1 3/3/1\n";
        let (vertices, indices) = read(&mut text.as_bytes()).unwrap();
        assert_eq!(vertices.len(), 3);
        assert_eq!(indices, vec![[0, 1, 2]]);
    }

    #[test]
    fn rejects_quad_faces() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 1 1 0\nf 1 2 3 4\n";
        assert!(read(&mut text.as_bytes()).is_err());
    }
}
