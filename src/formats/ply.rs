//! ASCII PLY mesh writer/reader, grounded in `miniply.h`'s
//! `write_ply`/`read_ply`. Only the ASCII variant is implemented: the
//! original's binary-little-endian path exists for interop with other
//! tools, but this crate never needs to read meshes it didn't itself
//! write, so the simpler ASCII form is sufficient both ways.

use crate::error::ScSnicError;
use std::io::{Read, Write};

/// A triangle mesh: flat `xyz` vertex positions, optional flat `xyz`
/// vertex normals, and triangle vertex-index triples.
#[derive(Debug, Clone)]
pub struct PlyMesh {
    /// Flat `xyz` vertex positions.
    pub vertices: Vec<[f32; 3]>,
    /// Flat `xyz` vertex normals, parallel to `vertices` when present.
    pub normals: Option<Vec<[f32; 3]>>,
    /// Triangle vertex-index triples.
    pub indices: Vec<[u32; 3]>,
}

/// Write an ASCII PLY mesh.
pub fn write(writer: &mut impl Write, mesh: &PlyMesh) -> Result<(), ScSnicError> {
    if let Some(normals) = &mesh.normals {
        if normals.len() != mesh.vertices.len() {
            return Err(ScSnicError::Format(
                "PLY normal count does not match vertex count".into(),
            ));
        }
    }

    writeln!(writer, "ply")?;
    writeln!(writer, "format ascii 1.0")?;
    writeln!(writer, "comment volumetric chord mesh export")?;
    writeln!(writer, "element vertex {}", mesh.vertices.len())?;
    writeln!(writer, "property float x")?;
    writeln!(writer, "property float y")?;
    writeln!(writer, "property float z")?;
    if mesh.normals.is_some() {
        writeln!(writer, "property float nx")?;
        writeln!(writer, "property float ny")?;
        writeln!(writer, "property float nz")?;
    }
    writeln!(writer, "element face {}", mesh.indices.len())?;
    writeln!(writer, "property list uchar int vertex_indices")?;
    writeln!(writer, "end_header")?;

    for (i, v) in mesh.vertices.iter().enumerate() {
        match &mesh.normals {
            Some(normals) => {
                let n = normals[i];
                writeln!(
                    writer,
                    "{:.6} {:.6} {:.6} {:.6} {:.6} {:.6}",
                    v[0], v[1], v[2], n[0], n[1], n[2]
                )?;
            }
            None => writeln!(writer, "{:.6} {:.6} {:.6}", v[0], v[1], v[2])?,
        }
    }
    for face in &mesh.indices {
        writeln!(writer, "3 {} {} {}", face[0], face[1], face[2])?;
    }
    Ok(())
}

/// Read an ASCII PLY mesh written by [`write`].
pub fn read(reader: &mut impl Read) -> Result<PlyMesh, ScSnicError> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    let mut lines = text.lines();

    let magic = lines.next().unwrap_or("");
    if magic.trim() != "ply" {
        return Err(ScSnicError::Format("not a PLY file".into()));
    }

    let mut vertex_count = None;
    let mut face_count = None;
    let mut has_normals = false;
    for line in lines.by_ref() {
        let line = line.trim();
        if line == "end_header" {
            break;
        }
        if let Some(rest) = line.strip_prefix("element vertex ") {
            vertex_count = rest.trim().parse::<usize>().ok();
        } else if let Some(rest) = line.strip_prefix("element face ") {
            face_count = rest.trim().parse::<usize>().ok();
        } else if line.starts_with("property float nx") {
            has_normals = true;
        }
    }
    let vertex_count =
        vertex_count.ok_or_else(|| ScSnicError::Format("PLY header missing vertex count".into()))?;
    let face_count =
        face_count.ok_or_else(|| ScSnicError::Format("PLY header missing face count".into()))?;

    let mut vertices = Vec::with_capacity(vertex_count);
    let mut normals = has_normals.then(|| Vec::with_capacity(vertex_count));
    for _ in 0..vertex_count {
        let line = lines
            .next()
            .ok_or_else(|| ScSnicError::Format("PLY vertex data truncated".into()))?;
        let values: Vec<f32> = line
            .split_whitespace()
            .map(|s| s.parse::<f32>())
            .collect::<Result<_, _>>()
            .map_err(|e| ScSnicError::Format(format!("invalid PLY vertex line: {e}")))?;
        let want = if has_normals { 6 } else { 3 };
        if values.len() != want {
            return Err(ScSnicError::Format("PLY vertex line has wrong arity".into()));
        }
        vertices.push([values[0], values[1], values[2]]);
        if let Some(normals) = &mut normals {
            normals.push([values[3], values[4], values[5]]);
        }
    }

    let mut indices = Vec::with_capacity(face_count);
    for _ in 0..face_count {
        let line = lines
            .next()
            .ok_or_else(|| ScSnicError::Format("PLY face data truncated".into()))?;
        let values: Vec<u32> = line
            .split_whitespace()
            .map(|s| s.parse::<u32>())
            .collect::<Result<_, _>>()
            .map_err(|e| ScSnicError::Format(format!("invalid PLY face line: {e}")))?;
        if values.len() != 4 || values[0] != 3 {
            return Err(ScSnicError::Format("only triangular PLY faces are supported".into()));
        }
        indices.push([values[1], values[2], values[3]]);
    }

    Ok(PlyMesh {
        vertices,
        normals,
        indices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_without_normals() {
        let mesh = PlyMesh {
            vertices: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            normals: None,
            indices: vec![[0, 1, 2]],
        };
        let mut buf = Vec::new();
        write(&mut buf, &mesh).unwrap();
        let back = read(&mut buf.as_slice()).unwrap();
        assert_eq!(back.vertices, mesh.vertices);
        assert_eq!(back.indices, mesh.indices);
        assert!(back.normals.is_none());
    }

    #[test]
    fn roundtrip_with_normals() {
        let mesh = PlyMesh {
            vertices: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            normals: Some(vec![[0.0, 0.0, 1.0]; 3]),
            indices: vec![[0, 1, 2]],
        };
        let mut buf = Vec::new();
        write(&mut buf, &mesh).unwrap();
        let back = read(&mut buf.as_slice()).unwrap();
        assert_eq!(back.normals, mesh.normals);
    }

    #[test]
    fn mismatched_normal_count_is_rejected() {
        let mesh = PlyMesh {
            vertices: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
            normals: Some(vec![[0.0, 0.0, 1.0]]),
            indices: vec![],
        };
        let mut buf = Vec::new();
        assert!(write(&mut buf, &mesh).is_err());
    }
}
