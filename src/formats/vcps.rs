//! "Volume cartesian point set" format used by the downstream unwrapping
//! toolchain: a small text header (`width`, `height`, `dim`, `ordered`,
//! `type`, `version`) terminated by a `<>` line, followed by a raw
//! `width * height * dim` point-component data blob, grounded in
//! `minivcps.h`'s `read_vcps`/`write_vcps`.
//!
//! Only `type: float` (`f32`) is supported; the original's `double`
//! alternative has no consumer in this crate.

use crate::error::ScSnicError;
use std::io::{Read, Write};

/// A point set: `width * height` points, each `dim` components, stored
/// row-major as `data[(row * width + col) * dim + component]`.
#[derive(Debug, Clone)]
pub struct PointSet {
    /// Number of points per row.
    pub width: usize,
    /// Number of rows.
    pub height: usize,
    /// Components per point.
    pub dim: usize,
    /// Flat row-major point-component buffer.
    pub data: Vec<f32>,
}

/// Write a point set in `ordered: true`, `type: float` form.
pub fn write(writer: &mut impl Write, points: &PointSet) -> Result<(), ScSnicError> {
    let expected = points.width * points.height * points.dim;
    if points.data.len() != expected {
        return Err(ScSnicError::Format(format!(
            "point set data length {} does not match width*height*dim = {expected}",
            points.data.len()
        )));
    }
    let header = format!(
        "width: {}\nheight: {}\ndim: {}\nordered: true\ntype: float\nversion: 1\n<>\n",
        points.width, points.height, points.dim
    );
    writer.write_all(header.as_bytes())?;
    for &value in &points.data {
        writer.write_all(&value.to_le_bytes())?;
    }
    Ok(())
}

/// Read a `type: float`, `ordered: true` point set.
pub fn read(reader: &mut impl Read) -> Result<PointSet, ScSnicError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    let header_end = bytes
        .windows(3)
        .position(|w| w == b"<>\n")
        .map(|pos| pos + 3)
        .ok_or_else(|| ScSnicError::Format("VCPS header has no <> terminator".into()))?;
    let header_text = std::str::from_utf8(&bytes[..header_end])
        .map_err(|e| ScSnicError::Format(format!("VCPS header is not valid UTF-8: {e}")))?;

    let mut width = None;
    let mut height = None;
    let mut dim = None;
    let mut ordered = false;
    let mut element_type = None;

    for line in header_text.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());
        match key {
            "width" => width = value.parse::<usize>().ok(),
            "height" => height = value.parse::<usize>().ok(),
            "dim" => dim = value.parse::<usize>().ok(),
            "ordered" => ordered = value == "true",
            "type" => element_type = Some(value.to_string()),
            _ => {}
        }
    }

    let (Some(width), Some(height), Some(dim)) = (width, height, dim) else {
        return Err(ScSnicError::Format("VCPS header missing width/height/dim".into()));
    };
    if !ordered {
        return Err(ScSnicError::Format("only ordered VCPS point sets are supported".into()));
    }
    if element_type.as_deref() != Some("float") {
        return Err(ScSnicError::Format(format!(
            "unsupported VCPS element type: {element_type:?}"
        )));
    }

    let count = width * height * dim;
    let raw = &bytes[header_end..];
    if raw.len() < count * 4 {
        return Err(ScSnicError::Format("VCPS point data truncated".into()));
    }
    let data = raw[..count * 4]
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes(c.try_into().unwrap()))
        .collect();

    Ok(PointSet {
        width,
        height,
        dim,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let points = PointSet {
            width: 2,
            height: 2,
            dim: 3,
            data: (0..12).map(|i| i as f32 * 0.5).collect(),
        };
        let mut buf = Vec::new();
        write(&mut buf, &points).unwrap();
        let back = read(&mut buf.as_slice()).unwrap();
        assert_eq!(back.width, 2);
        assert_eq!(back.height, 2);
        assert_eq!(back.dim, 3);
        assert_eq!(back.data, points.data);
    }

    #[test]
    fn rejects_unordered() {
        let header = "width: 1\nheight: 1\ndim: 1\nordered: false\ntype: float\n<>\n";
        let mut buf = header.as_bytes().to_vec();
        buf.extend_from_slice(&0.0f32.to_le_bytes());
        assert!(read(&mut buf.as_slice()).is_err());
    }
}
