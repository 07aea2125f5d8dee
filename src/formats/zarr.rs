//! `.zarray` JSON descriptor parsing and single-chunk decoding, grounded
//! in `minizarr.h`'s `parse_zarray`/`parse_zarr_metadata`, reimplemented
//! here with typed `serde` structs instead of hand-rolled JSON object
//! traversal — the original's own hand-rolled JSON walk exists only
//! because C has no `serde_json`; this crate does.

use crate::error::ScSnicError;
use crate::field::ScalarField;
use serde::Deserialize;

/// Compressor settings embedded in a `.zarray` descriptor.
#[derive(Debug, Clone, Deserialize)]
pub struct CompressorSettings {
    /// Blosc block size in bytes; `0` lets the codec choose.
    pub blocksize: i32,
    /// Blosc compression level, `0`-`9`.
    pub clevel: i32,
    /// Blosc codec name, e.g. `"zstd"`.
    pub cname: String,
    /// Compressor identifier, e.g. `"blosc"`.
    pub id: String,
    /// Blosc shuffle filter mode.
    pub shuffle: i32,
}

/// Parsed `.zarray` metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct ZarrMetadata {
    /// Full array extent along `(z, y, x)`.
    pub shape: [i64; 3],
    /// Chunk extent along `(z, y, x)`.
    pub chunks: [i64; 3],
    /// Compressor settings, or `None` if the array is stored uncompressed.
    pub compressor: Option<CompressorSettings>,
    /// NumPy-style dtype string, e.g. `"<f4"`.
    pub dtype: String,
    /// Value used to fill positions outside any stored chunk.
    pub fill_value: f64,
    /// Memory layout, `"C"` or `"F"`.
    pub order: String,
    /// Zarr format version.
    pub zarr_format: i32,
}

/// Parse a `.zarray` descriptor's JSON text.
pub fn parse_zarray(json: &str) -> Result<ZarrMetadata, ScSnicError> {
    serde_json::from_str(json).map_err(ScSnicError::from)
}

fn dtype_element_size(dtype: &str) -> Option<usize> {
    match dtype.trim_start_matches(['<', '>', '|']) {
        "f4" => Some(4),
        "f8" => Some(8),
        "u1" | "i1" => Some(1),
        "u2" | "i2" => Some(2),
        "u4" | "i4" => Some(4),
        _ => None,
    }
}

/// Decode one raw (uncompressed) chunk file's bytes into a dense `f32`
/// field of the metadata's `chunks` shape.
///
/// Blosc-framed chunks (`compressor.id == "blosc"`) are not supported:
/// there is no real blosc-decoding crate in this crate's dependency
/// stack, and fabricating one is out of scope, so such a chunk is a
/// [`ScSnicError::Format`] rather than silently misdecoded data.
pub fn decode_chunk(bytes: &[u8], metadata: &ZarrMetadata) -> Result<ScalarField, ScSnicError> {
    if let Some(compressor) = &metadata.compressor {
        if compressor.id != "raw" && !compressor.id.is_empty() {
            return Err(ScSnicError::Format(format!(
                "unsupported zarr compressor: {}",
                compressor.id
            )));
        }
    }

    let element_size = dtype_element_size(&metadata.dtype)
        .ok_or_else(|| ScSnicError::Format(format!("unsupported zarr dtype: {}", metadata.dtype)))?;

    let [cz, cy, cx] = metadata.chunks;
    let (cz, cy, cx) = (cz as usize, cy as usize, cx as usize);
    let voxel_count = cz * cy * cx;
    let expected_bytes = voxel_count * element_size;
    if bytes.len() < expected_bytes {
        return Err(ScSnicError::Format(format!(
            "zarr chunk truncated: expected {expected_bytes} bytes, got {}",
            bytes.len()
        )));
    }

    let mut data = Vec::with_capacity(voxel_count);
    match metadata.dtype.trim_start_matches(['<', '>', '|']) {
        "f4" => {
            for chunk in bytes[..expected_bytes].chunks_exact(4) {
                data.push(f32::from_le_bytes(chunk.try_into().unwrap()));
            }
        }
        "u1" => data.extend(bytes[..expected_bytes].iter().map(|&b| f32::from(b))),
        "u2" => {
            for chunk in bytes[..expected_bytes].chunks_exact(2) {
                data.push(f32::from(u16::from_le_bytes(chunk.try_into().unwrap())));
            }
        }
        other => {
            return Err(ScSnicError::Format(format!(
                "zarr dtype {other} has no f32 decode path"
            )))
        }
    }

    ScalarField::from_vec(cz as u32, cy as u32, cx as u32, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_zarray_descriptor() {
        let json = r#"{
            "shape": [256, 256, 256],
            "chunks": [128, 128, 128],
            "compressor": {"blocksize": 0, "clevel": 5, "cname": "lz4", "id": "blosc", "shuffle": 1},
            "dtype": "|u1",
            "fill_value": 0,
            "order": "C",
            "zarr_format": 2
        }"#;
        let metadata = parse_zarray(json).unwrap();
        assert_eq!(metadata.shape, [256, 256, 256]);
        assert_eq!(metadata.dtype, "|u1");
    }

    #[test]
    fn decodes_raw_u1_chunk() {
        let metadata = ZarrMetadata {
            shape: [2, 2, 2],
            chunks: [2, 2, 2],
            compressor: None,
            dtype: "|u1".to_string(),
            fill_value: 0.0,
            order: "C".to_string(),
            zarr_format: 2,
        };
        let bytes: Vec<u8> = (0..8).collect();
        let field = decode_chunk(&bytes, &metadata).unwrap();
        assert_eq!(field.dims(), (2, 2, 2));
        assert_eq!(field.as_slice()[7], 7.0);
    }

    #[test]
    fn rejects_blosc_compressed_chunk() {
        let metadata = ZarrMetadata {
            shape: [2, 2, 2],
            chunks: [2, 2, 2],
            compressor: Some(CompressorSettings {
                blocksize: 0,
                clevel: 5,
                cname: "lz4".into(),
                id: "blosc".into(),
                shuffle: 1,
            }),
            dtype: "|u1".to_string(),
            fill_value: 0.0,
            order: "C".to_string(),
            zarr_format: 2,
        };
        assert!(decode_chunk(&[0u8; 8], &metadata).is_err());
    }
}
