//! Binary PPM (P6) reader/writer, used for 2-D preview renders of a
//! slice. Trivial fixed-header-plus-raw-bytes codec, grounded in
//! `minippm.h`'s `ppm_new`/`read_header`/the P6 write path.

use crate::error::ScSnicError;
use std::io::{Read, Write};

/// An 8-bit RGB image in row-major order.
#[derive(Debug, Clone)]
pub struct PpmImage {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// `width * height * 3` bytes, row-major RGB.
    pub data: Vec<u8>,
}

impl PpmImage {
    /// Create a black image of the given dimensions.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; width as usize * height as usize * 3],
        }
    }
}

/// Write a binary (P6) PPM.
pub fn write(writer: &mut impl Write, image: &PpmImage) -> Result<(), ScSnicError> {
    let expected = image.width as usize * image.height as usize * 3;
    if image.data.len() != expected {
        return Err(ScSnicError::Format(format!(
            "PPM data length {} does not match {}x{}x3",
            image.data.len(),
            image.width,
            image.height
        )));
    }
    writer.write_all(format!("P6\n{} {}\n255\n", image.width, image.height).as_bytes())?;
    writer.write_all(&image.data)?;
    Ok(())
}

/// Read a binary (P6) PPM. Max value must be `255`; anything else is a
/// [`ScSnicError::Format`] (this crate only ever writes `255`).
pub fn read(reader: &mut impl Read) -> Result<PpmImage, ScSnicError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    let mut cursor = 0usize;
    let magic = read_token(&bytes, &mut cursor)?;
    if magic != "P6" {
        return Err(ScSnicError::Format(format!(
            "unsupported PPM magic: {magic}"
        )));
    }
    let width: u32 = read_token(&bytes, &mut cursor)?
        .parse()
        .map_err(|_| ScSnicError::Format("invalid PPM width".into()))?;
    let height: u32 = read_token(&bytes, &mut cursor)?
        .parse()
        .map_err(|_| ScSnicError::Format("invalid PPM height".into()))?;
    let max_val: u32 = read_token(&bytes, &mut cursor)?
        .parse()
        .map_err(|_| ScSnicError::Format("invalid PPM max value".into()))?;
    if max_val != 255 {
        return Err(ScSnicError::Format(format!(
            "unsupported PPM max value: {max_val}"
        )));
    }
    // Exactly one whitespace byte separates the header from binary data.
    cursor += 1;

    let expected = width as usize * height as usize * 3;
    let data = bytes
        .get(cursor..cursor + expected)
        .ok_or_else(|| ScSnicError::Format("PPM pixel data truncated".into()))?
        .to_vec();

    Ok(PpmImage {
        width,
        height,
        data,
    })
}

fn read_token<'a>(bytes: &'a [u8], cursor: &mut usize) -> Result<&'a str, ScSnicError> {
    skip_whitespace_and_comments(bytes, cursor);
    let start = *cursor;
    while *cursor < bytes.len() && !bytes[*cursor].is_ascii_whitespace() {
        *cursor += 1;
    }
    std::str::from_utf8(&bytes[start..*cursor])
        .map_err(|e| ScSnicError::Format(format!("invalid PPM header token: {e}")))
}

fn skip_whitespace_and_comments(bytes: &[u8], cursor: &mut usize) {
    loop {
        while *cursor < bytes.len() && bytes[*cursor].is_ascii_whitespace() {
            *cursor += 1;
        }
        if *cursor < bytes.len() && bytes[*cursor] == b'#' {
            while *cursor < bytes.len() && bytes[*cursor] != b'\n' {
                *cursor += 1;
            }
        } else {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let mut image = PpmImage::new(4, 3);
        for (i, b) in image.data.iter_mut().enumerate() {
            *b = (i % 256) as u8;
        }
        let mut buf = Vec::new();
        write(&mut buf, &image).unwrap();
        let back = read(&mut buf.as_slice()).unwrap();
        assert_eq!(back.width, 4);
        assert_eq!(back.height, 3);
        assert_eq!(back.data, image.data);
    }

    #[test]
    fn rejects_mismatched_data_length() {
        let image = PpmImage {
            width: 2,
            height: 2,
            data: vec![0u8; 5],
        };
        let mut buf = Vec::new();
        assert!(write(&mut buf, &image).is_err());
    }

    #[test]
    fn rejects_wrong_magic() {
        let mut buf = b"P3\n1 1\n255\n".to_vec();
        buf.extend_from_slice(&[0, 0, 0]);
        assert!(read(&mut buf.as_slice()).is_err());
    }
}
