//! Multi-page grayscale TIFF stack reader/writer, one page per `z` slice.
//!
//! Grounded in `minitiff.h`'s directory model (`width`, `height`,
//! `bitsPerSample`, one strip per directory, single-channel contiguous
//! data only) but built on the `tiff` crate rather than hand-rolling IFD
//! parsing: the original's own validation already restricts itself to
//! exactly the subset the `tiff` crate handles natively (uncompressed,
//! single sample per pixel, one strip per page).

use crate::error::ScSnicError;
use crate::field::ScalarField;
use std::io::{Read, Seek, Write};
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::{colortype, TiffEncoder};
use tiff::ColorType;

impl From<tiff::TiffError> for ScSnicError {
    fn from(error: tiff::TiffError) -> Self {
        ScSnicError::Format(format!("TIFF error: {error}"))
    }
}

/// Read a multi-page 8- or 16-bit grayscale TIFF stack into a
/// [`ScalarField`] whose `z` axis is the page count.
pub fn read<R: Read + Seek>(reader: R) -> Result<ScalarField, ScSnicError> {
    let mut decoder = Decoder::new(reader)?;
    let (width, height) = decoder.dimensions()?;
    if decoder.colortype()? != ColorType::Gray(8) && decoder.colortype()? != ColorType::Gray(16) {
        return Err(ScSnicError::Format(
            "only single-channel grayscale TIFF stacks are supported".into(),
        ));
    }

    let mut slices: Vec<Vec<f32>> = Vec::new();
    loop {
        let image = decoder.read_image()?;
        let slice = match image {
            DecodingResult::U8(bytes) => bytes.into_iter().map(f32::from).collect(),
            DecodingResult::U16(words) => words.into_iter().map(f32::from).collect(),
            other => {
                return Err(ScSnicError::Format(format!(
                    "unsupported TIFF sample encoding: {other:?}"
                )))
            }
        };
        slices.push(slice);
        if !decoder.more_images() {
            break;
        }
        decoder.next_image()?;
    }

    let lz = slices.len();
    if lz == 0 {
        return Err(ScSnicError::Format("TIFF stack has no directories".into()));
    }
    let mut data = Vec::with_capacity(lz * width as usize * height as usize);
    for slice in slices {
        data.extend(slice);
    }

    ScalarField::from_vec(lz as u32, height, width, data)
}

/// Write `field` as a multi-page 16-bit grayscale TIFF stack, one page
/// per `z` slice, clamping intensities into `0..=65535`.
pub fn write<W: Write + Seek>(writer: W, field: &ScalarField) -> Result<(), ScSnicError> {
    let (lz, ly, lx) = field.dims();
    let mut encoder = TiffEncoder::new(writer)?;
    let slice_len = (ly * lx) as usize;
    for z in 0..lz {
        let start = z as usize * slice_len;
        let slice = &field.as_slice()[start..start + slice_len];
        let page: Vec<u16> = slice
            .iter()
            .map(|&v| v.round().clamp(0.0, 65535.0) as u16)
            .collect();
        encoder.write_image::<colortype::Gray16>(lx, ly, &page)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn roundtrip_single_page() {
        let mut field = ScalarField::new(1, 4, 3).unwrap();
        for (i, v) in field.as_mut_slice().iter_mut().enumerate() {
            *v = (i * 100) as f32;
        }
        let mut buf = Cursor::new(Vec::new());
        write(&mut buf, &field).unwrap();
        buf.set_position(0);
        let back = read(buf).unwrap();
        assert_eq!(back.dims(), field.dims());
        assert_eq!(back.as_slice(), field.as_slice());
    }

    #[test]
    fn roundtrip_multi_page_stack() {
        let mut field = ScalarField::new(3, 2, 2).unwrap();
        for (i, v) in field.as_mut_slice().iter_mut().enumerate() {
            *v = i as f32;
        }
        let mut buf = Cursor::new(Vec::new());
        write(&mut buf, &field).unwrap();
        buf.set_position(0);
        let back = read(buf).unwrap();
        assert_eq!(back.dims(), (3, 2, 2));
        assert_eq!(back.as_slice(), field.as_slice());
    }
}
