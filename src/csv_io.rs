//! CSV persistence for superpixels, chords, chord statistics, and
//! chord/superpixel joins. Uses the `csv` crate with `serde` derives for
//! the fixed-width row shapes, grounded in `util.h`'s
//! `superpixels_to_csv`/`csv_to_superpixels`; the variable-width chord
//! point-list shape is written by hand, grounded in `chords_to_csv`/
//! `csv_to_chords`, where a derived-struct row doesn't fit.
//!
//! `flate2`'s `GzEncoder`/`GzDecoder` provide transparent gzip wrapping,
//! the equivalent of the original source's hand-rolled zlib
//! `compress_string`/`decompress_string` pair in `util.h`.

use crate::chord::Chord;
use crate::error::ScSnicError;
use crate::snic::Superpixel;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Wrap `writer` in a gzip encoder at the default compression level.
pub fn gzip_writer<W: Write>(writer: W) -> GzEncoder<W> {
    GzEncoder::new(writer, Compression::default())
}

/// Wrap `reader` in a gzip decoder.
pub fn gunzip_reader<R: Read>(reader: R) -> GzDecoder<R> {
    GzDecoder::new(reader)
}

/// A float column written `%.1f`-formatted, matching the original
/// source's `fprintf` row format (`util.h`'s `superpixels_to_csv`/
/// `chords_with_data_to_csv`), rather than serde's default
/// shortest-round-trip float formatting.
#[derive(Debug, Clone, Copy, PartialEq)]
struct OneDecimal(f32);

impl Serialize for OneDecimal {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(&format_args!("{:.1}", self.0))
    }
}

impl<'de> Deserialize<'de> for OneDecimal {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.trim()
            .parse::<f32>()
            .map(OneDecimal)
            .map_err(serde::de::Error::custom)
    }
}

impl From<f32> for OneDecimal {
    fn from(v: f32) -> Self {
        OneDecimal(v)
    }
}

impl From<OneDecimal> for f32 {
    fn from(v: OneDecimal) -> Self {
        v.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SuperpixelRow {
    z: OneDecimal,
    y: OneDecimal,
    x: OneDecimal,
    intensity: OneDecimal,
    pixel_count: u32,
}

/// Write `superpixels.Z.Y.X.csv`: one row per live superpixel (index
/// `0`, the vacant sentinel, is skipped).
pub fn write_superpixels_csv(writer: impl Write, superpixels: &[Superpixel]) -> Result<(), ScSnicError> {
    let mut w = csv::Writer::from_writer(writer);
    for sp in superpixels.iter().skip(1) {
        w.serialize(SuperpixelRow {
            z: sp.z.into(),
            y: sp.y.into(),
            x: sp.x.into(),
            intensity: sp.c.into(),
            pixel_count: sp.n,
        })?;
    }
    w.flush()?;
    Ok(())
}

/// Read `superpixels.Z.Y.X.csv` back into a `1`-indexed superpixel
/// array (index `0` vacant, matching [`crate::snic::SnicOutput`]'s
/// convention).
pub fn read_superpixels_csv(reader: impl Read) -> Result<Vec<Superpixel>, ScSnicError> {
    let mut r = csv::Reader::from_reader(reader);
    let mut superpixels = vec![Superpixel::default()];
    for row in r.deserialize() {
        let row: SuperpixelRow = row?;
        superpixels.push(Superpixel {
            c: row.intensity.into(),
            z: row.z.into(),
            y: row.y.into(),
            x: row.x.into(),
            n: row.pixel_count,
        });
    }
    Ok(superpixels)
}

/// Write `chords.Z.Y.X.csv`: header `points`, one comma-joined id list
/// per chord. Grounded in `chords_to_csv`.
pub fn write_chords_csv(mut writer: impl Write, chords: &[Chord]) -> Result<(), ScSnicError> {
    writeln!(writer, "points")?;
    for chord in chords {
        let joined: Vec<String> = chord.ids.iter().map(u32::to_string).collect();
        writeln!(writer, "{}", joined.join(","))?;
    }
    Ok(())
}

/// Read `chords.Z.Y.X.csv` back into a list of [`Chord`]s.
pub fn read_chords_csv(reader: impl Read) -> Result<Vec<Chord>, ScSnicError> {
    let mut text = String::new();
    std::io::BufReader::new(reader)
        .read_to_string(&mut text)
        .map_err(ScSnicError::from)?;
    let mut lines = text.lines();
    lines.next();
    let mut chords = Vec::new();
    for line in lines {
        if line.is_empty() {
            chords.push(Chord { ids: Vec::new() });
            continue;
        }
        let ids = line
            .split(',')
            .map(|s| s.trim().parse::<u32>())
            .collect::<Result<Vec<u32>, _>>()
            .map_err(|e| ScSnicError::Format(format!("invalid chord point id: {e}")))?;
        chords.push(Chord { ids });
    }
    Ok(chords)
}

/// One row of per-chord summary statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChordStatsRow {
    /// Index of the chord within the chunk's chord list.
    pub chord_id: usize,
    /// Number of superpixels making up the chord.
    pub num_superpixels: usize,
    /// Sum of step distances between consecutive superpixel centroids.
    pub total_length: f32,
    /// `total_length / num_superpixels.saturating_sub(1)`.
    pub avg_step: f32,
    /// End-to-end displacement divided by `total_length`, `1.0` for a
    /// perfectly straight chord.
    pub straightness: f32,
    /// Mean superpixel intensity along the chord.
    pub avg_intensity: f32,
    /// Minimum superpixel intensity along the chord.
    pub min_intensity: f32,
    /// Maximum superpixel intensity along the chord.
    pub max_intensity: f32,
    /// Minimum `z` centroid coordinate along the chord.
    pub bbox_min_z: f32,
    /// Minimum `y` centroid coordinate along the chord.
    pub bbox_min_y: f32,
    /// Minimum `x` centroid coordinate along the chord.
    pub bbox_min_x: f32,
    /// Maximum `z` centroid coordinate along the chord.
    pub bbox_max_z: f32,
    /// Maximum `y` centroid coordinate along the chord.
    pub bbox_max_y: f32,
    /// Maximum `x` centroid coordinate along the chord.
    pub bbox_max_x: f32,
}

fn centroid(sp: &Superpixel) -> [f32; 3] {
    [sp.z, sp.y, sp.x]
}

fn distance(a: [f32; 3], b: [f32; 3]) -> f32 {
    let d = [a[0] - b[0], a[1] - b[1], a[2] - b[2]];
    (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt()
}

/// Compute per-chord summary statistics, the `chords.stats.Z.Y.X.csv`
/// column list (no original-source counterpart under this name; columns
/// given verbatim by the row shape above).
pub fn analyze_chords(chords: &[Chord], superpixels: &[Superpixel]) -> Vec<ChordStatsRow> {
    chords
        .iter()
        .enumerate()
        .map(|(chord_id, chord)| {
            let points: Vec<&Superpixel> = chord
                .ids
                .iter()
                .filter_map(|&id| superpixels.get(id as usize))
                .collect();

            let mut total_length = 0.0f32;
            for pair in points.windows(2) {
                total_length += distance(centroid(pair[0]), centroid(pair[1]));
            }
            let avg_step = if points.len() > 1 {
                total_length / (points.len() - 1) as f32
            } else {
                0.0
            };
            let straightness = if points.len() > 1 && total_length > 0.0 {
                distance(centroid(points[0]), centroid(points[points.len() - 1])) / total_length
            } else {
                1.0
            };

            let intensities: Vec<f32> = points.iter().map(|sp| sp.c).collect();
            let avg_intensity = if intensities.is_empty() {
                0.0
            } else {
                intensities.iter().sum::<f32>() / intensities.len() as f32
            };
            let min_intensity = intensities.iter().cloned().fold(f32::INFINITY, f32::min);
            let max_intensity = intensities.iter().cloned().fold(f32::NEG_INFINITY, f32::max);

            let mut bbox_min = [f32::INFINITY; 3];
            let mut bbox_max = [f32::NEG_INFINITY; 3];
            for sp in &points {
                let c = centroid(sp);
                for axis in 0..3 {
                    bbox_min[axis] = bbox_min[axis].min(c[axis]);
                    bbox_max[axis] = bbox_max[axis].max(c[axis]);
                }
            }

            ChordStatsRow {
                chord_id,
                num_superpixels: points.len(),
                total_length,
                avg_step,
                straightness,
                avg_intensity,
                min_intensity,
                max_intensity,
                bbox_min_z: bbox_min[0],
                bbox_min_y: bbox_min[1],
                bbox_min_x: bbox_min[2],
                bbox_max_z: bbox_max[0],
                bbox_max_y: bbox_max[1],
                bbox_max_x: bbox_max[2],
            }
        })
        .collect()
}

/// Write `chords.stats.Z.Y.X.csv` from precomputed rows.
pub fn write_chord_stats_csv(writer: impl Write, rows: &[ChordStatsRow]) -> Result<(), ScSnicError> {
    let mut w = csv::Writer::from_writer(writer);
    for row in rows {
        w.serialize(row)?;
    }
    w.flush()?;
    Ok(())
}

/// Read `chords.stats.Z.Y.X.csv` back into rows.
pub fn read_chord_stats_csv(reader: impl Read) -> Result<Vec<ChordStatsRow>, ScSnicError> {
    let mut r = csv::Reader::from_reader(reader);
    r.deserialize().map(|row| row.map_err(ScSnicError::from)).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChordsOnlyRow {
    chord_id: usize,
    superpixel_id: u32,
    z: OneDecimal,
    y: OneDecimal,
    x: OneDecimal,
    intensity: OneDecimal,
    pixel_count: u32,
}

/// Write `chords.only.Z.Y.X.csv`: one row per chord/point pair with the
/// point's full superpixel data, grounded in `chords_with_data_to_csv`.
pub fn write_chords_only_csv(
    writer: impl Write,
    chords: &[Chord],
    superpixels: &[Superpixel],
) -> Result<(), ScSnicError> {
    let mut w = csv::Writer::from_writer(writer);
    for (chord_id, chord) in chords.iter().enumerate() {
        for &superpixel_id in &chord.ids {
            let sp = superpixels
                .get(superpixel_id as usize)
                .ok_or(ScSnicError::InvalidSuperpixel)?;
            w.serialize(ChordsOnlyRow {
                chord_id,
                superpixel_id,
                z: sp.z.into(),
                y: sp.y.into(),
                x: sp.x.into(),
                intensity: sp.c.into(),
                pixel_count: sp.n,
            })?;
        }
    }
    w.flush()?;
    Ok(())
}

/// Read `chords.only.Z.Y.X.csv`, grouping rows back into [`Chord`]s by
/// `chord_id`. Superpixel data on each row is discarded; the caller's
/// live `superpixels` array is the source of truth for re-deriving it.
pub fn read_chords_only_csv(reader: impl Read) -> Result<Vec<Chord>, ScSnicError> {
    let mut r = csv::Reader::from_reader(reader);
    let mut chords: Vec<Chord> = Vec::new();
    for row in r.deserialize() {
        let row: ChordsOnlyRow = row?;
        while chords.len() <= row.chord_id {
            chords.push(Chord { ids: Vec::new() });
        }
        chords[row.chord_id].ids.push(row.superpixel_id);
    }
    Ok(chords)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_superpixels() -> Vec<Superpixel> {
        vec![
            Superpixel::default(),
            Superpixel { c: 10.0, z: 0.0, y: 0.0, x: 0.0, n: 5 },
            Superpixel { c: 20.0, z: 1.0, y: 0.0, x: 0.0, n: 5 },
            Superpixel { c: 30.0, z: 2.0, y: 0.0, x: 0.0, n: 5 },
        ]
    }

    #[test]
    fn superpixels_csv_roundtrip_skips_the_vacant_sentinel() {
        let superpixels = sample_superpixels();
        let mut buf = Vec::new();
        write_superpixels_csv(&mut buf, &superpixels).unwrap();
        let back = read_superpixels_csv(buf.as_slice()).unwrap();
        assert_eq!(back.len(), superpixels.len());
        assert_eq!(back[1].c, 10.0);
    }

    #[test]
    fn superpixel_floats_are_written_to_one_decimal_place() {
        let superpixels = vec![
            Superpixel::default(),
            Superpixel { c: 3.14159, z: 0.049, y: 0.0, x: 0.0, n: 1 },
        ];
        let mut buf = Vec::new();
        write_superpixels_csv(&mut buf, &superpixels).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.contains("0.0,0.0,0.0,3.1,1"), "got: {text}");

        let back = read_superpixels_csv(buf.as_slice()).unwrap();
        assert_eq!(back[1].c, 3.1);
        assert_eq!(back[1].z, 0.0);
    }

    #[test]
    fn chords_csv_roundtrip() {
        let chords = vec![Chord { ids: vec![1, 2, 3] }, Chord { ids: vec![1] }];
        let mut buf = Vec::new();
        write_chords_csv(&mut buf, &chords).unwrap();
        let back = read_chords_csv(buf.as_slice()).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back[0].ids, vec![1, 2, 3]);
        assert_eq!(back[1].ids, vec![1]);
    }

    #[test]
    fn analyze_chords_reports_straightness_one_on_a_straight_chord() {
        let superpixels = sample_superpixels();
        let chords = vec![Chord { ids: vec![1, 2, 3] }];
        let stats = analyze_chords(&chords, &superpixels);
        assert_eq!(stats.len(), 1);
        assert!((stats[0].straightness - 1.0).abs() < 1e-5);
        assert_eq!(stats[0].num_superpixels, 3);
    }

    #[test]
    fn chord_stats_csv_roundtrip() {
        let superpixels = sample_superpixels();
        let chords = vec![Chord { ids: vec![1, 2, 3] }];
        let stats = analyze_chords(&chords, &superpixels);
        let mut buf = Vec::new();
        write_chord_stats_csv(&mut buf, &stats).unwrap();
        let back = read_chord_stats_csv(buf.as_slice()).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].num_superpixels, 3);
    }

    #[test]
    fn chords_only_csv_roundtrip_groups_by_chord_id() {
        let superpixels = sample_superpixels();
        let chords = vec![Chord { ids: vec![1, 2] }, Chord { ids: vec![3] }];
        let mut buf = Vec::new();
        write_chords_only_csv(&mut buf, &chords, &superpixels).unwrap();
        let back = read_chords_only_csv(buf.as_slice()).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back[0].ids, vec![1, 2]);
        assert_eq!(back[1].ids, vec![3]);
    }

    #[test]
    fn gzip_roundtrip() {
        let mut compressed = Vec::new();
        {
            let mut encoder = gzip_writer(&mut compressed);
            encoder.write_all(b"hello chord csv").unwrap();
            encoder.finish().unwrap();
        }
        let mut decoder = gunzip_reader(compressed.as_slice());
        let mut text = String::new();
        decoder.read_to_string(&mut text).unwrap();
        assert_eq!(text, "hello chord csv");
    }
}
