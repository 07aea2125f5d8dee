use std::path::{Path, PathBuf};

/// All chunk-grid origins `(z, y, x)` in `[start, end)` on every axis,
/// in voxel-space units (chunk-grid index times `chunk_dim`).
pub fn chunk_origins(
    z_range: (u32, u32),
    y_range: (u32, u32),
    x_range: (u32, u32),
    chunk_dim: u32,
) -> Vec<[u32; 3]> {
    let mut origins = Vec::new();
    for z in z_range.0..z_range.1 {
        for y in y_range.0..y_range.1 {
            for x in x_range.0..x_range.1 {
                origins.push([z * chunk_dim, y * chunk_dim, x * chunk_dim]);
            }
        }
    }
    origins
}

/// Split `items` into up to `worker_count` contiguous, roughly equal
/// slices, matching the range-partitioning scheme a thread pool of
/// long-lived workers expects (each worker owns a disjoint chunk range,
/// not a work-stealing queue over single chunks).
pub fn partition<'a, T>(items: &'a [T], worker_count: usize) -> Vec<&'a [T]> {
    let worker_count = worker_count.max(1).min(items.len().max(1));
    if items.is_empty() {
        return Vec::new();
    }
    let chunk_size = items.len().div_ceil(worker_count);
    items.chunks(chunk_size.max(1)).collect()
}

/// Output filename for a chunk's results: `{kind}.{z}.{y}.{x}.csv[.gz]`,
/// where `z/y/x` are chunk-grid indices (voxel origin divided by
/// `chunk_dim`).
pub fn output_path(
    output_dir: &Path,
    kind: &str,
    origin: [u32; 3],
    chunk_dim: u32,
    gzip: bool,
) -> PathBuf {
    let ext = if gzip { "csv.gz" } else { "csv" };
    output_dir.join(format!(
        "{kind}.{}.{}.{}.{ext}",
        origin[0] / chunk_dim,
        origin[1] / chunk_dim,
        origin[2] / chunk_dim
    ))
}

/// One-line `--verbose` summary for a single processed chunk.
pub fn summarize_chunk(origin: [u32; 3], superpixel_count: usize, chord_count: usize, elapsed: std::time::Duration) -> String {
    format!(
        "chunk ({}, {}, {}): {superpixel_count} superpixels, {chord_count} chords in {elapsed:?}",
        origin[0], origin[1], origin[2]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_origins_covers_the_full_cartesian_range() {
        let origins = chunk_origins((0, 2), (0, 1), (0, 2), 128);
        assert_eq!(
            origins,
            vec![[0, 0, 0], [0, 0, 128], [128, 0, 0], [128, 0, 128]]
        );
    }

    #[test]
    fn partition_splits_into_at_most_worker_count_slices() {
        let items: Vec<u32> = (0..10).collect();
        let parts = partition(&items, 3);
        assert!(parts.len() <= 3);
        assert_eq!(parts.iter().map(|p| p.len()).sum::<usize>(), 10);
    }

    #[test]
    fn partition_of_empty_input_is_empty() {
        let items: Vec<u32> = Vec::new();
        assert!(partition(&items, 4).is_empty());
    }

    #[test]
    fn output_path_divides_origin_by_chunk_dim() {
        let path = output_path(Path::new("/out"), "superpixels", [256, 128, 0], 128, true);
        assert_eq!(path, Path::new("/out/superpixels.2.1.0.csv.gz"));
    }
}
