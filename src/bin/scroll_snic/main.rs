mod args;
mod utils;

use crate::args::Opt;
use crate::utils::{chunk_origins, output_path, partition, summarize_chunk};

use clap::Parser;
use log::{info, warn};
use scroll_snic::chord::grow_chords;
use scroll_snic::config::PipelineConfig;
use scroll_snic::csv_io::{write_chords_csv, write_superpixels_csv};
use scroll_snic::fetch::{ChunkStore, HttpChunkStore, LocalChunkStore};
use scroll_snic::preprocess::dilate;
use scroll_snic::snic::snic;
use scroll_snic::tracker::VolumeDirectionIndex;
use scroll_snic::{adjacency::build_adjacency, field::ScalarField};
use std::io::Write as _;

fn main() {
    env_logger::init();
    if let Err(e) = try_main() {
        eprintln!("scroll_snic: {e}");
        std::process::exit(1);
    }
}

fn chunk_store_for(path: &std::path::Path, chunk_dim: u32) -> Box<dyn ChunkStore + Send + Sync> {
    let as_str = path.to_string_lossy();
    if as_str.starts_with("http://") || as_str.starts_with("https://") {
        Box::new(HttpChunkStore::new(chunk_dim))
    } else {
        Box::new(LocalChunkStore::new(chunk_dim))
    }
}

fn try_main() -> Result<(), Box<dyn std::error::Error>> {
    let opt = Opt::parse();

    let config = match &opt.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            toml::from_str::<PipelineConfig>(&text)?
        }
        None => PipelineConfig::default(),
    };

    std::fs::create_dir_all(&opt.output)?;

    let origins = chunk_origins(
        (opt.z_start, opt.z_end),
        (opt.y_start, opt.y_end),
        (opt.x_start, opt.x_end),
        opt.chunk_dim,
    );
    info!("processing {} chunks", origins.len());

    let worker_count = opt
        .threads
        .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, |n| n.get()));
    let slices = partition(&origins, worker_count);

    let volume_store = chunk_store_for(&opt.volume, opt.chunk_dim);
    let fiber_store = opt
        .fiber_mask
        .as_ref()
        .map(|path| chunk_store_for(path, opt.chunk_dim));

    let volume_path = opt.volume.to_string_lossy().into_owned();
    let fiber_path = opt.fiber_mask.as_ref().map(|p| p.to_string_lossy().into_owned());

    std::thread::scope(|scope| {
        for slice in &slices {
            let volume_store = volume_store.as_ref();
            let fiber_store = fiber_store.as_deref().map(|s| s as &dyn ChunkStore);
            let volume_path = &volume_path;
            let fiber_path = fiber_path.as_deref();
            let opt = &opt;
            let config = &config;
            scope.spawn(move || {
                for &origin in *slice {
                    if let Err(e) = process_chunk(
                        volume_store,
                        volume_path,
                        fiber_store,
                        fiber_path,
                        origin,
                        opt,
                        config,
                    ) {
                        warn!("chunk ({}, {}, {}) failed: {e}", origin[0], origin[1], origin[2]);
                    }
                }
            });
        }
    });

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn process_chunk(
    volume_store: &dyn ChunkStore,
    volume_path: &str,
    fiber_store: Option<&dyn ChunkStore>,
    fiber_path: Option<&str>,
    origin: [u32; 3],
    opt: &Opt,
    config: &PipelineConfig,
) -> Result<(), scroll_snic::error::ScSnicError> {
    let t0 = std::time::Instant::now();

    let Some(field) = volume_store.fetch(volume_path, origin)? else {
        return Ok(());
    };

    if let (Some(store), Some(path)) = (fiber_store, fiber_path) {
        if let Some(mask) = store.fetch(path, origin)? {
            let dilated = dilate(&mask, 1)?;
            let path = output_path(&opt.output, "fiber_mask", origin, opt.chunk_dim, opt.gzip);
            write_field_csv_friendly(&dilated, &path, opt.gzip)?;
        }
    }

    let mut output = snic(&field, opt.d_seed.max(config.snic.d_seed), opt.m)?;
    let _ = output.filter(config.snic.n_min, config.snic.c_min);

    let adjacency = build_adjacency(&field, &output)?;
    let (lz, ly, lx) = field.dims();
    let mut tracker =
        VolumeDirectionIndex::with_defaults(lz, ly, lx, output.k_max().max(1) * 2)?;

    let mut grow_config = config.chord;
    grow_config.min_connections = opt.min_connections;
    grow_config.target_count = opt.target_count;

    let chords = grow_chords(
        &output.superpixels,
        &adjacency,
        opt.axis.into(),
        lz,
        opt.target_count,
        opt.seed,
        &grow_config.into(),
        &mut tracker,
    )?;

    let superpixels_path = output_path(&opt.output, "superpixels", origin, opt.chunk_dim, opt.gzip);
    let chords_path = output_path(&opt.output, "chords", origin, opt.chunk_dim, opt.gzip);
    write_csv(&superpixels_path, opt.gzip, |w| {
        write_superpixels_csv(w, &output.superpixels)
    })?;
    write_csv(&chords_path, opt.gzip, |w| write_chords_csv(w, &chords))?;

    if opt.verbose {
        info!(
            "{}",
            summarize_chunk(origin, output.k_max(), chords.len(), t0.elapsed())
        );
    }

    Ok(())
}

fn write_csv(
    path: &std::path::Path,
    gzip: bool,
    body: impl FnOnce(&mut dyn std::io::Write) -> Result<(), scroll_snic::error::ScSnicError>,
) -> Result<(), scroll_snic::error::ScSnicError> {
    let file = std::fs::File::create(path).map_err(scroll_snic::error::ScSnicError::from)?;
    let mut writer = std::io::BufWriter::new(file);
    if gzip {
        let mut gz = scroll_snic::csv_io::gzip_writer(writer);
        body(&mut gz)?;
        gz.finish().map_err(scroll_snic::error::ScSnicError::from)?;
    } else {
        body(&mut writer)?;
    }
    Ok(())
}

fn write_field_csv_friendly(
    field: &ScalarField,
    path: &std::path::Path,
    gzip: bool,
) -> Result<(), scroll_snic::error::ScSnicError> {
    let file = std::fs::File::create(path).map_err(scroll_snic::error::ScSnicError::from)?;
    let mut writer = std::io::BufWriter::new(file);
    let write_body = |w: &mut dyn std::io::Write| -> Result<(), scroll_snic::error::ScSnicError> {
        writeln!(w, "z,y,x,value").map_err(scroll_snic::error::ScSnicError::from)?;
        let (lz, ly, lx) = field.dims();
        for z in 0..lz {
            for y in 0..ly {
                for x in 0..lx {
                    let v = field.get_unchecked(z, y, x);
                    if v != 0.0 {
                        writeln!(w, "{z},{y},{x},{v}").map_err(scroll_snic::error::ScSnicError::from)?;
                    }
                }
            }
        }
        Ok(())
    };
    if gzip {
        let mut gz = scroll_snic::csv_io::gzip_writer(writer);
        write_body(&mut gz)?;
        gz.finish().map_err(scroll_snic::error::ScSnicError::from)?;
    } else {
        write_body(&mut writer)?;
    }
    Ok(())
}
