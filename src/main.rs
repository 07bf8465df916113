// THEORY:
// Command-line front end for the `icon_dedup` library:
//
//   icon_dedup points <n> [icon_side]        offline hyper point selection
//   icon_dedup compare <a> <b>               verdict for two image files
//   icon_dedup scan <file>...                near-duplicate pairs in a set of files
//
// `scan` streams the collection through the parallel pipeline in windows of a
// few paths per worker. Workers decode their own files, so at most one window
// of full-size bitmaps exists at a time; only icons and hash keys accumulate.
//
// Every subcommand honors `ICON_DEDUP_CONFIG` (a TOML file) and `RUST_LOG`.

use icon_dedup::core_modules::point_selector::{min_pairwise_distance, select_points};
use icon_dedup::core_modules::similarity::{euclidean_metrics, proportion_metric};
use icon_dedup::core_modules::utils::image_helper::image_helper::open_icon;
use icon_dedup::{HashTable, Icon, IconPipeline, ParallelPipeline, PipelineConfig, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const SCAN_PATHS_PER_WORKER: usize = 4;

const USAGE: &str = "usage:
  icon_dedup points <n> [icon_side]
  icon_dedup compare <image_a> <image_b>
  icon_dedup scan <image>...";

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("icon_dedup=info")))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let outcome = match args.first().map(String::as_str) {
        Some("points") if args.len() >= 2 => points(&args[1..]),
        Some("compare") if args.len() == 3 => compare(&args[1], &args[2]),
        Some("scan") if args.len() >= 2 => scan(&args[1..]).await,
        _ => {
            eprintln!("{USAGE}");
            return ExitCode::from(2);
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config() -> Result<PipelineConfig> {
    match std::env::var_os("ICON_DEDUP_CONFIG") {
        Some(path) => PipelineConfig::load(path),
        None => Ok(PipelineConfig::default()),
    }
}

fn parse_count(arg: &str, what: &str) -> Result<usize> {
    arg.parse()
        .map_err(|_| icon_dedup::IconError::Config(format!("{what} must be a positive integer, got {arg:?}")))
}

fn points(args: &[String]) -> Result<()> {
    let n = parse_count(&args[0], "n")?;
    let icon_side = match args.get(1) {
        Some(side) => parse_count(side, "icon_side")?,
        None => load_config()?.icon.icon_side,
    };
    let selected = select_points(n, icon_side)?;
    for p in &selected {
        println!("{{ x = {}, y = {} }},", p.x, p.y);
    }
    info!(
        n,
        icon_side,
        min_distance = min_pairwise_distance(&selected),
        "points selected"
    );
    Ok(())
}

fn compare(path_a: &str, path_b: &str) -> Result<()> {
    let pipeline = IconPipeline::new(load_config()?)?;
    let a = open_icon(path_a, &pipeline.config().icon)?;
    let b = open_icon(path_b, &pipeline.config().icon)?;

    let (m1, m2, m3) = euclidean_metrics(&a, &b)?;
    println!("proportion delta: {:.4}", proportion_metric(a.original_size(), b.original_size()));
    println!("euclidean (y, cb, cr): {m1:.0} {m2:.0} {m3:.0}");
    println!(
        "central hashes: {} {}",
        pipeline.central_hash(&a)?,
        pipeline.central_hash(&b)?
    );
    println!("similar: {}", pipeline.similar(&a, &b));
    Ok(())
}

async fn scan(paths: &[String]) -> Result<()> {
    let parallel = ParallelPipeline::new(load_config()?)?;
    let window = parallel.worker_count() * SCAN_PATHS_PER_WORKER;

    let mut table = HashTable::new();
    let mut icons: HashMap<u64, Icon> = HashMap::new();
    let mut indexed = 0usize;
    for (batch_idx, batch) in paths.chunks(window).enumerate() {
        let inputs: Vec<PathBuf> = batch.iter().map(PathBuf::from).collect();
        let results = parallel.fingerprint_files(inputs).await;
        for (offset, (path, result)) in batch.iter().zip(results).enumerate() {
            let id = (batch_idx * window + offset) as u64;
            let fingerprint = match result {
                Ok(fingerprint) => fingerprint,
                Err(e) => {
                    warn!("Skipping {}: {}", path, e);
                    continue;
                }
            };
            let duplicates = parallel.pipeline().candidates(&fingerprint.icon, &table, &icons)?;
            for other in duplicates {
                println!("{}\t{}", paths[other as usize], path);
            }
            parallel.pipeline().record(&mut table, &fingerprint, id);
            icons.insert(id, fingerprint.icon);
            indexed += 1;
        }
    }
    info!(files = paths.len(), indexed, keys = table.len(), "scan finished");
    Ok(())
}
