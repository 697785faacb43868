use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, anyhow};
use crid_engine::config::MIN_COHORT;
use crid_engine::config::run::USAGE;
use crid_engine::{
    CridEngine, CridRecord, EngineConfig, RunMode, RunOptions, ValidationReport, WeightTable,
    load_observations, load_weights, read_crid_records, write_crid_records,
};
use log::{info, warn};

#[global_allocator]
static ALLOC: snmalloc_rs::SnMalloc = snmalloc_rs::SnMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(options) = RunOptions::parse(&args).context("Invalid command line")? else {
        println!("{USAGE}");
        return Ok(());
    };

    let start = Instant::now();
    info!(
        "Starting CRID run ({:?}, window {}, {} CPUs available)",
        options.mode,
        options.volatility_window.periods(),
        num_cpus::get()
    );

    let report = match options.mode {
        RunMode::ValidateOnly => {
            let records = read_crid_records(&options.output).with_context(|| {
                format!("Failed to read CRID output {}", options.output.display())
            })?;
            ValidationReport::from_records(&records, None, MIN_COHORT)
        }
        RunMode::Materialize | RunMode::DryRun => {
            let (records, weights) = compute(&options).await?;
            if options.mode == RunMode::DryRun {
                info!("Dry run: {} records computed, nothing written", records.len());
                ValidationReport::from_records(&records, Some(&weights), MIN_COHORT)
            } else {
                write_crid_records(&options.output, &records).with_context(|| {
                    format!("Failed to write CRID output {}", options.output.display())
                })?;
                let written = read_crid_records(&options.output)
                    .context("Failed to read back the written CRID output")?;
                ValidationReport::from_records(&written, Some(&weights), MIN_COHORT)
            }
        }
    };

    println!("{report}");
    report.log_warnings();
    if let Some(path) = &options.report_json {
        report
            .write_json(path)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        info!("Validation report written to {}", path.display());
    }

    if report.has_warnings() {
        warn!("Run finished with {} warnings", report.warnings.len());
    }
    info!("CRID run completed in {:?}", start.elapsed());
    Ok(())
}

/// Load both inputs concurrently, then run the engine
async fn compute(options: &RunOptions) -> anyhow::Result<(Vec<CridRecord>, WeightTable)> {
    let observations_path = required(options.observations.as_ref(), "--observations")?;
    let weights_path = required(options.weights.as_ref(), "--weights")?;

    let load_start = Instant::now();
    let observations_task = tokio::task::spawn_blocking(move || load_observations(&observations_path));
    let weights_task = tokio::task::spawn_blocking(move || load_weights(&weights_path));
    let (observations, weights) = tokio::try_join!(observations_task, weights_task)
        .map_err(|e| anyhow!("Task join error: {}", e))?;
    let observations = observations.context("Failed to load measure observations")?;
    let weights = weights.context("Failed to load weight definitions")?;
    info!(
        "Loaded {} observations and {} weights in {:?}",
        observations.len(),
        weights.definitions().len(),
        load_start.elapsed()
    );

    let config = EngineConfig::builder()
        .volatility_window(options.volatility_window)
        .use_parallel(!options.sequential)
        .show_progress(options.progress)
        .build()?;
    let engine = CridEngine::new(config, weights);

    let run = tokio::task::block_in_place(|| engine.run(&observations));
    info!(
        "Computed {} CRID records from {} observations across {} peer cohorts",
        run.records.len(),
        run.diagnostics.observations,
        run.cohorts
    );

    Ok((run.records, *engine.weights()))
}

fn required(path: Option<&PathBuf>, flag: &str) -> anyhow::Result<PathBuf> {
    path.cloned()
        .ok_or_else(|| anyhow!("{flag} is required for this run mode"))
}
