//! CLI command implementations

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use dynaconf::{ConfigSources, DynaConfig};
use dynalign::{
    align_performance, run_batch, to_tsv, write_table, AlignOutcome, BatchOptions, Dataset, Outcome,
};
use tracing::info;

use crate::params::align_params;

fn load_dataset(config: &DynaConfig, dataset_dir: Option<PathBuf>) -> Result<Dataset> {
    let root = dataset_dir.unwrap_or_else(|| config.paths.dataset_dir.clone());
    Dataset::load(
        &root,
        &config.paths.metadata_file,
        &config.paths.annotations_file,
    )
    .with_context(|| format!("Failed to load dataset from {}", root.display()))
}

/// Align every performance in the metadata table and print a summary.
///
/// Individual performances that fail are reported, not fatal.
pub fn batch(
    config: &DynaConfig,
    dataset_dir: Option<PathBuf>,
    out_dir: Option<PathBuf>,
    jobs: Option<usize>,
) -> Result<()> {
    let dataset = load_dataset(config, dataset_dir)?;

    let options = BatchOptions {
        out_dir: out_dir.unwrap_or_else(|| config.paths.output_dir.clone()),
        extension: config.paths.output_extension.clone(),
        workers: jobs.unwrap_or(config.batch.workers),
        params: align_params(config),
    };
    info!(
        performances = dataset.metadata.len(),
        out_dir = %options.out_dir.display(),
        "starting batch"
    );

    let report = run_batch(&dataset, &options);

    for performance in &report.performances {
        if let Outcome::Failed(e) = &performance.outcome {
            eprintln!("failed: {}: {}", performance.performance, e);
        }
    }
    println!("written: {}", report.written());
    println!("skipped: {}", report.skipped());
    println!("failed: {}", report.failed());
    println!("missing notes: {}", report.missing_notes());

    Ok(())
}

/// Align a single performance from the dataset.
///
/// The table goes to `out` when given, to stdout otherwise.
pub fn align(
    config: &DynaConfig,
    performance: &str,
    dataset_dir: Option<PathBuf>,
    out: Option<&Path>,
    report: bool,
) -> Result<()> {
    let dataset = load_dataset(config, dataset_dir)?;
    let Some(row) = dataset.row(performance) else {
        bail!(
            "Performance '{}' is not listed in {}",
            performance,
            config.paths.metadata_file.display()
        );
    };

    let outcome = align_performance(&dataset, row, &align_params(config))
        .with_context(|| format!("Failed to align {}", performance))?;

    let alignment = match outcome {
        AlignOutcome::Aligned(alignment) => alignment,
        AlignOutcome::Skipped(reason) => {
            eprintln!("skipped {}: {}", performance, reason);
            return Ok(());
        }
    };

    match out {
        Some(path) => {
            write_table(path, &alignment.rows)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), rows = alignment.rows.len(), "wrote table");
        }
        None => println!("{}", to_tsv(&alignment.rows)),
    }

    if report {
        let summary = serde_json::json!({
            "stats": alignment.stats,
            "anomalies": alignment.anomalies,
        });
        eprintln!("{}", serde_json::to_string_pretty(&summary)?);
    }

    Ok(())
}

/// Print the effective configuration and where it came from.
pub fn show_config(config: &DynaConfig, sources: &ConfigSources) -> Result<()> {
    if sources.files.is_empty() {
        println!("# No config files found, using defaults");
    }
    for file in &sources.files {
        println!("# Loaded from: {}", file.display());
    }
    for var in &sources.env_overrides {
        println!("# Overridden by: {}", var);
    }
    println!();
    print!("{}", config.to_toml());
    Ok(())
}
