//! Batch driver: align every performance listed in the metadata table.
//!
//! Performances are independent, so they are spread across a rayon pool.
//! Nothing escalates past a single performance: skips and failures are
//! recorded in the report and the batch moves on.

use std::fmt;
use std::path::PathBuf;

use rayon::prelude::*;
use tracing::{error, info, info_span, warn};

use crate::align::{align_midi, AlignParams, AlignStats, Alignment};
use crate::dataset::{output_path, Dataset, MetadataRow};
use crate::table::write_table;

/// Why a performance produced no table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Score and performance are not verified as aligned.
    Unaligned,
    /// Alignment produced no rows.
    EmptyTable,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Unaligned => f.write_str("score and performance not aligned"),
            SkipReason::EmptyTable => f.write_str("no notes to write"),
        }
    }
}

/// Alignment of a single dataset performance, or why it was not attempted.
#[derive(Debug)]
pub enum AlignOutcome {
    Aligned(Alignment),
    Skipped(SkipReason),
}

/// Read, warp and align one metadata row.
pub fn align_performance(
    dataset: &Dataset,
    row: &MetadataRow,
    params: &AlignParams,
) -> crate::Result<AlignOutcome> {
    let annotation = dataset
        .annotations
        .get(&row.midi_performance)
        .ok_or_else(|| crate::Error::MissingAnnotation(row.midi_performance.clone()))?;

    if !annotation.score_and_performance_aligned {
        return Ok(AlignOutcome::Skipped(SkipReason::Unaligned));
    }

    let warper = annotation.warper()?;
    let performance_bytes = dataset.read(&row.midi_performance)?;
    let score_bytes = dataset.read(&row.midi_score)?;

    let alignment = align_midi(&score_bytes, &performance_bytes, &warper, params)?;
    if alignment.rows.is_empty() {
        return Ok(AlignOutcome::Skipped(SkipReason::EmptyTable));
    }
    Ok(AlignOutcome::Aligned(alignment))
}

/// Options for [`run_batch`].
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub out_dir: PathBuf,
    /// Extension of written tables. Default: "txt".
    pub extension: String,
    /// Worker threads; 0 uses rayon's default.
    pub workers: usize,
    pub params: AlignParams,
}

impl BatchOptions {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            extension: "txt".to_string(),
            workers: 0,
            params: AlignParams::default(),
        }
    }
}

#[derive(Debug)]
pub enum Outcome {
    Written { path: PathBuf, stats: AlignStats },
    Skipped(SkipReason),
    Failed(crate::Error),
}

#[derive(Debug)]
pub struct PerformanceReport {
    pub performance: String,
    pub outcome: Outcome,
}

/// Outcomes in metadata order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub performances: Vec<PerformanceReport>,
}

impl BatchReport {
    pub fn written(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Written { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed(_)))
    }

    /// Score notes that had to be estimated, over all written tables.
    pub fn missing_notes(&self) -> usize {
        self.performances
            .iter()
            .filter_map(|p| match &p.outcome {
                Outcome::Written { stats, .. } => Some(stats.missing),
                _ => None,
            })
            .sum()
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.performances.iter().filter(|p| pred(&p.outcome)).count()
    }
}

/// Align one performance and write its table.
pub fn process_performance(
    dataset: &Dataset,
    row: &MetadataRow,
    options: &BatchOptions,
) -> crate::Result<Outcome> {
    match align_performance(dataset, row, &options.params)? {
        AlignOutcome::Skipped(reason) => Ok(Outcome::Skipped(reason)),
        AlignOutcome::Aligned(alignment) => {
            let path = output_path(&options.out_dir, &row.midi_performance, &options.extension);
            write_table(&path, &alignment.rows)?;
            Ok(Outcome::Written {
                path,
                stats: alignment.stats,
            })
        }
    }
}

fn report_one(dataset: &Dataset, row: &MetadataRow, options: &BatchOptions) -> PerformanceReport {
    let _span = info_span!("align", performance = %row.midi_performance).entered();

    let outcome = match process_performance(dataset, row, options) {
        Ok(outcome) => outcome,
        Err(e) => Outcome::Failed(e),
    };

    match &outcome {
        Outcome::Written { stats, .. } => info!(
            matched = stats.matched,
            missing = stats.missing,
            "{} missing",
            stats.missing
        ),
        Outcome::Skipped(reason) => info!("skipped: {reason}"),
        Outcome::Failed(e) => error!("failed: {e}"),
    }

    PerformanceReport {
        performance: row.midi_performance.clone(),
        outcome,
    }
}

/// Process every metadata row of `dataset`.
pub fn run_batch(dataset: &Dataset, options: &BatchOptions) -> BatchReport {
    let run = || -> Vec<PerformanceReport> {
        dataset
            .metadata
            .par_iter()
            .map(|row| report_one(dataset, row, options))
            .collect()
    };

    let performances = if options.workers > 0 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(options.workers)
            .build()
        {
            Ok(pool) => pool.install(run),
            Err(e) => {
                warn!("could not build a {}-thread pool ({e}), using the global pool", options.workers);
                run()
            }
        }
    } else {
        run()
    };

    let report = BatchReport { performances };
    info!(
        written = report.written(),
        skipped = report.skipped(),
        failed = report.failed(),
        missing_notes = report.missing_notes(),
        "batch complete"
    );
    report
}
