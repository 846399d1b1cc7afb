//! Score-to-performance MIDI alignment.
//!
//! Given a notated score, a human performance of it, and beat annotations
//! for both, `dynalign` pairs every score note with the performed note that
//! realized it and emits a per-note table of velocity and held length.
//! Score notes nobody played get estimates from their chronological
//! neighbours.

pub mod align;
pub mod anomaly;
pub mod batch;
pub mod dataset;
pub mod extract;
pub mod gapfill;
pub mod matcher;
pub mod note;
pub mod stream;
pub mod table;
pub mod warp;

use std::path::PathBuf;

pub use align::{align_midi, align_streams, AlignParams, AlignStats, Alignment};
pub use anomaly::{Anomaly, Stream};
pub use batch::{
    align_performance, process_performance, run_batch, AlignOutcome, BatchOptions, BatchReport,
    Outcome, PerformanceReport, SkipReason,
};
pub use dataset::{load_metadata, output_path, Annotation, AnnotationStore, Dataset, MetadataRow};
pub use extract::{extract_performance, extract_score};
pub use gapfill::{fill_gaps, Divisor, GapFillParams, GapFillStats, Window};
pub use matcher::{match_notes, MatchParams, MatchStats};
pub use note::{PerformanceNote, PerformanceNotes, ScoreNote, ScoreNotes};
pub use stream::{absolute_times, event_stream, parse_events, EventKind, MidiEvent};
pub use table::{build_table, to_tsv, write_table, NoteRow, UNRESOLVED};
pub use warp::{warp, TimeWarper, EPSILON};

/// Errors from alignment operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("MIDI parse error: {0}")]
    MidiParse(String),

    #[error("invalid beat annotations: {0}")]
    InvalidBeats(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read metadata {path}: {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to parse annotations {path}: {source}")]
    Annotations {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no annotation for performance {0}")]
    MissingAnnotation(String),
}

pub type Result<T> = std::result::Result<T, Error>;
