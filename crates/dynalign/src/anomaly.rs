//! Recoverable irregularities found while aligning one performance.
//!
//! None of these abort processing. Each is logged where it is detected and
//! collected so callers can count or inspect them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which of the two recordings an event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stream {
    Score,
    Performance,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stream::Score => f.write_str("score"),
            Stream::Performance => f.write_str("performance"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anomaly {
    /// Note-on for a pitch that is already sounding; the event was skipped.
    DuplicateNoteOn { stream: Stream, pitch: u8, time: f64 },
    /// Note-off for a pitch that is not sounding; the event was skipped.
    OrphanNoteOff { stream: Stream, pitch: u8, time: f64 },
    /// Score note-on at the same onset as the previous occurrence of its
    /// pitch; the earlier zero-length occurrence was overwritten.
    RedundantScoreNote { pitch: u8, time: f64 },
    /// Still sounding when the stream ended.
    UnclosedNote { stream: Stream, pitch: u8, onset: f64 },
    /// Score occurrence whose notated length was never resolved.
    UnresolvedDuration { pitch: u8, onset: f64 },
    /// Pitch present in the score but never played.
    MissingPitch { pitch: u8, occurrences: usize },
}

impl Anomaly {
    /// Malformed event sequences, as opposed to alignment gaps.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Anomaly::DuplicateNoteOn { .. } | Anomaly::OrphanNoteOff { .. }
        )
    }
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anomaly::DuplicateNoteOn { stream, pitch, time } => {
                write!(f, "{stream}: duplicate note-on for pitch {pitch} at {time:.3}s")
            }
            Anomaly::OrphanNoteOff { stream, pitch, time } => {
                write!(f, "{stream}: note-off without note-on for pitch {pitch} at {time:.3}s")
            }
            Anomaly::RedundantScoreNote { pitch, time } => {
                write!(f, "score: redundant zero-length note {pitch} at {time:.3}s")
            }
            Anomaly::UnclosedNote { stream, pitch, onset } => {
                write!(f, "{stream}: pitch {pitch} from {onset:.3}s never released")
            }
            Anomaly::UnresolvedDuration { pitch, onset } => {
                write!(f, "score: no note-off for pitch {pitch} at {onset:.3}s")
            }
            Anomaly::MissingPitch { pitch, occurrences } => {
                write!(f, "pitch {pitch} never played ({occurrences} score notes)")
            }
        }
    }
}
