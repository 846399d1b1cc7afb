//! Full alignment of one score/performance pair: extract → match → fill → table.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::anomaly::Anomaly;
use crate::extract::{extract_performance, extract_score};
use crate::gapfill::{fill_gaps, GapFillParams};
use crate::matcher::{match_notes, MatchParams};
use crate::note::{PerformanceNotes, ScoreNotes};
use crate::stream::{parse_events, MidiEvent};
use crate::table::{build_table, NoteRow};
use crate::warp::TimeWarper;

/// Everything tunable about one alignment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlignParams {
    pub matching: MatchParams,
    pub gap_fill: GapFillParams,
}

/// Counts summarizing one alignment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlignStats {
    pub score_notes: usize,
    pub performance_notes: usize,
    pub matched: usize,
    /// Score notes without a performance partner (gap-filled).
    pub missing: usize,
    pub reused_performance_notes: usize,
    pub unreliable: usize,
    pub malformed_events: usize,
}

/// Result of aligning one performance to its score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alignment {
    pub rows: Vec<NoteRow>,
    pub score: ScoreNotes,
    pub performance: PerformanceNotes,
    pub stats: AlignStats,
    pub anomalies: Vec<Anomaly>,
}

/// Align already-decoded event streams.
pub fn align_streams(
    score_events: &[MidiEvent],
    performance_events: &[MidiEvent],
    warper: &TimeWarper,
    params: &AlignParams,
) -> Alignment {
    let (mut performance, mut anomalies) = extract_performance(performance_events, warper);
    let (mut score, score_anomalies) = extract_score(score_events);
    anomalies.extend(score_anomalies);

    let (match_stats, match_anomalies) = match_notes(&mut score, &mut performance, &params.matching);
    anomalies.extend(match_anomalies);

    let (fill_stats, fill_anomalies) = fill_gaps(&mut score, &params.gap_fill);
    anomalies.extend(fill_anomalies);

    let rows = build_table(&score);

    let stats = AlignStats {
        score_notes: score.len(),
        performance_notes: performance.len(),
        matched: match_stats.matched,
        missing: match_stats.unmatched,
        reused_performance_notes: match_stats.reused,
        unreliable: fill_stats.unreliable,
        malformed_events: anomalies.iter().filter(|a| a.is_malformed()).count(),
    };
    debug!(?stats, "alignment complete");

    Alignment {
        rows,
        score,
        performance,
        stats,
        anomalies,
    }
}

/// Parse both MIDI files and align them.
pub fn align_midi(
    score_bytes: &[u8],
    performance_bytes: &[u8],
    warper: &TimeWarper,
    params: &AlignParams,
) -> crate::Result<Alignment> {
    let score_events = parse_events(score_bytes)?;
    let performance_events = parse_events(performance_bytes)?;
    Ok(align_streams(&score_events, &performance_events, warper, params))
}
