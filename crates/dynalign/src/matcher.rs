//! Greedy per-pitch matching of score occurrences to performance occurrences.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::anomaly::Anomaly;
use crate::note::{PerformanceNote, PerformanceNotes, ScoreNotes};

/// Parameters controlling note matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchParams {
    /// Largest warped-onset distance (seconds) accepted as a match. Default: 0.5.
    pub tolerance: f64,
    /// Skip performance notes already claimed by another score note. Default: false.
    pub exclusive: bool,
}

impl Default for MatchParams {
    fn default() -> Self {
        Self {
            tolerance: 0.5,
            exclusive: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchStats {
    pub matched: usize,
    pub unmatched: usize,
    /// Zero-length performance candidates passed over.
    pub zero_length_skipped: usize,
    /// Performance notes matched to more than one score note.
    pub reused: usize,
}

/// Performance indices of one pitch, nearest to `onset` first.
///
/// The sort is stable, so equal distances keep performance order.
fn rank_candidates(played: &[PerformanceNote], onset: f64) -> Vec<(usize, f64)> {
    let mut ranked: Vec<(usize, f64)> = played
        .iter()
        .enumerate()
        .map(|(i, p)| (i, (p.onset - onset).abs()))
        .collect();
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    ranked
}

/// Match every score occurrence to the nearest usable performance
/// occurrence of the same pitch.
pub fn match_notes(
    score: &mut ScoreNotes,
    performance: &mut PerformanceNotes,
    params: &MatchParams,
) -> (MatchStats, Vec<Anomaly>) {
    let mut stats = MatchStats::default();
    let mut anomalies = Vec::new();

    for (&pitch, occurrences) in score.by_pitch.iter_mut() {
        let Some(played) = performance.by_pitch.get_mut(&pitch) else {
            info!(pitch, occurrences = occurrences.len(), "pitch never played");
            anomalies.push(Anomaly::MissingPitch {
                pitch,
                occurrences: occurrences.len(),
            });
            continue;
        };

        for note in occurrences.iter_mut() {
            for (idx, distance) in rank_candidates(played, note.onset) {
                if distance > params.tolerance {
                    // Sorted by distance: nothing closer remains
                    break;
                }
                let candidate = &mut played[idx];
                if candidate.held == 0.0 {
                    debug!(pitch, onset = candidate.onset, "skipping zero-length candidate");
                    stats.zero_length_skipped += 1;
                    continue;
                }
                if params.exclusive && candidate.matched {
                    continue;
                }

                candidate.matched = true;
                candidate.match_count += 1;
                note.matched = true;
                note.velocity = candidate.velocity;
                note.performed_length = candidate.held;
                score.velocities[note.flat_index] = candidate.velocity;
                score.lengths[note.flat_index] = candidate.held;
                break;
            }
        }
    }

    stats.matched = score.iter().filter(|n| n.matched).count();
    stats.unmatched = score.len() - stats.matched;
    stats.reused = performance.reused();
    (stats, anomalies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::{PerformanceNote, ScoreNote};
    use pretty_assertions::assert_eq;

    fn score_of(notes: &[(u8, f64)]) -> ScoreNotes {
        let mut score = ScoreNotes::default();
        for (i, &(pitch, onset)) in notes.iter().enumerate() {
            let mut note = ScoreNote::new(pitch, onset, i, 1);
            note.notated_length = Some(0.5);
            score.by_pitch.entry(pitch).or_default().push(note);
            score.velocities.push(0);
            score.lengths.push(0.0);
        }
        score
    }

    fn performance_of(notes: &[(u8, f64, u8, f64)]) -> PerformanceNotes {
        let mut perf = PerformanceNotes::default();
        for &(pitch, onset, velocity, held) in notes {
            let mut note = PerformanceNote::new(pitch, onset, onset, velocity);
            note.held = held;
            note.closed = held > 0.0;
            perf.by_pitch.entry(pitch).or_default().push(note);
        }
        perf
    }

    #[test]
    fn picks_the_nearest_candidate() {
        let mut score = score_of(&[(60, 1.0)]);
        let mut perf = performance_of(&[(60, 0.7, 40, 0.3), (60, 1.1, 80, 0.4)]);
        let (stats, _) = match_notes(&mut score, &mut perf, &MatchParams::default());

        let note = &score.by_pitch[&60][0];
        assert!(note.matched);
        assert_eq!(note.velocity, 80);
        assert_eq!(note.performed_length, 0.4);
        assert_eq!(score.velocities, vec![80]);
        assert_eq!(score.lengths, vec![0.4]);
        assert!(perf.by_pitch[&60][1].matched);
        assert!(!perf.by_pitch[&60][0].matched);
        assert_eq!(stats.matched, 1);
    }

    #[test]
    fn never_matches_beyond_tolerance() {
        let mut score = score_of(&[(60, 1.0)]);
        let mut perf = performance_of(&[(60, 1.6, 80, 0.4)]);
        let (stats, _) = match_notes(&mut score, &mut perf, &MatchParams::default());
        assert!(!score.by_pitch[&60][0].matched);
        assert_eq!(stats.unmatched, 1);
    }

    #[test]
    fn tolerance_is_configurable() {
        let mut score = score_of(&[(60, 1.0)]);
        let mut perf = performance_of(&[(60, 1.6, 80, 0.4)]);
        let params = MatchParams {
            tolerance: 1.0,
            ..MatchParams::default()
        };
        match_notes(&mut score, &mut perf, &params);
        assert!(score.by_pitch[&60][0].matched);
    }

    #[test]
    fn zero_length_candidates_are_passed_over() {
        let mut score = score_of(&[(60, 1.0)]);
        let mut perf = performance_of(&[(60, 1.0, 99, 0.0), (60, 1.2, 70, 0.3)]);
        let (stats, _) = match_notes(&mut score, &mut perf, &MatchParams::default());
        assert_eq!(score.by_pitch[&60][0].velocity, 70);
        assert_eq!(stats.zero_length_skipped, 1);
    }

    #[test]
    fn equal_distances_prefer_performance_order() {
        let mut score = score_of(&[(60, 1.0)]);
        let mut perf = performance_of(&[(60, 0.75, 10, 0.3), (60, 1.25, 20, 0.3)]);
        match_notes(&mut score, &mut perf, &MatchParams::default());
        assert_eq!(score.by_pitch[&60][0].velocity, 10);
    }

    #[test]
    fn missing_pitch_is_reported() {
        let mut score = score_of(&[(61, 0.0), (61, 1.0)]);
        let mut perf = performance_of(&[(60, 0.0, 50, 0.2)]);
        let (stats, anomalies) = match_notes(&mut score, &mut perf, &MatchParams::default());
        assert_eq!(
            anomalies,
            vec![Anomaly::MissingPitch {
                pitch: 61,
                occurrences: 2
            }]
        );
        assert_eq!(stats.unmatched, 2);
    }

    #[test]
    fn shared_candidate_is_reused_by_default() {
        // Two score notes, one played note between them
        let mut score = score_of(&[(60, 1.0), (60, 1.25)]);
        let mut perf = performance_of(&[(60, 1.1, 64, 0.2)]);
        let (stats, _) = match_notes(&mut score, &mut perf, &MatchParams::default());

        assert!(score.by_pitch[&60].iter().all(|n| n.matched));
        assert_eq!(perf.by_pitch[&60][0].match_count, 2);
        assert_eq!(stats.reused, 1);
    }

    #[test]
    fn exclusive_matching_claims_each_candidate_once() {
        let mut score = score_of(&[(60, 1.0), (60, 1.25)]);
        let mut perf = performance_of(&[(60, 1.1, 64, 0.2)]);
        let params = MatchParams {
            exclusive: true,
            ..MatchParams::default()
        };
        let (stats, _) = match_notes(&mut score, &mut perf, &params);

        assert!(score.by_pitch[&60][0].matched);
        assert!(!score.by_pitch[&60][1].matched);
        assert_eq!(perf.by_pitch[&60][0].match_count, 1);
        assert_eq!(stats.reused, 0);
    }

    #[test]
    fn matched_notes_share_their_pitch() {
        let mut score = score_of(&[(60, 0.0), (62, 0.0), (64, 0.5)]);
        let mut perf = performance_of(&[(62, 0.05, 30, 0.2), (60, 0.1, 40, 0.2), (64, 0.4, 50, 0.2)]);
        match_notes(&mut score, &mut perf, &MatchParams::default());
        for note in score.iter() {
            let played = &perf.by_pitch[&note.pitch];
            assert!(played.iter().any(|p| p.matched && p.velocity == note.velocity));
        }
    }
}
