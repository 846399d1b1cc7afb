//! Estimating dynamics for score notes that found no performance partner.
//!
//! Estimates read the flat chronological arrays around the note's flat
//! index. Unmatched neighbours contribute zeros, and estimates are never
//! written back, so one estimate cannot feed another.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::anomaly::Anomaly;
use crate::note::ScoreNotes;

/// How a window sum is turned into an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Divisor {
    /// Divide by the number of neighbours inside the array bounds.
    Mean,
    /// Divide by a constant regardless of clipping.
    Fixed(f64),
}

/// A neighbourhood around a flat index, the index itself excluded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub before: usize,
    pub after: usize,
    pub divisor: Divisor,
}

impl Window {
    /// Estimate from `values` around `index`; 0 when the window is empty.
    pub fn estimate<T: Copy + Into<f64>>(&self, values: &[T], index: usize) -> f64 {
        let start = index.saturating_sub(self.before);
        let end = index.saturating_add(self.after).saturating_add(1).min(values.len());

        let mut sum = 0.0;
        let mut count = 0usize;
        for (i, value) in values.iter().enumerate().take(end).skip(start) {
            if i == index {
                continue;
            }
            sum += (*value).into();
            count += 1;
        }

        match self.divisor {
            Divisor::Mean if count == 0 => 0.0,
            Divisor::Mean => sum / count as f64,
            Divisor::Fixed(d) if d > 0.0 => sum / d,
            Divisor::Fixed(_) => 0.0,
        }
    }
}

/// Windows used by [`fill_gaps`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapFillParams {
    /// Default: 3 before, 3 after, mean.
    pub velocity: Window,
    /// Default: 2 before, 2 after, sum / 4.
    pub length: Window,
}

impl Default for GapFillParams {
    fn default() -> Self {
        Self {
            velocity: Window {
                before: 3,
                after: 3,
                divisor: Divisor::Mean,
            },
            length: Window {
                before: 2,
                after: 2,
                divisor: Divisor::Fixed(4.0),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GapFillStats {
    pub estimated: usize,
    pub unreliable: usize,
}

/// Fill velocity and performed length of every unmatched score note, and
/// flag notes whose notated length was never resolved.
pub fn fill_gaps(score: &mut ScoreNotes, params: &GapFillParams) -> (GapFillStats, Vec<Anomaly>) {
    let mut stats = GapFillStats::default();
    let mut anomalies = Vec::new();

    for note in score.by_pitch.values_mut().flatten() {
        if !note.matched {
            let velocity = params.velocity.estimate(&score.velocities, note.flat_index);
            note.velocity = velocity.round_ties_even().clamp(0.0, 127.0) as u8;
            note.performed_length = params.length.estimate(&score.lengths, note.flat_index);
            note.estimated = true;
            stats.estimated += 1;
        }

        if note.notated_length.is_none() {
            warn!(pitch = note.pitch, onset = note.onset, "notated length never resolved");
            note.reliable = false;
            stats.unreliable += 1;
            anomalies.push(Anomaly::UnresolvedDuration {
                pitch: note.pitch,
                onset: note.onset,
            });
        }
    }

    (stats, anomalies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::ScoreNote;

    fn window(before: usize, after: usize, divisor: Divisor) -> Window {
        Window {
            before,
            after,
            divisor,
        }
    }

    #[test]
    fn mean_skips_the_center_and_clips_at_edges() {
        let values: [u8; 5] = [10, 20, 0, 40, 50];
        let w = window(3, 3, Divisor::Mean);
        assert_eq!(w.estimate(&values, 2), 30.0);
        // Only 20, 0, 40 exist to the right of index 0
        assert_eq!(w.estimate(&values, 0), 20.0);
    }

    #[test]
    fn fixed_divisor_ignores_clipping() {
        let values = [1.0, 1.0, 0.0, 1.0, 1.0];
        let w = window(2, 2, Divisor::Fixed(4.0));
        assert_eq!(w.estimate(&values, 2), 1.0);
        assert_eq!(w.estimate(&values, 0), 0.25);
    }

    #[test]
    fn empty_window_estimates_zero() {
        let values: [u8; 1] = [0];
        assert_eq!(window(3, 3, Divisor::Mean).estimate(&values, 0), 0.0);
        assert_eq!(window(0, 0, Divisor::Fixed(6.0)).estimate(&values, 0), 0.0);
    }

    fn score_with(velocities: &[u8], missing: usize) -> ScoreNotes {
        let mut score = ScoreNotes::default();
        for (i, &v) in velocities.iter().enumerate() {
            let pitch = 60 + i as u8;
            let mut note = ScoreNote::new(pitch, i as f64, i, 1);
            note.notated_length = Some(0.5);
            if i != missing {
                note.matched = true;
                note.velocity = v;
                note.performed_length = 0.4;
                score.velocities.push(v);
                score.lengths.push(0.4);
            } else {
                score.velocities.push(0);
                score.lengths.push(0.0);
            }
            score.by_pitch.entry(pitch).or_default().push(note);
        }
        score
    }

    #[test]
    fn unmatched_note_takes_neighbour_dynamics() {
        let mut score = score_with(&[60, 62, 64, 0, 66, 68, 70], 3);
        let (stats, anomalies) = fill_gaps(&mut score, &GapFillParams::default());

        let note = &score.by_pitch[&63][0];
        assert!(note.estimated);
        assert!(!note.matched);
        // (60 + 62 + 64 + 66 + 68 + 70) / 6
        assert_eq!(note.velocity, 65);
        // (0.4 * 4) / 4
        assert!((note.performed_length - 0.4).abs() < 1e-9);
        assert_eq!(stats.estimated, 1);
        assert!(anomalies.is_empty());
    }

    #[test]
    fn rounding_is_half_to_even() {
        // Mean of 1 and 4 is 2.5
        let mut score = score_with(&[1, 0, 4], 1);
        fill_gaps(&mut score, &GapFillParams::default());
        assert_eq!(score.by_pitch[&61][0].velocity, 2);
    }

    #[test]
    fn lone_unmatched_note_gets_zero_velocity() {
        let mut score = score_with(&[0], 0);
        fill_gaps(&mut score, &GapFillParams::default());
        let note = &score.by_pitch[&60][0];
        assert_eq!(note.velocity, 0);
        assert_eq!(note.performed_length, 0.0);
    }

    #[test]
    fn estimates_do_not_cascade() {
        // Two adjacent gaps only see matched neighbours' stored values
        let mut score = score_with(&[90, 0, 0, 90], 1);
        score.by_pitch.get_mut(&62).unwrap()[0].matched = false;
        score.velocities[2] = 0;
        fill_gaps(&mut score, &GapFillParams::default());
        assert_eq!(score.velocities, vec![90, 0, 0, 90]);
        assert_eq!(score.by_pitch[&61][0].velocity, 60);
        assert_eq!(score.by_pitch[&62][0].velocity, 60);
    }

    #[test]
    fn unresolved_length_is_flagged_not_estimated() {
        let mut score = score_with(&[50, 50], 5);
        score.by_pitch.get_mut(&61).unwrap()[0].notated_length = None;
        let (stats, anomalies) = fill_gaps(&mut score, &GapFillParams::default());

        let note = &score.by_pitch[&61][0];
        assert!(!note.reliable);
        assert_eq!(note.notated_length, None);
        assert_eq!(note.velocity, 50);
        assert_eq!(stats.unreliable, 1);
        assert_eq!(
            anomalies,
            vec![Anomaly::UnresolvedDuration {
                pitch: 61,
                onset: 1.0
            }]
        );
    }
}
