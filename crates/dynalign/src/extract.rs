//! Turning event streams into per-pitch note occurrences.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::anomaly::{Anomaly, Stream};
use crate::note::{PerformanceNote, PerformanceNotes, ScoreNote, ScoreNotes};
use crate::stream::{EventKind, MidiEvent};
use crate::warp::TimeWarper;

/// Elapsed time since onset for every sounding pitch.
///
/// Advanced by every event's delta, note or not, so held durations span
/// intervening controller and meta events.
#[derive(Default)]
struct Sounding {
    pitches: BTreeMap<u8, f64>,
}

impl Sounding {
    fn advance(&mut self, delta: f64) {
        for elapsed in self.pitches.values_mut() {
            *elapsed += delta;
        }
    }

    fn contains(&self, pitch: u8) -> bool {
        self.pitches.contains_key(&pitch)
    }

    fn start(&mut self, pitch: u8) {
        self.pitches.insert(pitch, 0.0);
    }

    fn stop(&mut self, pitch: u8) -> Option<f64> {
        self.pitches.remove(&pitch)
    }

    fn count(&self) -> usize {
        self.pitches.len()
    }
}

fn duplicate(stream: Stream, pitch: u8, time: f64) -> Anomaly {
    warn!(%stream, pitch, time, "duplicate note-on, skipping");
    Anomaly::DuplicateNoteOn { stream, pitch, time }
}

fn orphan(stream: Stream, pitch: u8, time: f64) -> Anomaly {
    warn!(%stream, pitch, time, "note-off without note-on, skipping");
    Anomaly::OrphanNoteOff { stream, pitch, time }
}

/// Extract performance occurrences, warping each onset into score time.
pub fn extract_performance(
    events: &[MidiEvent],
    warper: &TimeWarper,
) -> (PerformanceNotes, Vec<Anomaly>) {
    let mut notes = PerformanceNotes::default();
    let mut anomalies = Vec::new();
    let mut sounding = Sounding::default();
    let mut offset = 0.0;

    for event in events {
        offset += event.delta;
        sounding.advance(event.delta);

        match event.kind {
            EventKind::NoteOn { pitch, velocity } => {
                if sounding.contains(pitch) {
                    anomalies.push(duplicate(Stream::Performance, pitch, offset));
                    continue;
                }
                let warped = warper.warp(offset);
                notes
                    .by_pitch
                    .entry(pitch)
                    .or_default()
                    .push(PerformanceNote::new(pitch, offset, warped, velocity));
                sounding.start(pitch);
            }
            EventKind::NoteOff { pitch } => {
                let Some(held) = sounding.stop(pitch) else {
                    anomalies.push(orphan(Stream::Performance, pitch, offset));
                    continue;
                };
                if let Some(note) = notes.by_pitch.get_mut(&pitch).and_then(|v| v.last_mut()) {
                    note.held = held;
                    note.closed = true;
                }
            }
            EventKind::Other => {}
        }
    }

    for &pitch in sounding.pitches.keys() {
        if let Some(note) = notes.by_pitch.get(&pitch).and_then(|v| v.last()) {
            debug!(pitch, onset = note.raw_onset, "performance note never released");
            anomalies.push(Anomaly::UnclosedNote {
                stream: Stream::Performance,
                pitch,
                onset: note.raw_onset,
            });
        }
    }

    (notes, anomalies)
}

/// Extract score occurrences with flat indices and polyphony counts.
pub fn extract_score(events: &[MidiEvent]) -> (ScoreNotes, Vec<Anomaly>) {
    let mut notes = ScoreNotes::default();
    let mut anomalies = Vec::new();
    let mut sounding = Sounding::default();
    let mut offset = 0.0;

    for event in events {
        offset += event.delta;
        sounding.advance(event.delta);

        match event.kind {
            EventKind::NoteOn { pitch, .. } => {
                if sounding.contains(pitch) {
                    anomalies.push(duplicate(Stream::Score, pitch, offset));
                    continue;
                }
                sounding.start(pitch);
                let polyphony = sounding.count();
                let occurrences = notes.by_pitch.entry(pitch).or_default();

                // Zero-length note at the same spot: reuse its slot
                if let Some(last) = occurrences.last_mut().filter(|n| n.onset == offset) {
                    debug!(pitch, time = offset, "redundant score note, overwriting");
                    *last = ScoreNote::new(pitch, offset, last.flat_index, polyphony);
                    anomalies.push(Anomaly::RedundantScoreNote { pitch, time: offset });
                    continue;
                }

                occurrences.push(ScoreNote::new(pitch, offset, notes.velocities.len(), polyphony));
                notes.velocities.push(0);
                notes.lengths.push(0.0);
            }
            EventKind::NoteOff { pitch } => {
                let Some(held) = sounding.stop(pitch) else {
                    anomalies.push(orphan(Stream::Score, pitch, offset));
                    continue;
                };
                if let Some(note) = notes.by_pitch.get_mut(&pitch).and_then(|v| v.last_mut()) {
                    note.notated_length = Some(held);
                }
            }
            EventKind::Other => {}
        }
    }

    for &pitch in sounding.pitches.keys() {
        if let Some(note) = notes.by_pitch.get(&pitch).and_then(|v| v.last()) {
            anomalies.push(Anomaly::UnclosedNote {
                stream: Stream::Score,
                pitch,
                onset: note.onset,
            });
        }
    }

    (notes, anomalies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn identity() -> TimeWarper {
        TimeWarper::identity(vec![1.0, 2.0]).unwrap()
    }

    #[test]
    fn double_note_on_in_performance_is_dropped() {
        let events = vec![
            MidiEvent::note_on(0.0, 64, 70),
            MidiEvent::note_on(0.2, 64, 90),
            MidiEvent::note_off(0.3, 64),
        ];
        let (notes, anomalies) = extract_performance(&events, &identity());

        let played = &notes.by_pitch[&64];
        assert_eq!(played.len(), 1);
        assert_eq!(played[0].velocity, 70);
        assert!((played[0].held - 0.5).abs() < 1e-9);
        assert_eq!(
            anomalies,
            vec![Anomaly::DuplicateNoteOn {
                stream: Stream::Performance,
                pitch: 64,
                time: 0.2
            }]
        );
    }

    #[test]
    fn held_time_counts_non_note_events() {
        let events = vec![
            MidiEvent::note_on(0.5, 60, 50),
            MidiEvent::other(0.25),
            MidiEvent::other(0.25),
            MidiEvent::note_off(0.5, 60),
        ];
        let (notes, anomalies) = extract_performance(&events, &identity());
        assert!(anomalies.is_empty());
        let note = &notes.by_pitch[&60][0];
        assert_eq!(note.raw_onset, 0.5);
        assert!((note.held - 1.0).abs() < 1e-9);
        assert!(note.closed);
    }

    #[test]
    fn performance_onsets_are_warped() {
        let warper = TimeWarper::new(vec![1.0, 2.0], vec![2.0, 4.0]).unwrap();
        let events = vec![MidiEvent::note_on(1.5, 60, 50), MidiEvent::note_off(0.1, 60)];
        let (notes, _) = extract_performance(&events, &warper);
        let note = &notes.by_pitch[&60][0];
        assert_eq!(note.raw_onset, 1.5);
        assert!((note.onset - 3.0).abs() < 1e-9);
    }

    #[test]
    fn orphan_note_off_is_skipped() {
        let events = vec![MidiEvent::note_off(0.1, 72), MidiEvent::note_on(0.1, 72, 40)];
        let (notes, anomalies) = extract_score(&events);
        assert_eq!(notes.len(), 1);
        assert!(anomalies[0].is_malformed());
        assert!(matches!(anomalies[1], Anomaly::UnclosedNote { pitch: 72, .. }));
    }

    #[test]
    fn score_tracks_flat_index_and_polyphony() {
        // C-E-G chord, then a lone C
        let events = vec![
            MidiEvent::note_on(0.0, 60, 64),
            MidiEvent::note_on(0.0, 64, 64),
            MidiEvent::note_on(0.0, 67, 64),
            MidiEvent::note_off(1.0, 60),
            MidiEvent::note_off(0.0, 64),
            MidiEvent::note_off(0.0, 67),
            MidiEvent::note_on(0.0, 60, 64),
            MidiEvent::note_off(0.5, 60),
        ];
        let (notes, anomalies) = extract_score(&events);
        assert!(anomalies.is_empty());
        assert_eq!(notes.len(), 4);

        let c = &notes.by_pitch[&60];
        assert_eq!(c[0].flat_index, 0);
        assert_eq!(c[0].polyphony, 1);
        assert_eq!(c[0].notated_length, Some(1.0));
        assert_eq!(c[1].flat_index, 3);
        assert_eq!(c[1].polyphony, 1);
        assert_eq!(c[1].onset, 1.0);
        assert_eq!(notes.by_pitch[&64][0].polyphony, 2);
        assert_eq!(notes.by_pitch[&67][0].polyphony, 3);
        assert_eq!(notes.by_pitch[&67][0].flat_index, 2);
    }

    #[test]
    fn zero_length_score_note_is_overwritten() {
        let events = vec![
            MidiEvent::note_on(0.5, 62, 64),
            MidiEvent::note_off(0.0, 62),
            MidiEvent::note_on(0.0, 62, 64),
            MidiEvent::note_off(0.75, 62),
        ];
        let (notes, anomalies) = extract_score(&events);

        assert_eq!(notes.len(), 1);
        let d = &notes.by_pitch[&62];
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].flat_index, 0);
        assert_eq!(d[0].notated_length, Some(0.75));
        assert_eq!(
            anomalies,
            vec![Anomaly::RedundantScoreNote { pitch: 62, time: 0.5 }]
        );
    }

    #[test]
    fn unreleased_score_note_keeps_no_length() {
        let events = vec![MidiEvent::note_on(0.0, 48, 64), MidiEvent::other(2.0)];
        let (notes, anomalies) = extract_score(&events);
        assert_eq!(notes.by_pitch[&48][0].notated_length, None);
        assert_eq!(
            anomalies,
            vec![Anomaly::UnclosedNote {
                stream: Stream::Score,
                pitch: 48,
                onset: 0.0
            }]
        );
    }

    #[test]
    fn every_accepted_note_on_yields_one_occurrence() {
        let events: Vec<MidiEvent> = (0..16u8)
            .flat_map(|i| {
                [
                    MidiEvent::note_on(0.1, 50 + i % 4, 64),
                    MidiEvent::note_off(0.1, 50 + i % 4),
                ]
            })
            .collect();
        let (notes, _) = extract_score(&events);
        assert_eq!(notes.len(), 16);
        assert_eq!(notes.iter().count(), 16);
    }
}
