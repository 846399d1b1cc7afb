use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One notated note instance from the score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreNote {
    pub pitch: u8,
    /// Onset in score seconds.
    pub onset: f64,
    pub matched: bool,
    /// Performed velocity when matched, window estimate otherwise.
    pub velocity: u8,
    /// Position in the chronological list of all score occurrences.
    pub flat_index: usize,
    /// Held duration of the matched performance note, or its estimate.
    pub performed_length: f64,
    /// Notated duration; `None` when the note-off never arrived.
    pub notated_length: Option<f64>,
    /// Pitches sounding at onset, this one included.
    pub polyphony: usize,
    /// Velocity and length came from the gap filler.
    pub estimated: bool,
    /// False when the notated length could not be resolved.
    pub reliable: bool,
}

impl ScoreNote {
    pub fn new(pitch: u8, onset: f64, flat_index: usize, polyphony: usize) -> Self {
        Self {
            pitch,
            onset,
            matched: false,
            velocity: 0,
            flat_index,
            performed_length: 0.0,
            notated_length: None,
            polyphony,
            estimated: false,
            reliable: true,
        }
    }
}

/// One played note instance from the performance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceNote {
    pub pitch: u8,
    /// Onset in performance seconds.
    pub raw_onset: f64,
    /// Onset warped into score seconds.
    pub onset: f64,
    pub velocity: u8,
    /// Seconds held; 0 until the note-off is seen.
    pub held: f64,
    pub closed: bool,
    pub matched: bool,
    /// Number of score occurrences this note was matched to.
    pub match_count: u32,
}

impl PerformanceNote {
    pub fn new(pitch: u8, raw_onset: f64, onset: f64, velocity: u8) -> Self {
        Self {
            pitch,
            raw_onset,
            onset,
            velocity,
            held: 0.0,
            closed: false,
            matched: false,
            match_count: 0,
        }
    }
}

/// Score occurrences grouped by pitch, plus the flat chronological arrays
/// the gap filler reads from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreNotes {
    pub by_pitch: BTreeMap<u8, Vec<ScoreNote>>,
    /// Matched velocity per flat index, 0 when unmatched.
    pub velocities: Vec<u8>,
    /// Matched held duration per flat index, 0 when unmatched.
    pub lengths: Vec<f64>,
}

impl ScoreNotes {
    /// Number of distinct occurrences (flat indices handed out).
    pub fn len(&self) -> usize {
        self.velocities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.velocities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScoreNote> {
        self.by_pitch.values().flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ScoreNote> {
        self.by_pitch.values_mut().flatten()
    }

    pub fn unmatched(&self) -> usize {
        self.iter().filter(|n| !n.matched).count()
    }
}

/// Performance occurrences grouped by pitch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceNotes {
    pub by_pitch: BTreeMap<u8, Vec<PerformanceNote>>,
}

impl PerformanceNotes {
    pub fn len(&self) -> usize {
        self.by_pitch.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &PerformanceNote> {
        self.by_pitch.values().flatten()
    }

    /// Performance notes claimed by more than one score occurrence.
    pub fn reused(&self) -> usize {
        self.iter().filter(|n| n.match_count > 1).count()
    }
}
