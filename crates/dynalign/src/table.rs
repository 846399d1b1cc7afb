//! The per-performance note table handed to training-data consumers.
//!
//! One tab-separated line per score occurrence:
//! `pitch  onset  matched  velocity  flat_index  performed_length  notated_length  polyphony`

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::note::{ScoreNote, ScoreNotes};

/// Written in place of an unresolved notated length.
pub const UNRESOLVED: f64 = -1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteRow {
    pub pitch: u8,
    pub onset: f64,
    pub matched: bool,
    pub velocity: u8,
    pub flat_index: usize,
    pub performed_length: f64,
    pub notated_length: f64,
    pub polyphony: usize,
}

impl From<&ScoreNote> for NoteRow {
    fn from(note: &ScoreNote) -> Self {
        Self {
            pitch: note.pitch,
            onset: note.onset,
            matched: note.matched,
            velocity: note.velocity,
            flat_index: note.flat_index,
            performed_length: note.performed_length,
            notated_length: note.notated_length.unwrap_or(UNRESOLVED),
            polyphony: note.polyphony,
        }
    }
}

impl NoteRow {
    /// Render as one TSV line (no newline).
    pub fn to_tsv(&self) -> String {
        format!(
            "{}\t{:?}\t{}\t{}\t{}\t{:?}\t{:?}\t{}",
            self.pitch,
            self.onset,
            if self.matched { "True" } else { "False" },
            self.velocity,
            self.flat_index,
            self.performed_length,
            self.notated_length,
            self.polyphony,
        )
    }
}

/// Flatten score occurrences into rows sorted by onset, then pitch.
pub fn build_table(score: &ScoreNotes) -> Vec<NoteRow> {
    let mut rows: Vec<NoteRow> = score.iter().map(NoteRow::from).collect();
    rows.sort_by(|a, b| a.onset.total_cmp(&b.onset).then(a.pitch.cmp(&b.pitch)));
    rows
}

/// Render rows as newline-separated TSV without a trailing newline.
pub fn to_tsv(rows: &[NoteRow]) -> String {
    rows.iter().map(NoteRow::to_tsv).collect::<Vec<_>>().join("\n")
}

/// Write rows to `path`, creating parent directories.
pub fn write_table(path: &Path, rows: &[NoteRow]) -> crate::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| crate::Error::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, to_tsv(rows)).map_err(|source| crate::Error::Io {
        path: path.to_path_buf(),
        source,
    })
}
