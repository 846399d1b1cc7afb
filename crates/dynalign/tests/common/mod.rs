//! Common test utilities for dynalign integration tests
//!
//! Builds tiny Standard MIDI Files and on-disk datasets in temp dirs.

#![allow(dead_code)]

use std::path::Path;

/// Ticks per quarter note. With no tempo event (120 BPM) one tick is
/// 1/960 s, so 480 ticks are half a second.
pub const PPQ: u16 = 480;

/// A note in ticks: (pitch, start, end, velocity).
pub type TickNote = (u8, u32, u32, u8);

fn push_vlq(buf: &mut Vec<u8>, mut value: u32) {
    let mut bytes = vec![(value & 0x7F) as u8];
    value >>= 7;
    while value > 0 {
        bytes.push(((value & 0x7F) as u8) | 0x80);
        value >>= 7;
    }
    bytes.reverse();
    buf.extend_from_slice(&bytes);
}

/// Format 0 file holding `notes` on channel 0.
pub fn smf(notes: &[TickNote]) -> Vec<u8> {
    // (tick, note-offs first, status, pitch, velocity)
    let mut events: Vec<(u32, u8, u8, u8, u8)> = Vec::new();
    for &(pitch, start, end, velocity) in notes {
        events.push((start, 1, 0x90, pitch, velocity));
        events.push((end, 0, 0x80, pitch, 0));
    }
    events.sort_by_key(|e| (e.0, e.1));

    let mut track = Vec::new();
    let mut last = 0;
    for (tick, _, status, pitch, velocity) in events {
        push_vlq(&mut track, tick - last);
        track.extend_from_slice(&[status, pitch, velocity]);
        last = tick;
    }
    track.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);

    let mut buf = Vec::new();
    buf.extend_from_slice(b"MThd");
    buf.extend_from_slice(&6u32.to_be_bytes());
    buf.extend_from_slice(&0u16.to_be_bytes());
    buf.extend_from_slice(&1u16.to_be_bytes());
    buf.extend_from_slice(&PPQ.to_be_bytes());
    buf.extend_from_slice(b"MTrk");
    buf.extend_from_slice(&(track.len() as u32).to_be_bytes());
    buf.extend_from_slice(&track);
    buf
}

/// Four quarter notes C D E F, half a second each.
pub fn score() -> Vec<u8> {
    smf(&[
        (60, 0, 480, 64),
        (62, 480, 960, 64),
        (64, 960, 1440, 64),
        (65, 1440, 1920, 64),
    ])
}

/// The score played at a slower tempo with the E left out.
pub fn performance() -> Vec<u8> {
    smf(&[
        (60, 0, 480, 50),
        (62, 720, 1200, 70),
        (65, 2160, 2640, 90),
    ])
}

pub const PERFORMANCE_BEATS: [f64; 4] = [0.0, 0.75, 1.5, 2.25];
pub const SCORE_BEATS: [f64; 4] = [0.0, 0.5, 1.0, 1.5];

/// Table expected from aligning [`performance`] to [`score`].
pub const EXPECTED_TABLE: &str = "60\t0.0\tTrue\t50\t0\t0.5\t0.5\t1\n\
62\t0.5\tTrue\t70\t1\t0.5\t0.5\t1\n\
64\t1.0\tFalse\t70\t2\t0.375\t0.5\t1\n\
65\t1.5\tTrue\t90\t3\t0.5\t0.5\t1";

pub fn write(root: &Path, relative: &str, contents: impl AsRef<[u8]>) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

/// A dataset with four performances:
///
/// - `Bach/Prelude/Perf01.mid`: aligned, writes [`EXPECTED_TABLE`]
/// - `Bach/Prelude/Perf02.mid`: flagged unaligned
/// - `Bach/Prelude/Perf03.mid`: missing from the annotations
/// - `Bach/Silence/Perf01.mid`: empty score
pub fn write_dataset(root: &Path) {
    write(root, "Bach/Prelude/midi_score.mid", score());
    write(root, "Bach/Prelude/Perf01.mid", performance());
    write(root, "Bach/Prelude/Perf02.mid", performance());
    write(root, "Bach/Prelude/Perf03.mid", performance());
    write(root, "Bach/Silence/midi_score.mid", smf(&[]));
    write(root, "Bach/Silence/Perf01.mid", performance());

    write(
        root,
        "metadata.csv",
        "composer,title,midi_score,midi_performance\n\
         Bach,Prelude,Bach/Prelude/midi_score.mid,Bach/Prelude/Perf01.mid\n\
         Bach,Prelude,Bach/Prelude/midi_score.mid,Bach/Prelude/Perf02.mid\n\
         Bach,Prelude,Bach/Prelude/midi_score.mid,Bach/Prelude/Perf03.mid\n\
         Bach,Silence,Bach/Silence/midi_score.mid,Bach/Silence/Perf01.mid\n",
    );

    let aligned = serde_json::json!({
        "score_and_performance_aligned": true,
        "performance_beats": PERFORMANCE_BEATS,
        "midi_score_beats": SCORE_BEATS,
    });
    let annotations = serde_json::json!({
        "Bach/Prelude/Perf01.mid": aligned.clone(),
        "Bach/Prelude/Perf02.mid": {
            "score_and_performance_aligned": false,
            "performance_beats": PERFORMANCE_BEATS,
            "midi_score_beats": SCORE_BEATS,
        },
        "Bach/Silence/Perf01.mid": aligned,
    });
    write(root, "asap_annotations.json", annotations.to_string());
}
