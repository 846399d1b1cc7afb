//! Flattening a Standard MIDI File into one time-ordered event stream.
//!
//! All tracks are merged by absolute tick (ties keep track order) and
//! tick deltas are converted to seconds through the tempo map, so the
//! stream lives in the same time base as the beat annotations.

use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};

/// Default tempo when a file carries no tempo event (120 BPM).
const DEFAULT_TEMPO_USEC: u32 = 500_000;

/// What a single event means to the aligner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventKind {
    NoteOn { pitch: u8, velocity: u8 },
    /// Explicit note-off, or a note-on with velocity 0.
    NoteOff { pitch: u8 },
    Other,
}

/// One event with its delta time (seconds since the previous event).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MidiEvent {
    pub delta: f64,
    pub kind: EventKind,
}

impl MidiEvent {
    pub fn note_on(delta: f64, pitch: u8, velocity: u8) -> Self {
        let kind = if velocity == 0 {
            EventKind::NoteOff { pitch }
        } else {
            EventKind::NoteOn { pitch, velocity }
        };
        Self { delta, kind }
    }

    pub fn note_off(delta: f64, pitch: u8) -> Self {
        Self {
            delta,
            kind: EventKind::NoteOff { pitch },
        }
    }

    pub fn other(delta: f64) -> Self {
        Self {
            delta,
            kind: EventKind::Other,
        }
    }
}

/// Parse MIDI bytes into a merged, seconds-based event stream.
pub fn parse_events(midi_bytes: &[u8]) -> crate::Result<Vec<MidiEvent>> {
    let smf = Smf::parse(midi_bytes).map_err(|e| crate::Error::MidiParse(e.to_string()))?;
    Ok(event_stream(&smf))
}

/// An event placed on the merged absolute-tick timeline.
struct PlacedEvent {
    tick: u64,
    kind: EventKind,
    tempo: Option<u32>,
}

/// Merge every track of `smf` into one stream with deltas in seconds.
pub fn event_stream(smf: &Smf) -> Vec<MidiEvent> {
    let mut placed = Vec::new();

    for track in &smf.tracks {
        let mut current_tick: u64 = 0;
        for event in track {
            current_tick += event.delta.as_int() as u64;

            let (kind, tempo) = match event.kind {
                TrackEventKind::Midi { message, .. } => match message {
                    MidiMessage::NoteOn { key, vel } => (
                        if vel.as_int() > 0 {
                            EventKind::NoteOn {
                                pitch: key.as_int(),
                                velocity: vel.as_int(),
                            }
                        } else {
                            EventKind::NoteOff { pitch: key.as_int() }
                        },
                        None,
                    ),
                    MidiMessage::NoteOff { key, .. } => {
                        (EventKind::NoteOff { pitch: key.as_int() }, None)
                    }
                    _ => (EventKind::Other, None),
                },
                TrackEventKind::Meta(MetaMessage::Tempo(t)) => (EventKind::Other, Some(t.as_int())),
                _ => (EventKind::Other, None),
            };

            placed.push(PlacedEvent {
                tick: current_tick,
                kind,
                tempo,
            });
        }
    }

    // Stable: simultaneous events keep track order
    placed.sort_by_key(|e| e.tick);

    let mut clock = Clock::new(smf.header.timing);
    let mut last_tick = 0u64;
    placed
        .into_iter()
        .map(|e| {
            let delta = clock.seconds(e.tick - last_tick);
            last_tick = e.tick;
            // A tempo change governs the deltas that follow it
            if let Some(usec) = e.tempo {
                clock.tempo_usec = usec;
            }
            MidiEvent {
                delta,
                kind: e.kind,
            }
        })
        .collect()
}

/// Tick-to-seconds conversion under the current tempo.
struct Clock {
    timing: Timing,
    tempo_usec: u32,
}

impl Clock {
    fn new(timing: Timing) -> Self {
        Self {
            timing,
            tempo_usec: DEFAULT_TEMPO_USEC,
        }
    }

    fn seconds(&self, ticks: u64) -> f64 {
        if ticks == 0 {
            return 0.0;
        }
        match self.timing {
            Timing::Metrical(ppq) => {
                let ppq = ppq.as_int().max(1) as f64;
                ticks as f64 * self.tempo_usec as f64 / 1_000_000.0 / ppq
            }
            Timing::Timecode(fps, subframe) => {
                let ticks_per_second = fps.as_f32() as f64 * subframe.max(1) as f64;
                ticks as f64 / ticks_per_second
            }
        }
    }
}

/// Absolute onset of every event, for diagnostics and tests.
pub fn absolute_times(events: &[MidiEvent]) -> Vec<f64> {
    let mut offset = 0.0;
    events
        .iter()
        .map(|e| {
            offset += e.delta;
            offset
        })
        .collect()
}
