//! Thin MIDI adapter (feature `midi`): turns a standard MIDI file into a [`Score`].
//!
//! This is deliberately dumb. It tracks note-on/note-off pairs, program numbers, and time
//! signature meta events, and converts everything from ticks to beats by dividing by the file's
//! ticks-per-quarter-note. Tempo changes, pitch bends, controller events, and anything else that
//! doesn't bear on "what pitch classes sound when" is read and discarded.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};

use crate::core::types::{Note, Score, TimeSignature, Track};
use crate::error::{Error, Result};

/// MIDI channel 10 (zero-indexed 9) is the General MIDI percussion channel by convention.
const DRUM_CHANNEL: u8 = 9;

/// Reads a standard MIDI file from disk and loads it into a [`Score`].
pub fn load_score(path: &Path) -> Result<Score> {
    let bytes = fs::read(path)?;
    load_midi(&bytes)
}

struct PendingNote {
    start_tick: u32,
    velocity: u8,
}

/// Loads a [`Score`] from raw standard MIDI file bytes.
pub fn load_midi(bytes: &[u8]) -> Result<Score> {
    let smf = Smf::parse(bytes).map_err(|e| Error::Midi(e.to_string()))?;

    let ticks_per_beat = match smf.header.timing {
        Timing::Metrical(tpb) => u16::from(tpb) as f64,
        Timing::Timecode(fps, subframe) => fps.as_f32() as f64 * subframe as f64,
    };
    if ticks_per_beat <= 0.0 {
        return Err(Error::Midi("MIDI file declares zero ticks per beat".to_string()));
    }

    let mut tracks = Vec::with_capacity(smf.tracks.len());
    let mut time_signatures = Vec::new();

    for raw_track in &smf.tracks {
        let mut name = String::new();
        let mut program_by_channel: HashMap<u8, u8> = HashMap::new();
        let mut open_notes: HashMap<(u8, u8), PendingNote> = HashMap::new();
        let mut notes = Vec::new();
        let mut channels_seen: Vec<u8> = Vec::new();
        let mut absolute_tick: u32 = 0;

        for event in raw_track {
            absolute_tick += u32::from(event.delta);

            match event.kind {
                TrackEventKind::Meta(MetaMessage::TrackName(raw)) => {
                    name = String::from_utf8_lossy(raw).trim().to_string();
                }
                TrackEventKind::Meta(MetaMessage::TimeSignature(numerator, _denom_pow2, _, _)) => {
                    let time_beat = (absolute_tick as f64 / ticks_per_beat).round() as u32;
                    time_signatures.push(TimeSignature { time_beat, beats: numerator });
                }
                TrackEventKind::Midi { channel, message } => {
                    let channel = u8::from(channel);
                    if !channels_seen.contains(&channel) {
                        channels_seen.push(channel);
                    }

                    match message {
                        MidiMessage::ProgramChange { program } => {
                            program_by_channel.insert(channel, u8::from(program));
                        }
                        MidiMessage::NoteOn { key, vel } if u8::from(vel) > 0 => {
                            open_notes.insert((channel, u8::from(key)), PendingNote { start_tick: absolute_tick, velocity: u8::from(vel) });
                        }
                        MidiMessage::NoteOn { key, vel: _ } | MidiMessage::NoteOff { key, vel: _ } => {
                            if let Some(pending) = open_notes.remove(&(channel, u8::from(key))) {
                                let start = pending.start_tick as f64 / ticks_per_beat;
                                let end = absolute_tick as f64 / ticks_per_beat;
                                if end > start {
                                    notes.push(Note { pitch: u8::from(key), start, duration: end - start, velocity: pending.velocity });
                                }
                            }
                        }
                        _ => {}
                    }
                }
                _ => {}
            }
        }

        let is_drum = channels_seen.iter().all(|&c| c == DRUM_CHANNEL) && !channels_seen.is_empty();
        let program = channels_seen.first().and_then(|c| program_by_channel.get(c)).copied().unwrap_or(0);

        tracks.push(Track { name, program, is_drum, notes });
    }

    time_signatures.sort_by_key(|ts| ts.time_beat);
    time_signatures.dedup_by_key(|ts| ts.time_beat);

    tracing::debug!(n_tracks = tracks.len(), n_time_signatures = time_signatures.len(), "MIDI file loaded");

    Ok(Score { tracks, time_signatures })
}
