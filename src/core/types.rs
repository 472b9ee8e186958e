//! The in-memory `Score` the core pipeline consumes, and the `ChordSpan` it produces.
//!
//! These types are the contract between the core (`catalog`, `features`, `scorer`, `decoder`)
//! and whatever builds a [`Score`] — the `loader` module, or a caller with their own MIDI/MusicXML
//! front end. Nothing in this module touches a file.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single note, with all time fields expressed in beats (quarter notes), not ticks or seconds.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Note {
    /// MIDI pitch number, `0..127`.
    pub pitch: u8,
    /// Onset time, in beats.
    pub start: f64,
    /// Duration, in beats. Must be positive for a note to survive quantization.
    pub duration: f64,
    /// Note-on velocity, `0..127`.
    pub velocity: u8,
}

impl Note {
    /// The (exclusive) end time of the note, in beats.
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// An ordered collection of notes belonging to one instrument/channel.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Track {
    /// Human-readable track name, if the source format carried one.
    pub name: String,
    /// General MIDI program number.
    pub program: u8,
    /// Whether this track is a drum/percussion channel. The core never filters these itself —
    /// per the recognition contract, the caller (or the loader) must drop drum tracks before
    /// calling [`crate::recognize_chords`].
    pub is_drum: bool,
    /// The notes on this track, in no particular order.
    pub notes: Vec<Note>,
}

/// A time signature change, active from `time_beat` (a quantized frame index) onward.
///
/// Only the numerator (`beats`) is consumed by the core; unlike the original implementation this
/// type carries no denominator field at all — nothing downstream ever reads it, so there is
/// nothing to thread through.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSignature {
    /// The frame index at which this time signature becomes active.
    pub time_beat: u32,
    /// Beats per measure (the numerator).
    pub beats: u8,
}

/// A normalized, in-memory musical score: the input to [`crate::recognize_chords`].
///
/// Building one of these from a MIDI file is explicitly not the core's job — see the `loader`
/// module (feature `midi`) for a thin adapter.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Score {
    /// Non-drum and drum tracks alike; callers are expected to have already dropped drum tracks,
    /// but [`crate::recognize_chords`] re-filters defensively since silently scoring a drum kit
    /// as pitched content would be a much worse failure mode than an extra filter pass.
    pub tracks: Vec<Track>,
    /// Time signature changes, in chronological order. The first element's `time_beat` is forced
    /// to `0` by the decoder if the caller didn't already do so.
    pub time_signatures: Vec<TimeSignature>,
}

/// A maximal, contiguous run of frames assigned the same chord label.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ChordSpan {
    /// First frame covered by this span (inclusive).
    pub start: usize,
    /// Last frame covered by this span (inclusive).
    pub end: usize,
    /// The chord's display name (e.g. `"C:maj"`, `"C:maj/3"`, or `"N"` for no-chord).
    pub name: String,
    /// Pitch classes present in the chord template, empty for `"N"`.
    pub pitches: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn note_end_is_start_plus_duration() {
        let note = Note { pitch: 60, start: 1.5, duration: 0.5, velocity: 100 };
        assert_eq!(note.end(), 2.0);
    }
}
