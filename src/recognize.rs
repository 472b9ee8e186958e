//! The public entry point: wires `catalog` -> `features` -> `scorer` -> `decoder` into a single
//! call from a [`Score`] to a sequence of [`ChordSpan`]s.

use crate::core::catalog::CATALOG;
use crate::core::decoder::Decoder;
use crate::core::features::extract_features;
use crate::core::types::{ChordSpan, Score, Track};
use crate::error::Result;

/// Recognizes a chord progression from a [`Score`], at the given beat precision (frames per
/// beat is `1 / precision`; `0.25` is one frame per quarter note).
///
/// Drum tracks are excluded regardless of whether the caller already filtered them, since
/// accidentally scoring a drum kit as pitched content is a far worse failure mode than one extra
/// filter pass.
pub fn recognize_chords(score: &Score, precision: f32) -> Result<Vec<ChordSpan>> {
    recognize_chords_with(score, precision, &Decoder::default())
}

/// Like [`recognize_chords`], but with an explicit [`Decoder`] (for callers who want a
/// non-default `max_prev`).
pub fn recognize_chords_with(score: &Score, precision: f32, decoder: &Decoder) -> Result<Vec<ChordSpan>> {
    let pitched_tracks: Vec<Track> = score.tracks.iter().filter(|t| !t.is_drum).cloned().collect();

    let (chroma, bass_chroma) = extract_features(&pitched_tracks, precision)?;

    tracing::info!(n_frame = chroma.nrows(), n_tracks = pitched_tracks.len(), "features extracted");

    let spans = decoder.decode(&chroma, &bass_chroma, &score.time_signatures, &CATALOG)?;

    tracing::info!(n_spans = spans.len(), "chord spans decoded");

    Ok(spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Note;
    use pretty_assertions::assert_eq;

    fn note(pitch: u8, start: f64, duration: f64) -> Note {
        Note { pitch, start, duration, velocity: 100 }
    }

    #[test]
    fn recognizes_a_sustained_c_major_triad() {
        let score = Score {
            tracks: vec![Track {
                name: "piano".into(),
                program: 0,
                is_drum: false,
                notes: vec![note(60, 0.0, 4.0), note(64, 0.0, 4.0), note(67, 0.0, 4.0)],
            }],
            time_signatures: vec![],
        };

        let spans = recognize_chords(&score, 1.0).unwrap();

        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].name, "C:maj");
    }

    #[test]
    fn drum_tracks_are_ignored_even_if_not_pre_filtered() {
        let score = Score {
            tracks: vec![
                Track { name: "piano".into(), program: 0, is_drum: false, notes: vec![note(60, 0.0, 4.0), note(64, 0.0, 4.0), note(67, 0.0, 4.0)] },
                Track { name: "kit".into(), program: 0, is_drum: true, notes: vec![note(36, 0.0, 4.0), note(38, 1.0, 1.0)] },
            ],
            time_signatures: vec![],
        };

        let spans = recognize_chords(&score, 1.0).unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].name, "C:maj");
    }

    #[test]
    fn empty_score_yields_no_spans() {
        let score = Score::default();
        let spans = recognize_chords(&score, 0.25).unwrap();
        assert!(spans.is_empty());
    }
}
