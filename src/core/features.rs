//! Beat-quantized chroma and bass feature extraction from a multi-track note stream.
//!
//! This is the feature-engineering half of the pipeline: turn however many overlapping tracks of
//! notes into two dense `[n_frame, 12]` matrices the scorer can dot-product against chord
//! templates. Everything here works at *tick* resolution internally (one tick = one quantum of
//! `precision` beats) and only reshapes down to frames at the very end.

use ndarray::Array2;

use super::types::Track;
use crate::error::{Error, Result};

/// MIDI pitch sentinel meaning "no note sounding at this tick", used by the bass track.
const NO_BASS: u16 = 128;

/// Quantizes a time value (in beats) to an integer tick count, rounding half away from zero —
/// matching the original implementation's `(x / precision) + 0.5` truncation for non-negative
/// times.
fn quantize(time: f64, precision: f32) -> u32 {
    ((time / precision as f64) + 0.5).floor().max(0.0) as u32
}

struct QuantizedNote {
    pitch: u8,
    start: u32,
    end: u32,
}

fn quantize_track(track: &Track, precision: f32) -> Vec<QuantizedNote> {
    track
        .notes
        .iter()
        .filter_map(|note| {
            let start = quantize(note.start, precision);
            let end = quantize(note.end(), precision);
            (end > start).then_some(QuantizedNote { pitch: note.pitch, start, end })
        })
        .collect()
}

/// Per-track dense buffers over `[0, global_end)` ticks.
struct TrackBuffers {
    /// `abs_pianoroll[tick * 12 + pitch_class] == 1.0` iff that pitch class sounds at `tick`.
    abs_pianoroll: Vec<f32>,
    /// Lowest MIDI pitch sounding at each tick, or [`NO_BASS`] if silent.
    bass: Vec<u16>,
}

fn build_track_buffers(notes: &[QuantizedNote], global_end: u32) -> TrackBuffers {
    let global_end = global_end as usize;
    let mut abs_pianoroll = vec![0.0f32; global_end * 12];
    let mut bass = vec![NO_BASS; global_end];

    for note in notes {
        let pitch_class = (note.pitch % 12) as usize;
        for tick in note.start..note.end {
            abs_pianoroll[tick as usize * 12 + pitch_class] = 1.0;
        }
    }

    // Lowest-pitch-wins: write in descending pitch order so that whichever note is lowest at a
    // given tick is the last one to overwrite it. This mirrors the original implementation's
    // sort-by-pitch-then-write-in-reverse dance, which has the same effect but gets there by a
    // less direct route.
    let mut by_pitch_desc: Vec<&QuantizedNote> = notes.iter().collect();
    by_pitch_desc.sort_by(|a, b| b.pitch.cmp(&a.pitch));
    for note in by_pitch_desc {
        for tick in note.start..note.end {
            bass[tick as usize] = note.pitch as u16;
        }
    }

    TrackBuffers { abs_pianoroll, bass }
}

/// `thickness_t`: the mean, over ticks where at least one pitch class sounds, of the number of
/// simultaneously-active pitch classes.
fn thickness(buffers: &TrackBuffers, global_end: usize) -> f32 {
    let mut sum = 0.0f32;
    let mut count = 0u32;
    for tick in 0..global_end {
        let active: u32 = (0..12).map(|p| buffers.abs_pianoroll[tick * 12 + p] as u32).sum();
        if active > 0 {
            sum += active as f32;
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f32
    }
}

/// `m_t`: the mean MIDI pitch of the bass line where it sounds, provided that covers at least
/// 20% of the track's duration; otherwise the silent sentinel `128.0`, which guarantees this
/// track never "wins" the lowest-bass vote.
fn bass_mean(buffers: &TrackBuffers, global_end: usize) -> f32 {
    if global_end == 0 {
        return NO_BASS as f32;
    }
    let sounding: Vec<f32> = buffers.bass.iter().filter(|&&b| b < NO_BASS).map(|&b| b as f32).collect();
    let nonempty_rate = sounding.len() as f32 / global_end as f32;
    if nonempty_rate > 0.2 {
        sounding.iter().sum::<f32>() / sounding.len() as f32
    } else {
        NO_BASS as f32
    }
}

/// Computes the per-track chroma weight: thicker (more simultaneous pitch classes) tracks
/// contribute more, normalized so the loudest track has weight 1 — except the track with the
/// lowest-sounding bass always gets weight 1, since the bass line is the single most reliable
/// signal for chord root/inversion even when it's textureally thin (e.g. a single sustained bass
/// note under a dense pad).
fn track_weights(buffers: &[TrackBuffers], global_end: usize) -> Vec<f32> {
    if buffers.is_empty() {
        return Vec::new();
    }

    let thicknesses: Vec<f32> = buffers.iter().map(|b| thickness(b, global_end)).collect();
    let mut weights: Vec<f32> = thicknesses.iter().map(|&t| 1.0 - (0.95 - t).exp()).collect();

    let max_weight = weights.iter().cloned().fold(f32::MIN, f32::max);
    if max_weight > 0.0 {
        for w in &mut weights {
            *w /= max_weight;
        }
    }

    let means: Vec<f32> = buffers.iter().map(|b| bass_mean(b, global_end)).collect();
    if let Some((lowest_bass_track, _)) = means.iter().enumerate().min_by(|(_, a), (_, b)| a.total_cmp(b)) {
        weights[lowest_bass_track] = 1.0;
    }

    weights
}

/// Extracts beat-quantized chroma and bass-chroma features from a set of non-drum tracks.
///
/// `precision` must divide evenly into one beat (`1 / precision` integral); a beat precision of
/// `0.25` (the default) means one frame covers a quarter note.
pub fn extract_features(tracks: &[Track], precision: f32) -> Result<(Array2<f32>, Array2<f32>)> {
    let inverse = 1.0 / precision;
    let chord_window = inverse.round();
    if (inverse - chord_window).abs() > 1e-4 || chord_window < 1.0 {
        return Err(Error::InvalidPrecision { precision });
    }
    let chord_window = chord_window as usize;

    let quantized: Vec<Vec<QuantizedNote>> = tracks.iter().map(|t| quantize_track(t, precision)).collect();

    let global_end_ticks = quantized.iter().flatten().map(|n| n.end).max();
    let Some(global_end_ticks) = global_end_ticks else {
        tracing::debug!("no notes survived quantization; returning empty feature set");
        return Ok((Array2::zeros((0, 12)), Array2::zeros((0, 12))));
    };

    let remainder = global_end_ticks % chord_window as u32;
    let global_end_ticks = if remainder == 0 { global_end_ticks } else { global_end_ticks + (chord_window as u32 - remainder) };
    let n_frame = global_end_ticks as usize / chord_window;

    let buffers: Vec<TrackBuffers> = quantized.iter().map(|notes| build_track_buffers(notes, global_end_ticks)).collect();
    let weights = track_weights(&buffers, global_end_ticks as usize);

    tracing::debug!(n_frame, n_tracks = buffers.len(), ?weights, "feature extraction track weights computed");

    let mut chroma = Array2::<f32>::zeros((n_frame, 12));
    for (buf, &weight) in buffers.iter().zip(weights.iter()) {
        for frame in 0..n_frame {
            for pitch_class in 0..12 {
                let mut sum = 0.0f32;
                for offset in 0..chord_window {
                    let tick = frame * chord_window + offset;
                    sum += buf.abs_pianoroll[tick * 12 + pitch_class];
                }
                let value = sum * weight / chord_window as f32;
                let slot = &mut chroma[[frame, pitch_class]];
                if value > *slot {
                    *slot = value;
                }
            }
        }
    }

    let mut combined_bass = vec![NO_BASS; global_end_ticks as usize];
    for buf in &buffers {
        for (slot, &b) in combined_bass.iter_mut().zip(buf.bass.iter()) {
            *slot = (*slot).min(b);
        }
    }

    let mut bass_chroma = Array2::<f32>::zeros((n_frame, 12));
    for frame in 0..n_frame {
        for offset in 0..chord_window {
            let tick = frame * chord_window + offset;
            let bass = combined_bass[tick];
            if bass < NO_BASS {
                bass_chroma[[frame, (bass % 12) as usize]] += 1.0 / chord_window as f32;
            }
        }
    }

    Ok((chroma, bass_chroma))
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
    fn rejects_non_integral_precision() {
        let err = extract_features(&[], 0.3).unwrap_err();
        assert_eq!(err, Error::InvalidPrecision { precision: 0.3 });
    }

    #[test]
    fn empty_tracks_yield_zero_frames() {
        let (chroma, bass) = extract_features(&[], 0.25).unwrap();
        assert_eq!(chroma.shape(), &[0, 12]);
        assert_eq!(bass.shape(), &[0, 12]);
    }

    #[test]
    fn single_sustained_triad_fills_one_frame_fully() {
        let track = Track {
            name: "piano".into(),
            program: 0,
            is_drum: false,
            notes: vec![note(60, 0.0, 1.0), note(64, 0.0, 1.0), note(67, 0.0, 1.0)],
        };
        let (chroma, bass) = extract_features(&[track], 1.0).unwrap();
        assert_eq!(chroma.shape(), &[1, 12]);
        assert_eq!(chroma[[0, 0]], 1.0); // C
        assert_eq!(chroma[[0, 4]], 1.0); // E
        assert_eq!(chroma[[0, 7]], 1.0); // G
        assert_eq!(chroma[[0, 2]], 0.0); // D not present
        assert_eq!(bass[[0, 0]], 1.0); // lowest note is C
    }

    #[test]
    fn silent_track_does_not_change_output() {
        let melody = Track { name: "m".into(), program: 0, is_drum: false, notes: vec![note(60, 0.0, 4.0), note(64, 0.0, 4.0), note(67, 0.0, 4.0)] };
        let silent = Track { name: "rest".into(), program: 0, is_drum: false, notes: vec![] };

        let (with_silent, _) = extract_features(&[melody.clone(), silent], 1.0).unwrap();
        let (without_silent, _) = extract_features(&[melody], 1.0).unwrap();

        assert_eq!(with_silent, without_silent);
    }

    #[test]
    fn lowest_bass_track_forced_to_full_weight() {
        // A thin but low bass track should still dominate the bass_chroma output, even though a
        // thicker pad track would otherwise win the chroma weighting contest.
        let bass_track = Track { name: "bass".into(), program: 0, is_drum: false, notes: vec![note(36, 0.0, 4.0)] };
        let pad = Track {
            name: "pad".into(),
            program: 0,
            is_drum: false,
            notes: vec![note(60, 0.0, 4.0), note(64, 0.0, 4.0), note(67, 0.0, 4.0), note(71, 0.0, 4.0)],
        };
        let (_, bass_chroma) = extract_features(&[pad, bass_track], 1.0).unwrap();
        // 36 % 12 == 0 (C); the low bass track should dominate every frame.
        for frame in 0..4 {
            assert_eq!(bass_chroma[[frame, 0]], 1.0);
        }
    }
}
