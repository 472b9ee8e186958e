//! The variable-span dynamic-programming decoder: turns per-frame chroma/bass features into a
//! sequence of labeled, contiguous chord spans.
//!
//! This is the non-local optimization half of the pipeline. Fragmentation (many short, confident
//! labels) trades off against smoothing (fewer, longer labels) via a length bonus; metrical
//! weight lets a chord phrase breathe across weak beats; a downbeat barrier stops a span from
//! silently crossing a bar line.

use ndarray::{Array1, Array2, Axis};

use super::catalog::ChordCatalog;
use super::scorer::score_batch;
use super::types::{ChordSpan, TimeSignature};
use crate::error::{Error, Result};

/// Sentinel template index meaning "no chord" (`"N"`), used by the DP recurrence and
/// reconstruction instead of indexing into the catalog.
const NO_CHORD: i32 = -1;

/// Minimum per-span score, applied before the length bonus and metrical weight are added. Spans
/// that would score below this are reassigned to the no-chord sentinel instead, so that "nothing
/// fits here" is representable without driving the whole recurrence negative.
const SCORE_FLOOR: f32 = 0.2;

/// Per additional frame a span is extended, it must score at most this much worse (per frame) to
/// still be preferred — the trade-off between fragmentation and smoothing.
const LENGTH_BONUS_PER_FRAME: f32 = 0.7;

/// Variable-span dynamic-programming chord decoder.
pub struct Decoder {
    /// Maximum span length considered at each frame, in frames. Defaults to 8.
    pub max_prev: usize,
}

impl Default for Decoder {
    fn default() -> Self {
        Self { max_prev: 8 }
    }
}

impl Decoder {
    /// Creates a decoder with a non-default maximum span length.
    pub fn with_max_prev(max_prev: usize) -> Self {
        Self { max_prev }
    }

    /// Decodes a sequence of chord spans from per-frame chroma/bass features.
    pub fn decode(&self, chroma: &Array2<f32>, bass_chroma: &Array2<f32>, time_signatures: &[TimeSignature], catalog: &ChordCatalog) -> Result<Vec<ChordSpan>> {
        let n_frame = chroma.nrows();
        if n_frame == 0 {
            return Ok(Vec::new());
        }

        let (downbeat, metrical_weight) = build_meter_tables(time_signatures, n_frame)?;
        let (prefix_chroma, prefix_bass) = prefix_sums(chroma, bass_chroma);

        let mut best = vec![f32::NEG_INFINITY; n_frame];
        let mut choice = vec![NO_CHORD; n_frame];
        // `prev_end[i]` is the index one before the chosen span's start, or `-1` if it starts at 0.
        let mut prev_end = vec![-1isize; n_frame];

        for i in 0..n_frame {
            // The downbeat barrier depends only on meter, not on any score, so the candidate
            // span lengths for this frame are known up front. That lets every candidate be
            // scored in one `score_batch` call instead of one `score_frame` call per length —
            // the batched form is the actual hot path the DP recurrence drives.
            let mut span_starts = Vec::with_capacity(self.max_prev);
            for j in 0..self.max_prev {
                if j > i {
                    break;
                }
                let span_start = i - j;
                span_starts.push(span_start);
                if j > 0 && downbeat[span_start + 1] {
                    break;
                }
            }

            let mut cum_chroma = Array2::<f32>::zeros((span_starts.len(), 12));
            let mut cum_bass = Array2::<f32>::zeros((span_starts.len(), 12));
            for (row, &span_start) in span_starts.iter().enumerate() {
                cum_chroma.row_mut(row).assign(&range_sum(&prefix_chroma, span_start, i + 1));
                cum_bass.row_mut(row).assign(&range_sum(&prefix_bass, span_start, i + 1));
            }

            let batch_scores = score_batch(cum_chroma.view(), cum_bass.view(), catalog);

            for (j, (&span_start, scores)) in span_starts.iter().zip(batch_scores.axis_iter(Axis(0))).enumerate() {
                let (best_template, mut best_score) = argmax(scores);

                let chosen = if best_score < SCORE_FLOOR {
                    best_score = SCORE_FLOOR;
                    NO_CHORD
                } else {
                    best_template as i32
                };

                let span_score = best_score + LENGTH_BONUS_PER_FRAME * j as f32 + metrical_weight[span_start];
                let prefix = if span_start == 0 { 0.0 } else { best[span_start - 1] };
                let total = prefix + span_score;

                if total > best[i] {
                    best[i] = total;
                    choice[i] = chosen;
                    prev_end[i] = span_start as isize - 1;
                }
            }
        }

        Ok(reconstruct(n_frame, &choice, &prev_end, catalog))
    }
}

/// `[n_frame + 1, 12]` inclusive prefix sums, so `range_sum(prefix, a, b) == sum(features[a..b])`
/// without re-summing overlapping windows for every span length considered.
fn prefix_sums(chroma: &Array2<f32>, bass_chroma: &Array2<f32>) -> (Array2<f32>, Array2<f32>) {
    let n_frame = chroma.nrows();
    let mut prefix_chroma = Array2::<f32>::zeros((n_frame + 1, 12));
    let mut prefix_bass = Array2::<f32>::zeros((n_frame + 1, 12));
    for i in 0..n_frame {
        for p in 0..12 {
            prefix_chroma[[i + 1, p]] = prefix_chroma[[i, p]] + chroma[[i, p]];
            prefix_bass[[i + 1, p]] = prefix_bass[[i, p]] + bass_chroma[[i, p]];
        }
    }
    (prefix_chroma, prefix_bass)
}

fn range_sum(prefix: &Array2<f32>, start: usize, end_exclusive: usize) -> Array1<f32> {
    let mut out = Array1::<f32>::zeros(12);
    for p in 0..12 {
        out[p] = prefix[[end_exclusive, p]] - prefix[[start, p]];
    }
    out
}

fn argmax(scores: ndarray::ArrayView1<f32>) -> (usize, f32) {
    let mut best_idx = 0;
    let mut best_val = f32::NEG_INFINITY;
    for (i, &v) in scores.iter().enumerate() {
        if v > best_val {
            best_val = v;
            best_idx = i;
        }
    }
    (best_idx, best_val)
}

/// Builds the per-frame downbeat flag and metrical-extension-reward weight, from the piece's
/// time-signature list (defaulting to 4/4 if none is given). The first time signature is always
/// forced to start at frame 0.
fn build_meter_tables(time_signatures: &[TimeSignature], n_frame: usize) -> Result<(Vec<bool>, Vec<f32>)> {
    let mut segments: Vec<TimeSignature> = if time_signatures.is_empty() {
        vec![TimeSignature { time_beat: 0, beats: 4 }]
    } else {
        let mut segments = time_signatures.to_vec();
        segments.sort_by_key(|ts| ts.time_beat);
        segments[0].time_beat = 0;
        segments
    };
    segments.dedup_by_key(|ts| ts.time_beat);

    let mut downbeat = vec![false; n_frame];
    // One extra slot: the downbeat barrier check in `decode` reads `downbeat[span_start + 1]`,
    // which can land exactly on `n_frame` when a span runs to the last frame.
    downbeat.push(false);
    let mut weight = vec![0.0f32; n_frame];

    for (idx, segment) in segments.iter().enumerate() {
        if segment.beats == 0 {
            return Err(Error::InvalidMeter { beats: segment.beats });
        }

        let segment_start = segment.time_beat as usize;
        if segment_start >= n_frame {
            continue;
        }
        let segment_end = segments.get(idx + 1).map(|next| next.time_beat as usize).unwrap_or(n_frame).min(n_frame);

        for i in segment_start..segment_end {
            let r = i - segment_start;

            if segment.beats % 3 == 0 {
                let is_downbeat = r % 3 == 0;
                downbeat[i] = is_downbeat;
                weight[i] = if is_downbeat { 0.0 } else { 0.35 };
            } else if segment.beats.is_power_of_two() {
                downbeat[i] = r % 4 == 0;
                let mut w = 0.0;
                if r % 2 == 0 {
                    w = 0.2;
                }
                if r % 4 == 2 {
                    w += 0.15;
                }
                weight[i] = w;
            } else {
                return Err(Error::InvalidMeter { beats: segment.beats });
            }
        }
    }

    tracing::debug!(n_frame, segments = segments.len(), "decoder meter tables built");

    Ok((downbeat, weight))
}

fn reconstruct(n_frame: usize, choice: &[i32], prev_end: &[isize], catalog: &ChordCatalog) -> Vec<ChordSpan> {
    let mut spans: Vec<ChordSpan> = Vec::new();
    let mut end = n_frame as isize - 1;

    while end >= 0 {
        let end_usize = end as usize;
        let start = (prev_end[end_usize] + 1) as usize;
        let template_index = choice[end_usize];

        let (name, pitches) = if template_index == NO_CHORD {
            ("N".to_string(), Vec::new())
        } else {
            let idx = template_index as usize;
            (catalog.templates[idx].name.clone(), catalog.pitches(idx))
        };

        match spans.last_mut() {
            Some(last) if last.name == name => {
                last.start = start;
            }
            _ => {
                spans.push(ChordSpan { start, end: end_usize, name, pitches });
            }
        }

        end = start as isize - 1;
    }

    spans.reverse();
    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::CATALOG;
    use ndarray::array;
    use pretty_assertions::assert_eq;

    fn sustained_c_major(frames: usize) -> (Array2<f32>, Array2<f32>) {
        let mut chroma = Array2::<f32>::zeros((frames, 12));
        let mut bass = Array2::<f32>::zeros((frames, 12));
        for f in 0..frames {
            chroma[[f, 0]] = 1.0;
            chroma[[f, 4]] = 1.0;
            chroma[[f, 7]] = 1.0;
            bass[[f, 0]] = 1.0;
        }
        (chroma, bass)
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let decoder = Decoder::default();
        let chroma = Array2::<f32>::zeros((0, 12));
        let bass = Array2::<f32>::zeros((0, 12));
        let spans = decoder.decode(&chroma, &bass, &[], &CATALOG).unwrap();
        assert!(spans.is_empty());
    }

    #[test]
    fn single_note_doubling_as_bass_clears_the_floor_via_bass_reward() {
        // A lone C, also the (trivial) bass: the chroma match alone ((1-0)/3 - 0.3 bias =
        // 0.033) would miss the 0.2 floor, but the bass reward (0.5 * bass[C] * ref_bass[C])
        // pushes a root-position C triad to 0.533, clearing it. Every chroma-size-3 quality
        // rooted at C ties at that score; "C:maj" wins as the first such template in catalog
        // order (root position before inversions, "maj" first among the size-3 qualities).
        let decoder = Decoder::default();
        let mut chroma = Array2::<f32>::zeros((1, 12));
        chroma[[0, 0]] = 1.0;
        let bass = {
            let mut b = Array2::<f32>::zeros((1, 12));
            b[[0, 0]] = 1.0;
            b
        };
        let spans = decoder.decode(&chroma, &bass, &[], &CATALOG).unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0], ChordSpan { start: 0, end: 0, name: "C:maj".to_string(), pitches: vec![0, 4, 7] });
    }

    #[test]
    fn ambiguous_frame_without_bass_support_floors_to_no_chord() {
        // A faint, unsupported pitch class with no corresponding bass evidence: the best
        // template score ((0.3 - 0) / 3 - 0.3 bias = -0.2, no bass reward) is well under the
        // 0.2 floor, so the frame is reassigned to the "N" sentinel.
        let decoder = Decoder::default();
        let mut chroma = Array2::<f32>::zeros((1, 12));
        chroma[[0, 0]] = 0.3;
        let bass = Array2::<f32>::zeros((1, 12));

        let spans = decoder.decode(&chroma, &bass, &[], &CATALOG).unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0], ChordSpan { start: 0, end: 0, name: "N".to_string(), pitches: vec![] });
    }

    #[test]
    fn sustained_triad_over_four_beats_merges_into_one_span() {
        let decoder = Decoder::default();
        let (chroma, bass) = sustained_c_major(4);
        let spans = decoder.decode(&chroma, &bass, &[], &CATALOG).unwrap();

        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].start, 0);
        assert_eq!(spans[0].end, 3);
        assert_eq!(spans[0].name, "C:maj");
        assert_eq!(spans[0].pitches, vec![0, 4, 7]);
    }

    #[test]
    fn spans_are_contiguous_and_cover_everything() {
        let decoder = Decoder::default();
        let (chroma, bass) = sustained_c_major(10);
        let spans = decoder.decode(&chroma, &bass, &[], &CATALOG).unwrap();

        assert_eq!(spans.first().unwrap().start, 0);
        assert_eq!(spans.last().unwrap().end, 9);
        for pair in spans.windows(2) {
            assert_eq!(pair[0].end + 1, pair[1].start);
            assert_ne!(pair[0].name, pair[1].name);
        }
    }

    #[test]
    fn merges_across_a_time_signature_boundary() {
        let decoder = Decoder::default();
        let (chroma, bass) = sustained_c_major(8);
        let time_signatures = vec![TimeSignature { time_beat: 0, beats: 4 }, TimeSignature { time_beat: 4, beats: 4 }];
        let spans = decoder.decode(&chroma, &bass, &time_signatures, &CATALOG).unwrap();

        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].start, 0);
        assert_eq!(spans[0].end, 7);
    }

    #[test]
    fn triple_meter_forces_boundaries_at_every_third_frame() {
        let decoder = Decoder::default();
        let (chroma, bass) = sustained_c_major(9);
        let time_signatures = vec![TimeSignature { time_beat: 0, beats: 3 }];
        let spans = decoder.decode(&chroma, &bass, &time_signatures, &CATALOG).unwrap();

        for span in &spans {
            assert_eq!(span.start % 3, 0);
            assert_eq!((span.end + 1) % 3, 0);
        }
    }

    #[test]
    fn unknown_meter_is_an_error() {
        let decoder = Decoder::default();
        let (chroma, bass) = sustained_c_major(4);
        let time_signatures = vec![TimeSignature { time_beat: 0, beats: 5 }];
        let err = decoder.decode(&chroma, &bass, &time_signatures, &CATALOG).unwrap_err();
        assert_eq!(err, Error::InvalidMeter { beats: 5 });
    }

    #[test]
    fn decode_is_deterministic() {
        let decoder = Decoder::default();
        let (chroma, bass) = sustained_c_major(6);
        let a = decoder.decode(&chroma, &bass, &[], &CATALOG).unwrap();
        let b = decoder.decode(&chroma, &bass, &[], &CATALOG).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn first_inversion_preferred_when_bass_supports_it() {
        let decoder = Decoder::default();
        let frames = 4;
        let mut chroma = Array2::<f32>::zeros((frames, 12));
        let mut bass = Array2::<f32>::zeros((frames, 12));
        for f in 0..frames {
            chroma[[f, 0]] = 1.0;
            chroma[[f, 4]] = 1.0;
            chroma[[f, 7]] = 1.0;
            bass[[f, 4]] = 1.0; // bass is on E, not C
        }
        let spans = decoder.decode(&chroma, &bass, &[], &CATALOG).unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].name, "C:maj/3");
    }

    #[test]
    fn prefix_sum_matches_naive_range_sum() {
        let chroma = array![[1.0f32, 0.0], [0.5, 0.5], [0.0, 1.0]];
        let bass = Array2::<f32>::zeros((3, 2));
        let mut full_chroma = Array2::<f32>::zeros((3, 12));
        let mut full_bass = Array2::<f32>::zeros((3, 12));
        full_chroma.slice_mut(ndarray::s![.., 0..2]).assign(&chroma);
        full_bass.slice_mut(ndarray::s![.., 0..2]).assign(&bass);

        let (prefix_chroma, _) = prefix_sums(&full_chroma, &full_bass);
        let sum_first_two = range_sum(&prefix_chroma, 0, 2);
        assert_eq!(sum_first_two[0], 1.5);
        assert_eq!(sum_first_two[1], 0.5);
    }
}
