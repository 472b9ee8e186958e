//! Scores chroma/bass feature frames against the chord template catalog.
//!
//! This is the inner loop the decoder drives up to `n_frame * MAX_PREV` times; [`score_batch`]
//! scores every candidate span length for a frame in one call over contiguous `ndarray` buffers
//! rather than one [`score_frame`] call per length.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use super::catalog::ChordCatalog;

/// Scores a single `(chroma, bass)` frame against every template in the catalog.
///
/// ```text
/// matched   = sum_p chroma[p] * ref_chroma[p]
/// unmatched = sum_p chroma[p] * (1 - ref_chroma[p])
/// score     = (matched - unmatched) / chroma_size + sum_p 0.5 * bass[p] * ref_bass[p] + score_bias
/// ```
///
/// The `"N"` sentinel's score is meaningless here (its `chroma_size` is 0, which would divide by
/// zero); the decoder special-cases `"N"` rather than reading this output for it.
pub fn score_frame(chroma: ArrayView1<f32>, bass: ArrayView1<f32>, catalog: &ChordCatalog) -> Array1<f32> {
    let chroma_total: f32 = chroma.sum();

    let mut scores = Array1::<f32>::zeros(catalog.templates.len());
    for (i, template) in catalog.templates.iter().enumerate() {
        if template.chroma_size == 0 {
            scores[i] = f32::NEG_INFINITY;
            continue;
        }

        let ref_chroma = catalog.chroma_refs.row(i);
        let ref_bass = catalog.bass_refs.row(i);

        let matched: f32 = chroma.iter().zip(ref_chroma.iter()).map(|(&c, &r)| c * r).sum();
        let unmatched = chroma_total - matched;
        let bass_score: f32 = bass.iter().zip(ref_bass.iter()).map(|(&b, &r)| 0.5 * b * r).sum();

        scores[i] = (matched - unmatched) / template.chroma_size as f32 + bass_score + template.score_bias;
    }

    scores
}

/// Batched variant of [`score_frame`]: scores every row of `chroma`/`bass` (shape `[batch, 12]`)
/// against every template, returning `[batch, n_templates]`. The decoder's DP recurrence calls
/// this once per frame, with one row per candidate span length ending at that frame, rather than
/// calling [`score_frame`] once per length — this is the actual hot path the recurrence drives.
pub fn score_batch(chroma: ArrayView2<f32>, bass: ArrayView2<f32>, catalog: &ChordCatalog) -> Array2<f32> {
    let batch = chroma.nrows();
    let mut scores = Array2::<f32>::zeros((batch, catalog.templates.len()));
    for (row_idx, mut row) in scores.axis_iter_mut(Axis(0)).enumerate() {
        row.assign(&score_frame(chroma.row(row_idx), bass.row(row_idx), catalog));
    }
    scores
}
