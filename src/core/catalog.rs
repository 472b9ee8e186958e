//! The fixed, enumerated chord template catalog.
//!
//! Every (root, quality[, inversion]) triple is flattened into one record with an integer index;
//! the decoder carries those indices (plus a `-1` sentinel for no-chord) and never dispatches on
//! a type hierarchy. The catalog is pure, deterministic, and built once per process behind a
//! [`std::sync::LazyLock`] — the same primitive the teacher reaches for its own static tables
//! (`core::pitch::ALL_PITCHES`).

use std::sync::LazyLock;

use ndarray::Array2;

use super::pitch::{rotl12, INVERSION_LABELS, PITCH_CLASS_NAMES};

/// One chord template: a chroma mask, a bass mask (always exactly one bit set), and the
/// derived weights the scorer needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ChordTemplate {
    /// Display name, e.g. `"C:maj"`, `"C:maj/3"`, or `"N"` for the no-chord sentinel.
    pub name: String,
    /// 12-bit pitch-class mask (bit `p` set means pitch class `p` belongs to the chord).
    pub chroma: u16,
    /// 12-bit pitch-class mask for the bass note; exactly one bit set, or zero for `"N"`.
    pub bass: u16,
    /// `chroma.count_ones()`.
    pub chroma_size: u8,
    /// Whether this template represents a non-root-position voicing.
    pub inverted: bool,
    /// `-0.1 * chroma_size - 0.05 * inverted`. Always `<= 0`; penalizes large templates (so a
    /// maximal chord doesn't always beat a triad it happens to contain) and inversions slightly
    /// (so root position wins ties).
    pub score_bias: f32,
}

/// The full, immutable chord template set plus the contiguous per-template reference vectors the
/// scorer's hot loop wants (bit masks broken out into `f32` rows so scoring is a dot product, not
/// a bit-scan).
pub struct ChordCatalog {
    /// Templates in deterministic generation order: root position before inversions, inversions
    /// in the order their interval is declared, roots outer, qualities inner, `"N"` last.
    pub templates: Vec<ChordTemplate>,
    /// `[n_templates, 12]`: `chroma_refs[i, p] = 1.0` iff pitch class `p` is in template `i`'s
    /// chroma mask.
    pub chroma_refs: Array2<f32>,
    /// `[n_templates, 12]`: `bass_refs[i, p] = 1.0` iff pitch class `p` is template `i`'s bass.
    pub bass_refs: Array2<f32>,
    /// Index of the `"N"` (no-chord) sentinel — always the last template.
    pub no_chord_index: usize,
}

/// The 31 chord qualities, in the fixed order that (together with root order) determines
/// template indices. Each mask is relative to a root at bit 0, indexed by semitone above the
/// root (so bit `i` corresponds to [`INVERSION_LABELS`]`[i]`).
const QUALITIES: &[(&str, u16)] = &[
    ("maj", mask(&[0, 4, 7])),
    ("min", mask(&[0, 3, 7])),
    ("aug", mask(&[0, 4, 8])),
    ("dim", mask(&[0, 3, 6])),
    ("sus4", mask(&[0, 5, 7])),
    ("sus4(b7)", mask(&[0, 5, 7, 10])),
    ("sus4(b7,9)", mask(&[0, 2, 5, 7, 10])),
    ("sus2", mask(&[0, 2, 7])),
    ("7", mask(&[0, 4, 7, 10])),
    ("maj7", mask(&[0, 4, 7, 11])),
    ("min7", mask(&[0, 3, 7, 10])),
    ("minmaj7", mask(&[0, 3, 7, 11])),
    ("maj6", mask(&[0, 4, 7, 9])),
    ("min6", mask(&[0, 3, 7, 9])),
    ("9", mask(&[0, 2, 4, 7, 10])),
    ("maj9", mask(&[0, 2, 4, 7, 11])),
    ("min9", mask(&[0, 2, 3, 7, 10])),
    ("7(#9)", mask(&[0, 3, 4, 7, 10])),
    ("maj6(9)", mask(&[0, 2, 4, 7, 9])),
    ("min6(9)", mask(&[0, 2, 3, 7, 9])),
    ("maj(9)", mask(&[0, 2, 4, 7])),
    ("min(9)", mask(&[0, 2, 3, 7])),
    ("min(11)", mask(&[0, 3, 5, 7, 10])),
    ("11", mask(&[0, 2, 4, 5, 7, 10])),
    ("maj9(11)", mask(&[0, 2, 4, 5, 7, 11])),
    ("min11", mask(&[0, 2, 3, 5, 7, 10])),
    ("13", mask(&[0, 2, 4, 5, 7, 9, 10])),
    ("maj13", mask(&[0, 2, 4, 5, 7, 9, 11])),
    ("min13", mask(&[0, 2, 3, 5, 7, 9, 10])),
    ("dim7", mask(&[0, 3, 6, 9])),
    ("hdim7", mask(&[0, 3, 6, 10])),
];

/// Inversions generated per quality: bass interval (semitones above root). Only these five
/// qualities get inversions, per the catalog design.
const INVERSIONS: &[(&str, &[u8])] = &[
    ("maj", &[4, 7]),
    ("min", &[3, 7]),
    ("7", &[4, 7, 10]),
    ("maj7", &[4, 7, 11]),
    ("min7", &[7, 10]),
];

/// Builds a 12-bit mask from a list of semitone offsets, at const-eval time.
const fn mask(semitones: &[u8]) -> u16 {
    let mut m = 0u16;
    let mut i = 0;
    while i < semitones.len() {
        m |= 1 << semitones[i];
        i += 1;
    }
    m
}

fn chroma_size(chroma: u16) -> u8 {
    chroma.count_ones() as u8
}

fn score_bias(chroma_size: u8, inverted: bool) -> f32 {
    -0.1 * chroma_size as f32 - 0.05 * if inverted { 1.0 } else { 0.0 }
}

fn build_templates() -> Vec<ChordTemplate> {
    let mut templates = Vec::with_capacity(12 * (QUALITIES.len() + 12) + 1);

    for root in 0u8..12 {
        let root_name = PITCH_CLASS_NAMES[root as usize];

        for &(quality_name, base_chroma) in QUALITIES {
            let chroma = rotl12(base_chroma, root);
            let bass = rotl12(1, root);
            let size = chroma_size(chroma);

            templates.push(ChordTemplate {
                name: format!("{root_name}:{quality_name}"),
                chroma,
                bass,
                chroma_size: size,
                inverted: false,
                score_bias: score_bias(size, false),
            });

            if let Some((_, intervals)) = INVERSIONS.iter().find(|(name, _)| *name == quality_name) {
                for &interval in *intervals {
                    let inv_bass = rotl12(1, root.wrapping_add(interval) % 12);
                    let label = INVERSION_LABELS[interval as usize];

                    templates.push(ChordTemplate {
                        name: format!("{root_name}:{quality_name}/{label}"),
                        chroma,
                        bass: inv_bass,
                        chroma_size: size,
                        inverted: true,
                        score_bias: score_bias(size, true),
                    });
                }
            }
        }
    }

    templates.push(ChordTemplate {
        name: "N".to_string(),
        chroma: 0,
        bass: 0,
        chroma_size: 0,
        inverted: false,
        score_bias: 0.0,
    });

    templates
}

fn mask_to_row(mask: u16, row: &mut [f32]) {
    for (p, slot) in row.iter_mut().enumerate() {
        *slot = if mask & (1 << p) != 0 { 1.0 } else { 0.0 };
    }
}

impl ChordCatalog {
    fn build() -> Self {
        let templates = build_templates();
        let n = templates.len();

        let mut chroma_refs = Array2::<f32>::zeros((n, 12));
        let mut bass_refs = Array2::<f32>::zeros((n, 12));

        for (i, template) in templates.iter().enumerate() {
            mask_to_row(template.chroma, chroma_refs.row_mut(i).as_slice_mut().expect("contiguous row"));
            mask_to_row(template.bass, bass_refs.row_mut(i).as_slice_mut().expect("contiguous row"));
        }

        let no_chord_index = n - 1;

        tracing::debug!(templates = n, "chord catalog built");

        Self { templates, chroma_refs, bass_refs, no_chord_index }
    }

    /// The pitch classes (as raw `u8` indices `0..11`) present in template `index`'s chroma mask.
    pub fn pitches(&self, index: usize) -> Vec<u8> {
        let chroma = self.templates[index].chroma;
        (0..12u8).filter(|p| chroma & (1 << p) != 0).collect()
    }
}

/// The process-wide catalog. Regenerated once, lazily, on first use; cheap enough (517 small
/// records) that persisting it to disk would only be useful if generation itself were expensive,
/// which it isn't.
pub static CATALOG: LazyLock<ChordCatalog> = LazyLock::new(ChordCatalog::build);
