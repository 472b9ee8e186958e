//! Pitch classes: the twelve-tone alphabet every chroma vector, bass vector, and chord template
//! is expressed in.
//!
//! Pitch classes are carried as raw `u8` indices `0..11` throughout the catalog and decoder
//! (`catalog::ChordCatalog::pitches`, `decoder::ChordSpan::pitches`) rather than through a
//! dedicated newtype — the only operations any caller needs are rotation (`rotl12`) and naming
//! (`PITCH_CLASS_NAMES`), both of which are free functions/tables below.

/// Names used for chord template roots, mixing sharps and flats per the fixed convention chord
/// symbols conventionally use (e.g. `C#` for the raised tonic, but `Eb`/`Ab`/`Bb` on the flat
/// side), not an all-sharps or all-flats spelling.
pub const PITCH_CLASS_NAMES: [&str; 12] = ["C", "C#", "D", "Eb", "E", "F", "F#", "G", "Ab", "A", "Bb", "B"];

/// Inversion labels, indexed by the bass pitch class's interval (in semitones) above the root.
pub const INVERSION_LABELS: [&str; 12] = ["1", "b2", "2", "b3", "3", "4", "b5", "5", "#5", "6", "b7", "7"];

/// Rotates a 12-bit mask left by `shift` positions (mod 12), treating bit 0 as the root.
///
/// Templates are generated once relative to C (root at bit 0) and then rotated into place for
/// each of the twelve roots; this is that rotation. Only the low 12 bits of `mask` are
/// meaningful; anything above bit 11 is ignored.
pub fn rotl12(mask: u16, shift: u8) -> u16 {
    let mask = mask & 0x0FFF;
    let shift = (shift % 12) as u32;
    if shift == 0 {
        return mask;
    }
    ((mask << shift) | (mask >> (12 - shift))) & 0x0FFF
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rotl_moves_the_root_bit() {
        assert_eq!(rotl12(0b0000_0000_0001, 4), 0b0000_0001_0000);
        let maj = 0b0000_1001_0001u16;
        assert_eq!(rotl12(maj, 0), maj);
    }

    #[test]
    fn rotl_wraps_high_bits_back_to_low() {
        assert_eq!(rotl12(0b1, 11), 1 << 11);
        assert_eq!(rotl12(1 << 11, 1), 0b1);
    }

    #[test]
    fn names_follow_chord_symbol_convention() {
        assert_eq!(PITCH_CLASS_NAMES[0], "C");
        assert_eq!(PITCH_CLASS_NAMES[3], "Eb");
        assert_eq!(PITCH_CLASS_NAMES[9], "A");
    }
}
