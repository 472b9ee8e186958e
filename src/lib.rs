//! Recognizes chord progressions from symbolic (MIDI-like) multi-track note streams.
//!
//! # Examples
//!
//! ```
//! use chordrec::core::types::{Note, Score, Track};
//! use chordrec::recognize_chords;
//!
//! let score = Score {
//!     tracks: vec![Track {
//!         name: "piano".into(),
//!         program: 0,
//!         is_drum: false,
//!         notes: vec![
//!             Note { pitch: 60, start: 0.0, duration: 4.0, velocity: 100 }, // C
//!             Note { pitch: 64, start: 0.0, duration: 4.0, velocity: 100 }, // E
//!             Note { pitch: 67, start: 0.0, duration: 4.0, velocity: 100 }, // G
//!         ],
//!     }],
//!     time_signatures: vec![],
//! };
//!
//! let spans = recognize_chords(&score, 1.0).unwrap();
//! assert_eq!(spans[0].name, "C:maj");
//! ```
//!
//! # Loading from MIDI
//!
//! With the `midi` feature (on by default), a [`core::types::Score`] can be built directly from
//! standard MIDI file bytes via [`loader::load_midi`].

#![warn(rustdoc::broken_intra_doc_links, rust_2018_idioms, clippy::all, missing_docs)]
#![allow(clippy::needless_range_loop)]

pub mod core;
pub mod error;
pub mod recognize;

#[cfg(feature = "midi")]
pub mod loader;

pub use error::{Error, Result};
pub use recognize::{recognize_chords, recognize_chords_with};
