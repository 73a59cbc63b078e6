//! bgmforge sequence model
//!
//! This crate provides the in-memory form of a "BGM " music sequence asset:
//! the events a track is made of, the regions those events live in, the
//! symbolic labels control flow targets, and the document tying them to the
//! sixteen track slots of the container header.
//!
//! Byte offsets never appear in the model. Jumps, loops and subroutine calls
//! point at [`Label`]s; the codec turns labels into offsets when it encodes.
//!
//! # Example
//!
//! ```
//! use bgmforge_model::{Document, Event, Track};
//!
//! let mut doc = Document::new(*b"SONG");
//! let id = doc.add_region(Track::from_events([
//!     Event::set_tempo(120).unwrap(),
//!     Event::note_on(0x30, 100, 48).unwrap(),
//!     Event::rest(48).unwrap(),
//! ])).unwrap();
//! doc.set_slot(0, Some(id)).unwrap();
//!
//! assert!(doc.validate().is_empty());
//! assert_eq!(doc.track(0).unwrap().len(), 4);
//! ```
//!
//! # Modules
//!
//! - [`format`]: Container layout constants
//! - [`opcode`]: The static opcode table and operand ranges
//! - [`event`]: Events and labels
//! - [`track`]: Track regions and event positions
//! - [`document`]: The sequence document
//! - [`validation`]: Whole-document checks
//! - [`error`]: Shared error types

pub mod document;
pub mod error;
pub mod event;
pub mod format;
pub mod opcode;
pub mod track;
pub mod validation;

pub use document::{Document, DocumentParts, Reference, SlotEntry, Variation};
pub use error::{EngineError, TrackLookupError, ValueOutOfRange};
pub use event::{Event, Label};
pub use track::{EventPosition, Track, TrackEntry, TrackId};
pub use validation::{ValidationCode, ValidationError};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
