//! Error types shared by the sequence model, codec, and edit engine.

use thiserror::Error;

use crate::event::Label;
use crate::track::TrackId;

/// An event operand does not fit the byte width of the native encoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operand} = {value} is out of range ({min}..={max})")]
pub struct ValueOutOfRange {
    /// Operand name (e.g. "velocity").
    pub operand: &'static str,
    /// Offending value.
    pub value: u32,
    /// Smallest valid value.
    pub min: u32,
    /// Largest valid value.
    pub max: u32,
}

impl ValueOutOfRange {
    /// Check `value` against an inclusive range.
    pub fn check(operand: &'static str, value: u32, min: u32, max: u32) -> Result<(), Self> {
        if (min..=max).contains(&value) {
            Ok(())
        } else {
            Err(Self {
                operand,
                value,
                min,
                max,
            })
        }
    }
}

/// A track lookup could not be satisfied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackLookupError {
    /// The slot index is past the end of the track table.
    #[error("track index {index} out of range (0..{slots})")]
    TrackIndexOutOfRange { index: usize, slots: usize },

    /// The slot exists but holds the unused sentinel.
    #[error("track slot {index} is unused")]
    UnusedSlot { index: usize },

    /// A slot or reference names a region the document does not contain.
    #[error("track region {id} does not exist")]
    UnknownRegion { id: TrackId },

    /// The slot enters at a label that is placed nowhere.
    #[error("track slot {index} enters at label {label}, which is not placed")]
    UnplacedEntry { index: usize, label: Label },

    /// Every region id up to the highest one is spent.
    #[error("no region id left after {last}")]
    RegionIdsExhausted { last: TrackId },
}

impl EngineError for TrackLookupError {
    fn code(&self) -> &'static str {
        match self {
            TrackLookupError::TrackIndexOutOfRange { .. } => "TRACK_001",
            TrackLookupError::UnusedSlot { .. } => "TRACK_002",
            TrackLookupError::UnknownRegion { .. } => "TRACK_003",
            TrackLookupError::UnplacedEntry { .. } => "TRACK_004",
            TrackLookupError::RegionIdsExhausted { .. } => "TRACK_005",
        }
    }

    fn category(&self) -> &'static str {
        "document"
    }
}

impl EngineError for ValueOutOfRange {
    fn code(&self) -> &'static str {
        "EVENT_001"
    }

    fn category(&self) -> &'static str {
        "event"
    }
}

/// Common reporting surface for every error the engine returns.
///
/// An editor shell can surface any engine failure with a stable code and a
/// message that already carries the offset or operand context.
///
/// # Example
///
/// ```
/// use bgmforge_model::{EngineError, Event};
///
/// let err = Event::note_on(0x60, 100, 24).unwrap_err();
/// assert_eq!(err.code(), "EVENT_001");
/// assert!(err.message().contains("pitch"));
/// ```
pub trait EngineError: std::error::Error {
    /// Stable error code such as "DECODE_003".
    fn code(&self) -> &'static str;

    /// Error category such as "decode", "encode", or "edit".
    fn category(&self) -> &'static str;

    /// Human-readable message.
    fn message(&self) -> String {
        self.to_string()
    }
}
