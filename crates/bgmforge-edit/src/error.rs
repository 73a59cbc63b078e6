//! Edit rejection reasons.
//!
//! A rejected edit leaves the document exactly as it was; the caller may
//! retry with a corrected operation.

use thiserror::Error;

use bgmforge_model::{EngineError, EventPosition, Label, TrackId, TrackLookupError, ValueOutOfRange};

/// Why an edit operation was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    /// An operand is outside its encodable range.
    #[error("invalid operand: {0}")]
    InvalidOperand(#[from] ValueOutOfRange),

    /// Removing the event would leave a control-flow target dangling.
    #[error("removing the event at {at} would orphan label {label} targeted from {referrer}")]
    WouldOrphanLabel {
        label: Label,
        at: EventPosition,
        referrer: EventPosition,
    },

    /// The addressed track does not exist.
    #[error("no such track: {0}")]
    NoSuchTrack(#[from] TrackLookupError),

    /// The destination slot already holds a track.
    #[error("track slot {slot} is already in use")]
    SlotOccupied { slot: usize },

    /// The event index is past the end of the region.
    #[error("event index {index} out of range for track {track} ({len} events)")]
    IndexOutOfRange {
        track: TrackId,
        index: usize,
        len: usize,
    },

    /// A call route passes through an event that targets nothing.
    #[error("{mnemonic} at {at} is not a control-flow event")]
    NotControlFlow {
        at: EventPosition,
        mnemonic: &'static str,
    },

    /// A call route targets a label that is placed nowhere.
    #[error("label {label} is not placed in the document")]
    DanglingTarget { label: Label },

    /// The edit would leave a region without exactly one trailing EndOfTrack.
    #[error("edit at {at} would break the EndOfTrack terminator of track {}", .at.track)]
    BreaksTermination { at: EventPosition },

    /// Retime on an event without a duration.
    #[error("{mnemonic} at {at} has no duration")]
    NotRetimable {
        at: EventPosition,
        mnemonic: &'static str,
    },
}

impl EngineError for EditError {
    fn code(&self) -> &'static str {
        match self {
            EditError::InvalidOperand(_) => "EDIT_001",
            EditError::WouldOrphanLabel { .. } => "EDIT_002",
            EditError::NoSuchTrack(_) => "EDIT_003",
            EditError::SlotOccupied { .. } => "EDIT_004",
            EditError::IndexOutOfRange { .. } => "EDIT_005",
            EditError::NotControlFlow { .. } => "EDIT_006",
            EditError::DanglingTarget { .. } => "EDIT_007",
            EditError::BreaksTermination { .. } => "EDIT_008",
            EditError::NotRetimable { .. } => "EDIT_009",
        }
    }

    fn category(&self) -> &'static str {
        "edit"
    }
}
