//! Decode and encode errors.
//!
//! Every decode error carries the byte offset it was detected at so a user
//! can find the problem in the original asset.

use thiserror::Error;

use bgmforge_model::{EngineError, Label, TrackId, ValidationError, ValueOutOfRange};

/// Malformed input. Decoding stops at the first problem found.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The buffer ends before a header field or instruction is complete.
    #[error("truncated at {offset:#06x}: {needed} more byte(s) needed")]
    Truncated { offset: usize, needed: usize },

    /// The first four bytes are not "BGM ".
    #[error("invalid magic {found:02x?}, expected \"BGM \"")]
    InvalidMagic { found: [u8; 4] },

    /// The size field disagrees with the buffer length.
    #[error("header declares {declared} bytes but the buffer holds {actual}")]
    SizeMismatch { declared: u32, actual: usize },

    /// The asset exceeds the configured capacity.
    #[error("asset is {size} bytes, the limit is {max}")]
    BufferTooLarge { size: usize, max: usize },

    /// A header field holds a value the format does not allow.
    #[error("invalid header field at {offset:#06x}: {reason}")]
    InvalidHeader { offset: usize, reason: String },

    /// A reserved opcode byte where an instruction was expected.
    #[error("reserved opcode {byte:#04x} at {offset:#06x}")]
    MalformedOpcode { offset: usize, byte: u8 },

    /// A control-flow target outside the region area or inside another
    /// instruction.
    #[error("target {offset:#06x} referenced at {referrer:#06x} is not an instruction start")]
    UnresolvableTarget { offset: usize, referrer: usize },

    /// Two decoded instructions share bytes.
    #[error("instruction at {offset:#06x} overlaps another instruction")]
    OverlappingInstruction { offset: usize },

    /// A track slot points outside the region area or into a region.
    #[error("track slot {slot} offset {offset:#06x} is not the start of a track region")]
    BadTrackOffset { slot: usize, offset: u16 },

    /// An operand byte is outside its valid range.
    #[error("operand out of range at {offset:#06x}: {source}")]
    OperandOutOfRange {
        offset: usize,
        source: ValueOutOfRange,
    },
}

impl EngineError for DecodeError {
    fn code(&self) -> &'static str {
        match self {
            DecodeError::Truncated { .. } => "DECODE_001",
            DecodeError::InvalidMagic { .. } => "DECODE_002",
            DecodeError::SizeMismatch { .. } => "DECODE_003",
            DecodeError::BufferTooLarge { .. } => "DECODE_004",
            DecodeError::InvalidHeader { .. } => "DECODE_005",
            DecodeError::MalformedOpcode { .. } => "DECODE_006",
            DecodeError::UnresolvableTarget { .. } => "DECODE_007",
            DecodeError::OverlappingInstruction { .. } => "DECODE_008",
            DecodeError::BadTrackOffset { .. } => "DECODE_009",
            DecodeError::OperandOutOfRange { .. } => "DECODE_010",
        }
    }

    fn category(&self) -> &'static str {
        "decode"
    }
}

impl DecodeError {
    /// Byte offset the error was detected at.
    pub fn offset(&self) -> usize {
        match *self {
            DecodeError::Truncated { offset, .. }
            | DecodeError::InvalidHeader { offset, .. }
            | DecodeError::MalformedOpcode { offset, .. }
            | DecodeError::UnresolvableTarget { offset, .. }
            | DecodeError::OverlappingInstruction { offset }
            | DecodeError::OperandOutOfRange { offset, .. } => offset,
            DecodeError::BadTrackOffset { offset, .. } => usize::from(offset),
            DecodeError::InvalidMagic { .. } => 0,
            DecodeError::SizeMismatch { .. } | DecodeError::BufferTooLarge { .. } => {
                bgmforge_model::format::SIZE_OFFSET
            }
        }
    }
}

/// The document could not be encoded.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Pre-flight validation failed; nothing was written.
    #[error("document failed validation with {} error(s)", .0.len())]
    Invalid(Vec<ValidationError>),

    /// The encoded asset does not fit the capacity ceiling.
    #[error("encoded asset is {size} bytes, the limit is {max}")]
    BufferTooLarge { size: usize, max: usize },

    /// A control-flow operand names a label that was never placed.
    #[error("label {label} used at {at:#06x} was never placed")]
    UnresolvedLabel { label: Label, at: usize },

    /// A slot names a region that was not laid out.
    #[error("track slot {slot} refers to region {id} which was not laid out")]
    MissingRegion { slot: usize, id: TrackId },

    /// A slot enters at a label that was never placed.
    #[error("track slot {slot} enters at label {label} which was never placed")]
    UnplacedEntry { slot: usize, label: Label },

    /// Padding to this alignment could never fit the capacity ceiling.
    #[error("alignment {alignment} is larger than the {max}-byte limit")]
    InvalidAlignment { alignment: usize, max: usize },

    /// I/O error from the output buffer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError for EncodeError {
    fn code(&self) -> &'static str {
        match self {
            EncodeError::Invalid(_) => "ENCODE_001",
            EncodeError::BufferTooLarge { .. } => "ENCODE_002",
            EncodeError::UnresolvedLabel { .. } => "ENCODE_003",
            EncodeError::MissingRegion { .. } => "ENCODE_004",
            EncodeError::Io(_) => "ENCODE_005",
            EncodeError::UnplacedEntry { .. } => "ENCODE_006",
            EncodeError::InvalidAlignment { .. } => "ENCODE_007",
        }
    }

    fn category(&self) -> &'static str {
        "encode"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_messages_carry_offsets() {
        let err = DecodeError::MalformedOpcode {
            offset: 0x30,
            byte: 0xFF,
        };
        assert_eq!(err.to_string(), "reserved opcode 0xff at 0x0030");
        assert_eq!(err.offset(), 0x30);
        assert_eq!(err.code(), "DECODE_006");
    }

    #[test]
    fn invalid_lists_error_count() {
        let err = EncodeError::Invalid(Vec::new());
        assert_eq!(err.to_string(), "document failed validation with 0 error(s)");
        assert_eq!(err.category(), "encode");
    }
}
