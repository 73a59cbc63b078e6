//! Static opcode table for the sequence command stream.
//!
//! Each track is a stream of one-byte opcodes followed by fixed or
//! self-describing operands. The table below is the single source of truth
//! for byte values, mnemonics, and operand ranges; the codec and the event
//! model both read from it.
//!
//! | Byte(s)       | Mnemonic         | Operands                               |
//! |---------------|------------------|----------------------------------------|
//! | `00`          | `EndOfTrack`     |                                        |
//! | `01..=77`     | `Rest`           | duration in the opcode                 |
//! | `78..=7F`     | `Rest`           | 11-bit duration, biased by 0x78        |
//! | `80..=D3`     | `NoteOn`         | pitch in the opcode, velocity, length  |
//! | `E0`          | `SetTempo`       | u16 bpm                                |
//! | `E1`          | `ControlChange`  | controller, value                      |
//! | `E2`          | `NoteOff`        | pitch                                  |
//! | `E3`          | `Marker`         | id                                     |
//! | `E4`          | `Jump`           | u16 target                             |
//! | `E5`          | `JumpIf`         | condition, u16 target                  |
//! | `E6`          | `Loop`           | u16 start, u16 end, count              |
//! | `E7`          | `SubroutineCall` | u16 target                             |
//!
//! `D4..=DF` and `E8..=FF` are reserved and rejected by the decoder.

/// Terminates a track region.
pub const END_OF_TRACK: u8 = 0x00;

/// Last opcode of the one-byte rest form.
pub const REST_SHORT_LAST: u8 = 0x77;

/// First opcode of the two-byte rest form.
pub const REST_LONG_FIRST: u8 = 0x78;

/// Last opcode of the two-byte rest form.
pub const REST_LONG_LAST: u8 = 0x7F;

/// First note-on opcode (pitch 0).
pub const NOTE_ON_FIRST: u8 = 0x80;

/// Last note-on opcode (highest pitch).
pub const NOTE_ON_LAST: u8 = 0xD3;

pub const SET_TEMPO: u8 = 0xE0;
pub const CONTROL_CHANGE: u8 = 0xE1;
pub const NOTE_OFF: u8 = 0xE2;
pub const MARKER: u8 = 0xE3;
pub const JUMP: u8 = 0xE4;
pub const JUMP_IF: u8 = 0xE5;
pub const LOOP: u8 = 0xE6;
pub const SUBROUTINE_CALL: u8 = 0xE7;

/// Highest reserved-but-undefined opcode.
pub const HIGHEST_RESERVED: u8 = 0xFF;

/// Rests shorter than this use the one-byte form.
pub const REST_LONG_BIAS: u16 = 0x78;

/// Note lengths shorter than this use the one-byte form.
pub const NOTE_LONG_BIAS: u16 = 0xC0;

/// Largest pitch a note-on opcode can carry.
pub const PITCH_MAX: u8 = NOTE_ON_LAST - NOTE_ON_FIRST;

/// Largest 7-bit operand (velocity, controller, controller value).
pub const SEVEN_BIT_MAX: u8 = 0x7F;

/// Shortest encodable rest (a zero rest would collide with `EndOfTrack`).
pub const REST_MIN: u16 = 1;

/// Longest encodable rest.
pub const REST_MAX: u16 = REST_LONG_BIAS + 0x07FF;

/// Longest encodable note length.
pub const NOTE_DURATION_MAX: u16 = NOTE_LONG_BIAS + 0x3FFF;

/// Slowest tempo accepted by the sound engine.
pub const BPM_MIN: u16 = 1;

/// Fastest tempo accepted by the sound engine.
pub const BPM_MAX: u16 = 999;

/// Kind of instruction an opcode introduces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpcodeKind {
    EndOfTrack,
    RestShort,
    RestLong,
    NoteOn,
    SetTempo,
    ControlChange,
    NoteOff,
    Marker,
    Jump,
    JumpIf,
    Loop,
    SubroutineCall,
}

/// How many operand bytes follow an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandLength {
    /// A fixed number of bytes.
    Fixed(usize),
    /// A velocity byte followed by a one- or two-byte note length.
    NoteLength,
}

/// One row of the opcode table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeInfo {
    /// First byte value of the range.
    pub first: u8,
    /// Last byte value of the range (inclusive).
    pub last: u8,
    /// Instruction kind.
    pub kind: OpcodeKind,
    /// Human-readable mnemonic.
    pub mnemonic: &'static str,
    /// Operand bytes after the opcode.
    pub operands: OperandLength,
}

impl OpcodeInfo {
    /// Whether `byte` falls inside this row's range.
    pub const fn contains(&self, byte: u8) -> bool {
        byte >= self.first && byte <= self.last
    }
}

const fn row(
    first: u8,
    last: u8,
    kind: OpcodeKind,
    mnemonic: &'static str,
    operands: OperandLength,
) -> OpcodeInfo {
    OpcodeInfo {
        first,
        last,
        kind,
        mnemonic,
        operands,
    }
}

/// The complete opcode table, in ascending byte order.
pub const OPCODE_TABLE: &[OpcodeInfo] = &[
    row(END_OF_TRACK, END_OF_TRACK, OpcodeKind::EndOfTrack, "EndOfTrack", OperandLength::Fixed(0)),
    row(0x01, REST_SHORT_LAST, OpcodeKind::RestShort, "Rest", OperandLength::Fixed(0)),
    row(REST_LONG_FIRST, REST_LONG_LAST, OpcodeKind::RestLong, "Rest", OperandLength::Fixed(1)),
    row(NOTE_ON_FIRST, NOTE_ON_LAST, OpcodeKind::NoteOn, "NoteOn", OperandLength::NoteLength),
    row(SET_TEMPO, SET_TEMPO, OpcodeKind::SetTempo, "SetTempo", OperandLength::Fixed(2)),
    row(CONTROL_CHANGE, CONTROL_CHANGE, OpcodeKind::ControlChange, "ControlChange", OperandLength::Fixed(2)),
    row(NOTE_OFF, NOTE_OFF, OpcodeKind::NoteOff, "NoteOff", OperandLength::Fixed(1)),
    row(MARKER, MARKER, OpcodeKind::Marker, "Marker", OperandLength::Fixed(1)),
    row(JUMP, JUMP, OpcodeKind::Jump, "Jump", OperandLength::Fixed(2)),
    row(JUMP_IF, JUMP_IF, OpcodeKind::JumpIf, "JumpIf", OperandLength::Fixed(3)),
    row(LOOP, LOOP, OpcodeKind::Loop, "Loop", OperandLength::Fixed(5)),
    row(SUBROUTINE_CALL, SUBROUTINE_CALL, OpcodeKind::SubroutineCall, "SubroutineCall", OperandLength::Fixed(2)),
];

/// Look up the table row for an opcode byte. Reserved bytes return `None`.
pub fn lookup(byte: u8) -> Option<&'static OpcodeInfo> {
    OPCODE_TABLE.iter().find(|info| info.contains(byte))
}

/// Whether `byte` is reserved (not assigned to any instruction).
pub fn is_reserved(byte: u8) -> bool {
    lookup(byte).is_none()
}
