//! Sequence commands and their encoded sizes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValueOutOfRange;
use crate::opcode::{
    BPM_MAX, BPM_MIN, NOTE_DURATION_MAX, NOTE_LONG_BIAS, PITCH_MAX, REST_LONG_BIAS, REST_MAX,
    REST_MIN, SEVEN_BIT_MAX,
};

/// Symbolic stand-in for a byte offset targeted by control flow.
///
/// Labels only become offsets when a document is encoded.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Label(pub u32);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// A single command in a track's stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Event {
    /// Start a note; `duration` is in ticks.
    NoteOn { pitch: u8, velocity: u8, duration: u16 },
    /// Stop a sounding note early.
    NoteOff { pitch: u8 },
    /// Set a 7-bit channel controller.
    ControlChange { controller: u8, value: u8 },
    /// Change the playback tempo.
    SetTempo { bpm: u16 },
    /// Continue at `target`, optionally only when `condition` holds.
    Jump { target: Label, condition: Option<u8> },
    /// Repeat the span between two labels `count` times.
    Loop { start: Label, end: Label, count: u8 },
    /// Wait `duration` ticks.
    Rest { duration: u16 },
    /// Terminates the region.
    EndOfTrack,
    /// Play from `target` until the end of its region, then return.
    SubroutineCall { target: Label },
    /// Cue point for the game.
    Marker { id: u8 },
}

impl Event {
    pub fn note_on(pitch: u8, velocity: u8, duration: u16) -> Result<Self, ValueOutOfRange> {
        let event = Event::NoteOn {
            pitch,
            velocity,
            duration,
        };
        event.check_operands()?;
        Ok(event)
    }

    pub fn note_off(pitch: u8) -> Result<Self, ValueOutOfRange> {
        let event = Event::NoteOff { pitch };
        event.check_operands()?;
        Ok(event)
    }

    pub fn control_change(controller: u8, value: u8) -> Result<Self, ValueOutOfRange> {
        let event = Event::ControlChange { controller, value };
        event.check_operands()?;
        Ok(event)
    }

    pub fn set_tempo(bpm: u16) -> Result<Self, ValueOutOfRange> {
        let event = Event::SetTempo { bpm };
        event.check_operands()?;
        Ok(event)
    }

    pub fn rest(duration: u16) -> Result<Self, ValueOutOfRange> {
        let event = Event::Rest { duration };
        event.check_operands()?;
        Ok(event)
    }

    pub fn jump(target: Label) -> Self {
        Event::Jump {
            target,
            condition: None,
        }
    }

    pub fn jump_if(condition: u8, target: Label) -> Self {
        Event::Jump {
            target,
            condition: Some(condition),
        }
    }

    pub fn repeat(start: Label, end: Label, count: u8) -> Self {
        Event::Loop { start, end, count }
    }

    pub fn call(target: Label) -> Self {
        Event::SubroutineCall { target }
    }

    pub fn marker(id: u8) -> Self {
        Event::Marker { id }
    }

    /// Check every operand against the byte widths of the native encoding.
    pub fn check_operands(&self) -> Result<(), ValueOutOfRange> {
        match *self {
            Event::NoteOn {
                pitch,
                velocity,
                duration,
            } => {
                ValueOutOfRange::check("pitch", pitch.into(), 0, PITCH_MAX.into())?;
                ValueOutOfRange::check("velocity", velocity.into(), 0, SEVEN_BIT_MAX.into())?;
                ValueOutOfRange::check("duration", duration.into(), 0, NOTE_DURATION_MAX.into())
            }
            Event::NoteOff { pitch } => {
                ValueOutOfRange::check("pitch", pitch.into(), 0, PITCH_MAX.into())
            }
            Event::ControlChange { controller, value } => {
                ValueOutOfRange::check("controller", controller.into(), 0, SEVEN_BIT_MAX.into())?;
                ValueOutOfRange::check("value", value.into(), 0, SEVEN_BIT_MAX.into())
            }
            Event::SetTempo { bpm } => {
                ValueOutOfRange::check("bpm", bpm.into(), BPM_MIN.into(), BPM_MAX.into())
            }
            Event::Rest { duration } => {
                ValueOutOfRange::check("duration", duration.into(), REST_MIN.into(), REST_MAX.into())
            }
            Event::Jump { .. }
            | Event::Loop { .. }
            | Event::EndOfTrack
            | Event::SubroutineCall { .. }
            | Event::Marker { .. } => Ok(()),
        }
    }

    /// Number of bytes the encoder emits for this event.
    pub fn byte_len(&self) -> usize {
        match *self {
            Event::EndOfTrack => 1,
            Event::Rest { duration } => {
                if duration < REST_LONG_BIAS {
                    1
                } else {
                    2
                }
            }
            Event::NoteOn { duration, .. } => {
                if duration < NOTE_LONG_BIAS {
                    3
                } else {
                    4
                }
            }
            Event::NoteOff { .. } | Event::Marker { .. } => 2,
            Event::ControlChange { .. } | Event::SetTempo { .. } => 3,
            Event::SubroutineCall { .. } => 3,
            Event::Jump { condition: None, .. } => 3,
            Event::Jump {
                condition: Some(_), ..
            } => 4,
            Event::Loop { .. } => 6,
        }
    }

    /// Mnemonic from the opcode table.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Event::NoteOn { .. } => "NoteOn",
            Event::NoteOff { .. } => "NoteOff",
            Event::ControlChange { .. } => "ControlChange",
            Event::SetTempo { .. } => "SetTempo",
            Event::Jump {
                condition: None, ..
            } => "Jump",
            Event::Jump {
                condition: Some(_), ..
            } => "JumpIf",
            Event::Loop { .. } => "Loop",
            Event::Rest { .. } => "Rest",
            Event::EndOfTrack => "EndOfTrack",
            Event::SubroutineCall { .. } => "SubroutineCall",
            Event::Marker { .. } => "Marker",
        }
    }

    pub fn is_end_of_track(&self) -> bool {
        matches!(self, Event::EndOfTrack)
    }

    /// Whether the event refers to labels.
    pub fn is_control_flow(&self) -> bool {
        matches!(
            self,
            Event::Jump { .. } | Event::Loop { .. } | Event::SubroutineCall { .. }
        )
    }

    /// Labels this event targets, in operand order.
    pub fn targets(&self) -> impl Iterator<Item = Label> {
        let (first, second) = match *self {
            Event::Jump { target, .. } | Event::SubroutineCall { target } => (Some(target), None),
            Event::Loop { start, end, .. } => (Some(start), Some(end)),
            _ => (None, None),
        };
        first.into_iter().chain(second)
    }

    /// The label a route through this event enters (the jump or call target,
    /// or the start of a loop).
    pub fn entry_target(&self) -> Option<Label> {
        self.targets().next()
    }

    /// Rewrite every target label through `map`.
    pub fn map_targets(&mut self, mut map: impl FnMut(Label) -> Label) {
        match self {
            Event::Jump { target, .. } | Event::SubroutineCall { target } => {
                *target = map(*target);
            }
            Event::Loop { start, end, .. } => {
                *start = map(*start);
                *end = map(*end);
            }
            _ => {}
        }
    }

    /// Duration in ticks for notes and rests.
    pub fn duration(&self) -> Option<u16> {
        match *self {
            Event::NoteOn { duration, .. } | Event::Rest { duration } => Some(duration),
            _ => None,
        }
    }

    /// Copy of this event with a new duration. `None` for events without one.
    pub fn with_duration(&self, duration: u16) -> Option<Result<Self, ValueOutOfRange>> {
        match *self {
            Event::NoteOn {
                pitch, velocity, ..
            } => Some(Event::note_on(pitch, velocity, duration)),
            Event::Rest { .. } => Some(Event::rest(duration)),
            _ => None,
        }
    }
}
