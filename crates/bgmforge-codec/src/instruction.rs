//! Single-instruction coding against the opcode table.

use std::io::{self, Cursor, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use bgmforge_model::opcode::{
    self, OpcodeKind, OperandLength, CONTROL_CHANGE, END_OF_TRACK, JUMP, JUMP_IF, LOOP, MARKER,
    NOTE_LONG_BIAS, NOTE_OFF, NOTE_ON_FIRST, REST_LONG_BIAS, REST_LONG_FIRST, SET_TEMPO,
    SUBROUTINE_CALL,
};
use bgmforge_model::{Event, Label};

use crate::error::DecodeError;
use crate::relocation::LabelResolver;

/// A decoded instruction.
///
/// Control-flow targets still hold raw byte offsets wrapped in `Label` until
/// the decoder interns them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Instruction {
    pub offset: usize,
    pub len: usize,
    pub event: Event,
}

impl Instruction {
    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    /// Raw target offsets of a control-flow instruction.
    pub fn raw_targets(&self) -> impl Iterator<Item = usize> {
        self.event.targets().map(|label| label.0 as usize)
    }
}

fn require(bytes: &[u8], offset: usize, len: usize) -> Result<(), DecodeError> {
    let available = bytes.len().saturating_sub(offset);
    if available < len {
        return Err(DecodeError::Truncated {
            offset,
            needed: len - available,
        });
    }
    Ok(())
}

/// Decode the instruction starting at `offset`.
pub(crate) fn read_instruction(bytes: &[u8], offset: usize) -> Result<Instruction, DecodeError> {
    require(bytes, offset, 1)?;
    let byte = bytes[offset];
    let info = opcode::lookup(byte).ok_or(DecodeError::MalformedOpcode { offset, byte })?;

    let len = match info.operands {
        OperandLength::Fixed(operands) => 1 + operands,
        OperandLength::NoteLength => {
            require(bytes, offset, 3)?;
            if u16::from(bytes[offset + 2]) < NOTE_LONG_BIAS {
                3
            } else {
                4
            }
        }
    };
    require(bytes, offset, len)?;

    let mut operands = Cursor::new(&bytes[offset + 1..offset + len]);
    let event = parse(byte, info.kind, &mut operands).map_err(|_| DecodeError::Truncated {
        offset,
        needed: 1,
    })?;
    event
        .check_operands()
        .map_err(|source| DecodeError::OperandOutOfRange { offset, source })?;

    Ok(Instruction { offset, len, event })
}

fn raw_target<R: Read>(r: &mut R) -> io::Result<Label> {
    Ok(Label(u32::from(r.read_u16::<BigEndian>()?)))
}

fn parse<R: Read>(byte: u8, kind: OpcodeKind, r: &mut R) -> io::Result<Event> {
    let event = match kind {
        OpcodeKind::EndOfTrack => Event::EndOfTrack,
        OpcodeKind::RestShort => Event::Rest {
            duration: u16::from(byte),
        },
        OpcodeKind::RestLong => {
            let low = r.read_u8()?;
            let high = u16::from(byte - REST_LONG_FIRST);
            Event::Rest {
                duration: ((high << 8) | u16::from(low)) + REST_LONG_BIAS,
            }
        }
        OpcodeKind::NoteOn => {
            let velocity = r.read_u8()?;
            let first = u16::from(r.read_u8()?);
            let duration = if first < NOTE_LONG_BIAS {
                first
            } else {
                let low = u16::from(r.read_u8()?);
                (((first - NOTE_LONG_BIAS) << 8) | low) + NOTE_LONG_BIAS
            };
            Event::NoteOn {
                pitch: byte - NOTE_ON_FIRST,
                velocity,
                duration,
            }
        }
        OpcodeKind::SetTempo => Event::SetTempo {
            bpm: r.read_u16::<BigEndian>()?,
        },
        OpcodeKind::ControlChange => Event::ControlChange {
            controller: r.read_u8()?,
            value: r.read_u8()?,
        },
        OpcodeKind::NoteOff => Event::NoteOff { pitch: r.read_u8()? },
        OpcodeKind::Marker => Event::Marker { id: r.read_u8()? },
        OpcodeKind::Jump => Event::jump(raw_target(r)?),
        OpcodeKind::JumpIf => {
            let condition = r.read_u8()?;
            Event::jump_if(condition, raw_target(r)?)
        }
        OpcodeKind::Loop => {
            let start = raw_target(r)?;
            let end = raw_target(r)?;
            Event::repeat(start, end, r.read_u8()?)
        }
        OpcodeKind::SubroutineCall => Event::call(raw_target(r)?),
    };
    Ok(event)
}

fn write_target(
    w: &mut Cursor<Vec<u8>>,
    label: Label,
    resolver: &mut LabelResolver,
) -> io::Result<()> {
    resolver.defer(w.position() as usize, label);
    w.write_u16::<BigEndian>(0)
}

/// Encode one event at the cursor. Target operands are written as
/// placeholders and recorded in `resolver` for backfilling.
pub(crate) fn write_instruction(
    w: &mut Cursor<Vec<u8>>,
    event: &Event,
    resolver: &mut LabelResolver,
) -> io::Result<()> {
    match *event {
        Event::EndOfTrack => w.write_u8(END_OF_TRACK)?,
        Event::Rest { duration } => {
            if duration < REST_LONG_BIAS {
                w.write_u8(duration as u8)?;
            } else {
                let biased = duration - REST_LONG_BIAS;
                w.write_u8(REST_LONG_FIRST | (biased >> 8) as u8)?;
                w.write_u8((biased & 0xFF) as u8)?;
            }
        }
        Event::NoteOn {
            pitch,
            velocity,
            duration,
        } => {
            w.write_u8(NOTE_ON_FIRST + pitch)?;
            w.write_u8(velocity)?;
            if duration < NOTE_LONG_BIAS {
                w.write_u8(duration as u8)?;
            } else {
                let biased = duration - NOTE_LONG_BIAS;
                w.write_u8(NOTE_LONG_BIAS as u8 | (biased >> 8) as u8)?;
                w.write_u8((biased & 0xFF) as u8)?;
            }
        }
        Event::SetTempo { bpm } => {
            w.write_u8(SET_TEMPO)?;
            w.write_u16::<BigEndian>(bpm)?;
        }
        Event::ControlChange { controller, value } => {
            w.write_all(&[CONTROL_CHANGE, controller, value])?;
        }
        Event::NoteOff { pitch } => w.write_all(&[NOTE_OFF, pitch])?,
        Event::Marker { id } => w.write_all(&[MARKER, id])?,
        Event::Jump {
            target,
            condition: None,
        } => {
            w.write_u8(JUMP)?;
            write_target(w, target, resolver)?;
        }
        Event::Jump {
            target,
            condition: Some(condition),
        } => {
            w.write_all(&[JUMP_IF, condition])?;
            write_target(w, target, resolver)?;
        }
        Event::Loop { start, end, count } => {
            w.write_u8(LOOP)?;
            write_target(w, start, resolver)?;
            write_target(w, end, resolver)?;
            w.write_u8(count)?;
        }
        Event::SubroutineCall { target } => {
            w.write_u8(SUBROUTINE_CALL)?;
            write_target(w, target, resolver)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn encode_one(event: &Event) -> Vec<u8> {
        let mut w = Cursor::new(Vec::new());
        let mut resolver = LabelResolver::new();
        write_instruction(&mut w, event, &mut resolver).unwrap();
        w.into_inner()
    }

    #[test]
    fn rest_forms() {
        assert_eq!(encode_one(&Event::rest(0x77).unwrap()), vec![0x77]);
        assert_eq!(encode_one(&Event::rest(0x78).unwrap()), vec![0x78, 0x00]);
        assert_eq!(encode_one(&Event::rest(0x877).unwrap()), vec![0x7F, 0xFF]);
        let long = read_instruction(&[0x7A, 0x10], 0).unwrap();
        assert_eq!(long.event, Event::Rest { duration: 0x288 });
        assert_eq!(long.len, 2);
    }

    #[test]
    fn note_length_forms() {
        let short = Event::note_on(0x3C, 0x64, 0xBF).unwrap();
        assert_eq!(encode_one(&short), vec![0xBC, 0x64, 0xBF]);
        let long = Event::note_on(0x3C, 0x64, 0x40BF).unwrap();
        assert_eq!(encode_one(&long), vec![0xBC, 0x64, 0xFF, 0xFF]);
        let decoded = read_instruction(&[0x80, 0x01, 0xC1, 0x02], 0).unwrap();
        assert_eq!(
            decoded.event,
            Event::NoteOn {
                pitch: 0,
                velocity: 1,
                duration: 0x1C2
            }
        );
    }

    #[test]
    fn every_event_length_matches_model() {
        let events = [
            Event::EndOfTrack,
            Event::rest(1).unwrap(),
            Event::rest(500).unwrap(),
            Event::note_on(1, 2, 3).unwrap(),
            Event::note_on(1, 2, 3000).unwrap(),
            Event::set_tempo(140).unwrap(),
            Event::control_change(7, 100).unwrap(),
            Event::note_off(5).unwrap(),
            Event::marker(3),
            Event::jump(Label(0)),
            Event::jump_if(1, Label(0)),
            Event::repeat(Label(0), Label(1), 4),
            Event::call(Label(0)),
        ];
        for event in &events {
            assert_eq!(encode_one(event).len(), event.byte_len(), "{:?}", event);
        }
    }

    #[test]
    fn targets_are_deferred() {
        let mut w = Cursor::new(vec![0xAA]);
        w.set_position(1);
        let mut resolver = LabelResolver::new();
        write_instruction(&mut w, &Event::repeat(Label(1), Label(2), 3), &mut resolver).unwrap();
        let at: Vec<usize> = resolver.fixups().iter().map(|f| f.at).collect();
        assert_eq!(at, vec![2, 4]);
        assert_eq!(w.into_inner(), vec![0xAA, LOOP, 0, 0, 0, 0, 3]);
    }

    #[test]
    fn raw_targets_before_interning() {
        let decoded = read_instruction(&[JUMP_IF, 0x02, 0x01, 0x40], 0).unwrap();
        assert_eq!(decoded.raw_targets().collect::<Vec<_>>(), vec![0x140]);
        assert_eq!(decoded.end(), 4);
    }

    #[test]
    fn reserved_and_truncated() {
        assert_eq!(
            read_instruction(&[0x00, 0xD4], 1).unwrap_err(),
            DecodeError::MalformedOpcode {
                offset: 1,
                byte: 0xD4
            }
        );
        assert_eq!(
            read_instruction(&[LOOP, 0x00, 0x40], 0).unwrap_err(),
            DecodeError::Truncated {
                offset: 0,
                needed: 3
            }
        );
        assert_eq!(
            read_instruction(&[0x80, 0x10, 0xC0], 0).unwrap_err(),
            DecodeError::Truncated {
                offset: 0,
                needed: 1
            }
        );
    }

    #[test]
    fn operand_ranges_checked_on_read() {
        let err = read_instruction(&[CONTROL_CHANGE, 0x80, 0x00], 4).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::OperandOutOfRange { offset: 4, ref source } if source.operand == "controller"
        ));
        let err = read_instruction(&[SET_TEMPO, 0x00, 0x00], 0).unwrap_err();
        assert!(matches!(err, DecodeError::OperandOutOfRange { .. }));
    }
}
