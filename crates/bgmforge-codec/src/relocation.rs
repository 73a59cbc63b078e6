//! Label/offset bookkeeping for both codec directions.
//!
//! Decoding interns one label per distinct target offset. Encoding places
//! labels at the offsets their entries land on, records every operand that
//! refers to a label, and backfills those operands once layout is final.

use std::collections::BTreeMap;

use byteorder::{BigEndian, ByteOrder};

use bgmforge_model::Label;

use crate::error::EncodeError;
use crate::limits::CodecLimits;

/// A target operand waiting for its label's offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fixup {
    /// Buffer position of the two-byte operand.
    pub at: usize,
    pub label: Label,
}

/// Bidirectional label/offset map plus pending fixups.
#[derive(Debug, Clone, Default)]
pub struct LabelResolver {
    labels: BTreeMap<usize, Label>,
    offsets: BTreeMap<Label, usize>,
    fixups: Vec<Fixup>,
}

impl LabelResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Label for `offset`, creating the next one if the offset is new.
    ///
    /// Labels are numbered in interning order, so interning offsets in
    /// ascending order numbers labels by position. Do not mix with
    /// [`Self::place`] on one resolver.
    pub fn intern(&mut self, offset: usize) -> Label {
        if let Some(&label) = self.labels.get(&offset) {
            return label;
        }
        let label = Label(self.labels.len() as u32);
        self.place(label, offset);
        label
    }

    /// Record that `label` sits at `offset`.
    pub fn place(&mut self, label: Label, offset: usize) {
        self.labels.insert(offset, label);
        self.offsets.insert(label, offset);
    }

    pub fn label_at(&self, offset: usize) -> Option<Label> {
        self.labels.get(&offset).copied()
    }

    pub fn offset_of(&self, label: Label) -> Option<usize> {
        self.offsets.get(&label).copied()
    }

    /// Number of distinct labels known.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Remember that the operand at `at` must receive `label`'s offset.
    pub fn defer(&mut self, at: usize, label: Label) {
        self.fixups.push(Fixup { at, label });
    }

    pub fn fixups(&self) -> &[Fixup] {
        &self.fixups
    }

    /// Write every deferred operand into `buf`.
    pub fn backfill(&self, buf: &mut [u8]) -> Result<(), EncodeError> {
        for fixup in &self.fixups {
            let unresolved = EncodeError::UnresolvedLabel {
                label: fixup.label,
                at: fixup.at,
            };
            let Some(target) = self.offset_of(fixup.label) else {
                return Err(unresolved);
            };
            let target = u16::try_from(target).map_err(|_| EncodeError::BufferTooLarge {
                size: target,
                max: CodecLimits::CEILING,
            })?;
            let operand = buf.get_mut(fixup.at..fixup.at + 2).ok_or(unresolved)?;
            BigEndian::write_u16(operand, target);
        }
        Ok(())
    }
}
