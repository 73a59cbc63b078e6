//! Primitive document changes and the transactions that group them.
//!
//! Every edit operation is carried out as a sequence of [`Change`]s. Applying
//! a change returns the change that reverses it, so an operation's history
//! entry is simply the reversing changes in reverse order. Undo applies them
//! and gets the redo list back the same way.

use tracing::warn;

use bgmforge_model::{
    Document, EventPosition, SlotEntry, Track, TrackEntry, TrackId, TrackLookupError, Variation,
};

use crate::error::EditError;
use crate::operation::EditOperation;

/// One primitive, invertible mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    InsertEntry { at: EventPosition, entry: TrackEntry },
    RemoveEntry { at: EventPosition },
    ReplaceEntry { at: EventPosition, entry: TrackEntry },
    InsertRegion { id: TrackId, track: Track },
    RemoveRegion { id: TrackId },
    SetSlot { slot: usize, entry: Option<SlotEntry> },
    SetTimeBase(u16),
    SetVariations(Vec<Variation>),
    SetName([u8; 4]),
}

fn region_mut(doc: &mut Document, id: TrackId) -> Result<&mut Track, EditError> {
    doc.region_mut(id)
        .ok_or(EditError::NoSuchTrack(TrackLookupError::UnknownRegion { id }))
}

fn out_of_range(at: EventPosition, len: usize) -> EditError {
    EditError::IndexOutOfRange {
        track: at.track,
        index: at.index,
        len,
    }
}

impl Change {
    /// Perform the change and return its inverse.
    pub fn apply(self, doc: &mut Document) -> Result<Change, EditError> {
        let inverse = match self {
            Change::InsertEntry { at, entry } => {
                let entries = region_mut(doc, at.track)?.entries_mut();
                if at.index > entries.len() {
                    return Err(out_of_range(at, entries.len()));
                }
                entries.insert(at.index, entry);
                Change::RemoveEntry { at }
            }
            Change::RemoveEntry { at } => {
                let entries = region_mut(doc, at.track)?.entries_mut();
                if at.index >= entries.len() {
                    return Err(out_of_range(at, entries.len()));
                }
                let entry = entries.remove(at.index);
                Change::InsertEntry { at, entry }
            }
            Change::ReplaceEntry { at, entry } => {
                let entries = region_mut(doc, at.track)?.entries_mut();
                let len = entries.len();
                let slot = entries.get_mut(at.index).ok_or(out_of_range(at, len))?;
                let entry = std::mem::replace(slot, entry);
                Change::ReplaceEntry { at, entry }
            }
            Change::InsertRegion { id, track } => match doc.insert_region(id, track) {
                None => Change::RemoveRegion { id },
                Some(track) => Change::InsertRegion { id, track },
            },
            Change::RemoveRegion { id } => {
                let track = doc
                    .remove_region(id)
                    .ok_or(EditError::NoSuchTrack(TrackLookupError::UnknownRegion { id }))?;
                Change::InsertRegion { id, track }
            }
            Change::SetSlot { slot, entry } => {
                let entry = doc.set_slot_entry(slot, entry)?;
                Change::SetSlot { slot, entry }
            }
            Change::SetTimeBase(time_base) => {
                Change::SetTimeBase(std::mem::replace(&mut doc.time_base, time_base))
            }
            Change::SetVariations(variations) => {
                Change::SetVariations(std::mem::replace(&mut doc.variations, variations))
            }
            Change::SetName(name) => Change::SetName(std::mem::replace(&mut doc.name, name)),
        };
        Ok(inverse)
    }
}

/// Changes applied so far, undone again unless committed.
pub(crate) struct Transaction<'a> {
    doc: &'a mut Document,
    inverses: Vec<Change>,
}

impl<'a> Transaction<'a> {
    pub fn new(doc: &'a mut Document) -> Self {
        Self {
            doc,
            inverses: Vec::new(),
        }
    }

    pub fn doc(&self) -> &Document {
        &*self.doc
    }

    pub fn apply(&mut self, change: Change) -> Result<(), EditError> {
        let inverse = change.apply(self.doc)?;
        self.inverses.push(inverse);
        Ok(())
    }

    /// Keep the changes; returns what reverses them, in application order.
    pub fn commit(mut self) -> Vec<Change> {
        self.inverses.reverse();
        self.inverses
    }

    /// Undo everything applied so far.
    pub fn rollback(self) {
        for inverse in self.inverses.into_iter().rev() {
            if let Err(err) = inverse.apply(self.doc) {
                // Inverses of applied changes always apply; this is a bug.
                warn!(error = %err, "rollback change failed");
            }
        }
    }
}

/// A recorded edit: the operation and the changes that reverse it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    operation: EditOperation,
    changes: Vec<Change>,
}

impl Patch {
    pub(crate) fn new(operation: EditOperation, changes: Vec<Change>) -> Self {
        Self { operation, changes }
    }

    pub fn operation(&self) -> &EditOperation {
        &self.operation
    }

    /// Changes that reverse this patch, in the order they apply.
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Apply the reversing changes and return the patch that reverses them
    /// in turn. Undo flips a patch; redo flips it back. On failure the
    /// document is left as it was.
    pub fn flip(&self, doc: &mut Document) -> Result<Patch, EditError> {
        let mut tx = Transaction::new(doc);
        for change in &self.changes {
            if let Err(err) = tx.apply(change.clone()) {
                tx.rollback();
                return Err(err);
            }
        }
        Ok(Patch::new(self.operation.clone(), tx.commit()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bgmforge_model::{Event, Label};
    use pretty_assertions::assert_eq;

    fn document() -> Document {
        let mut doc = Document::new(*b"TEST");
        let id = doc.add_region(Track::from_events([Event::marker(1)])).unwrap();
        doc.set_slot(0, Some(id)).unwrap();
        doc
    }

    #[test]
    fn every_change_inverts() {
        let at = EventPosition::new(TrackId(0), 0);
        let changes = vec![
            Change::InsertEntry {
                at,
                entry: TrackEntry::labelled(Label(4), Event::marker(9)),
            },
            Change::RemoveEntry { at },
            Change::ReplaceEntry {
                at,
                entry: Event::marker(2).into(),
            },
            Change::InsertRegion {
                id: TrackId(5),
                track: Track::new(),
            },
            Change::RemoveRegion { id: TrackId(0) },
            Change::SetSlot {
                slot: 3,
                entry: Some(SlotEntry::Region(TrackId(0))),
            },
            Change::SetSlot {
                slot: 0,
                entry: Some(SlotEntry::Label(Label(1))),
            },
            Change::SetTimeBase(96),
            Change::SetVariations(vec![Variation::new(1, true)]),
            Change::SetName(*b"NEW "),
        ];
        for change in changes {
            let mut doc = document();
            let before = doc.clone();
            let inverse = change.clone().apply(&mut doc).unwrap();
            assert_ne!(doc, before, "{:?} changed nothing", change);
            inverse.apply(&mut doc).unwrap();
            assert_eq!(doc, before, "{:?} did not invert", change);
        }
    }

    #[test]
    fn rollback_restores_document() {
        let mut doc = document();
        let before = doc.clone();
        let mut tx = Transaction::new(&mut doc);
        tx.apply(Change::SetTimeBase(24)).unwrap();
        tx.apply(Change::RemoveEntry {
            at: EventPosition::new(TrackId(0), 0),
        })
        .unwrap();
        let err = tx
            .apply(Change::RemoveEntry {
                at: EventPosition::new(TrackId(0), 7),
            })
            .unwrap_err();
        assert!(matches!(err, EditError::IndexOutOfRange { index: 7, .. }));
        tx.rollback();
        assert_eq!(doc, before);
    }

    #[test]
    fn flip_twice_is_identity() {
        let mut doc = document();
        let original = doc.clone();
        let mut tx = Transaction::new(&mut doc);
        tx.apply(Change::SetName(*b"ABCD")).unwrap();
        tx.apply(Change::SetTimeBase(120)).unwrap();
        let patch = Patch::new(EditOperation::SetName { name: *b"ABCD" }, tx.commit());
        let edited = doc.clone();

        let redo = patch.flip(&mut doc).unwrap();
        assert_eq!(doc, original);
        redo.flip(&mut doc).unwrap();
        assert_eq!(doc, edited);
    }
}
