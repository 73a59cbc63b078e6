//! Carrying out edit operations.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use bgmforge_model::format::{MAX_VARIATIONS, TIME_BASE_MAX, TIME_BASE_MIN, TRACK_SLOTS};
use bgmforge_model::{
    Document, Event, EventPosition, Label, SlotEntry, Track, TrackEntry, TrackId, ValueOutOfRange,
};

use crate::change::{Change, Patch, Transaction};
use crate::error::EditError;
use crate::operation::{EditOperation, EventAddress};
use crate::route::{check_index, position_for_edit, release_label};

/// Apply `operation` to `doc` as one atomic step.
///
/// On success the returned patch reverses the edit when flipped. On failure
/// the document is unchanged.
pub fn apply(doc: &mut Document, operation: &EditOperation) -> Result<Patch, EditError> {
    let reachable = doc.entry_points();
    let mut tx = Transaction::new(doc);
    let result = perform(&mut tx, operation)
        .and_then(|()| collect_unreachable(&mut tx, &reachable))
        .and_then(|()| normalize_slot_entries(&mut tx));
    match result {
        Ok(()) => {
            let changes = tx.commit();
            debug!(operation = operation.name(), changes = changes.len(), "applied edit");
            Ok(Patch::new(operation.clone(), changes))
        }
        Err(err) => {
            tx.rollback();
            warn!(operation = operation.name(), error = %err, "edit rejected");
            Err(err)
        }
    }
}

fn perform(tx: &mut Transaction<'_>, operation: &EditOperation) -> Result<(), EditError> {
    match operation {
        EditOperation::Insert { at, event } => insert(tx, at, event),
        EditOperation::Remove { at } => remove(tx, at),
        EditOperation::Replace { at, event } => {
            event.check_operands()?;
            let (position, old) = existing(tx, at)?;
            replace(tx, position, old, event.clone())
        }
        EditOperation::Retime { at, duration } => {
            let (position, old) = existing(tx, at)?;
            let event = old.event.with_duration(*duration).ok_or(EditError::NotRetimable {
                at: position,
                mnemonic: old.event.mnemonic(),
            })??;
            replace(tx, position, old, event)
        }
        EditOperation::AttachLabel { at } => {
            let (position, old) = existing(tx, at)?;
            if old.label.is_some() {
                return Ok(());
            }
            let label = tx.doc().next_label();
            tx.apply(Change::ReplaceEntry {
                at: position,
                entry: TrackEntry::labelled(label, old.event),
            })
        }
        EditOperation::AddTrack { slot } => {
            if tx.doc().slot(*slot)?.is_some() {
                return Err(EditError::SlotOccupied { slot: *slot });
            }
            let id = tx.doc().next_track_id()?;
            tx.apply(Change::InsertRegion {
                id,
                track: Track::new(),
            })?;
            tx.apply(Change::SetSlot {
                slot: *slot,
                entry: Some(SlotEntry::Region(id)),
            })
        }
        EditOperation::RemoveTrack { slot } => {
            let entry = tx.doc().used_slot(*slot)?;
            tx.apply(Change::SetSlot {
                slot: *slot,
                entry: None,
            })?;
            match entry {
                SlotEntry::Label(label) => release_label(tx, label),
                SlotEntry::Region(_) => Ok(()),
            }
        }
        EditOperation::MoveTrack { from, to } => {
            let entry = tx.doc().used_slot(*from)?;
            if from == to {
                return Ok(());
            }
            if tx.doc().slot(*to)?.is_some() {
                return Err(EditError::SlotOccupied { slot: *to });
            }
            tx.apply(Change::SetSlot {
                slot: *from,
                entry: None,
            })?;
            tx.apply(Change::SetSlot {
                slot: *to,
                entry: Some(entry),
            })
        }
        EditOperation::SetTimeBase { time_base } => {
            ValueOutOfRange::check(
                "time_base",
                u32::from(*time_base),
                u32::from(TIME_BASE_MIN),
                u32::from(TIME_BASE_MAX),
            )?;
            tx.apply(Change::SetTimeBase(*time_base))
        }
        EditOperation::SetVariations { variations } => {
            ValueOutOfRange::check(
                "variations",
                variations.len() as u32,
                0,
                MAX_VARIATIONS as u32,
            )?;
            tx.apply(Change::SetVariations(variations.clone()))
        }
        EditOperation::SetName { name } => tx.apply(Change::SetName(*name)),
    }
}

/// Resolve an address for mutation and fetch the entry there.
fn existing(
    tx: &mut Transaction<'_>,
    at: &EventAddress,
) -> Result<(EventPosition, TrackEntry), EditError> {
    let position = position_for_edit(tx, at)?;
    check_index(tx.doc(), position)?;
    let entry = tx
        .doc()
        .entry(position)
        .cloned()
        .ok_or(EditError::IndexOutOfRange {
            track: position.track,
            index: position.index,
            len: 0,
        })?;
    Ok((position, entry))
}

fn insert(tx: &mut Transaction<'_>, at: &EventAddress, event: &Event) -> Result<(), EditError> {
    event.check_operands()?;
    let position = position_for_edit(tx, at)?;
    let len = tx.doc().region(position.track).map_or(0, Track::len);
    if position.index > len {
        return Err(EditError::IndexOutOfRange {
            track: position.track,
            index: position.index,
            len,
        });
    }
    // Appending after EndOfTrack is as broken as inserting another one.
    if event.is_end_of_track() || position.index == len {
        return Err(EditError::BreaksTermination { at: position });
    }

    let mut label = None;
    if let Some(current) = tx.doc().entry(position).cloned() {
        if current.label.is_some() {
            label = current.label;
            tx.apply(Change::ReplaceEntry {
                at: position,
                entry: TrackEntry::new(current.event),
            })?;
        }
    }
    tx.apply(Change::InsertEntry {
        at: position,
        entry: TrackEntry {
            label,
            event: event.clone(),
        },
    })
}

fn remove(tx: &mut Transaction<'_>, at: &EventAddress) -> Result<(), EditError> {
    let (position, entry) = existing(tx, at)?;
    if entry.event.is_end_of_track() {
        return Err(EditError::BreaksTermination { at: position });
    }
    if let Some(label) = entry.label {
        let referrer = tx
            .doc()
            .referrers_of(label)
            .into_iter()
            .find(|referrer| *referrer != position);
        if let Some(referrer) = referrer {
            return Err(EditError::WouldOrphanLabel {
                label,
                at: position,
                referrer,
            });
        }
    }
    tx.apply(Change::RemoveEntry { at: position })?;
    if let Some(label) = entry.label {
        let slots = tx.doc().slots_entering(label);
        if !slots.is_empty() {
            hand_over_slot_label(tx, label, position, &slots)?;
        }
    }
    Ok(())
}

/// Slots that entered at a removed event start at the event after it.
fn hand_over_slot_label(
    tx: &mut Transaction<'_>,
    label: Label,
    position: EventPosition,
    slots: &[usize],
) -> Result<(), EditError> {
    let next = tx
        .doc()
        .entry(position)
        .cloned()
        .ok_or(EditError::BreaksTermination { at: position })?;
    match next.label {
        None => tx.apply(Change::ReplaceEntry {
            at: position,
            entry: TrackEntry::labelled(label, next.event),
        }),
        Some(existing) => {
            for &slot in slots {
                tx.apply(Change::SetSlot {
                    slot,
                    entry: Some(SlotEntry::Label(existing)),
                })?;
            }
            Ok(())
        }
    }
}

fn replace(
    tx: &mut Transaction<'_>,
    position: EventPosition,
    old: TrackEntry,
    event: Event,
) -> Result<(), EditError> {
    if old.event.is_end_of_track() != event.is_end_of_track() {
        return Err(EditError::BreaksTermination { at: position });
    }
    tx.apply(Change::ReplaceEntry {
        at: position,
        entry: TrackEntry {
            label: old.label,
            event,
        },
    })
}

/// Drop what the edit cut off from the track table: whole regions nothing
/// reaches any more, and the leading events of regions now only entered
/// part way in. Regions that were not fully reachable before are left alone.
fn collect_unreachable(
    tx: &mut Transaction<'_>,
    before: &BTreeMap<TrackId, usize>,
) -> Result<(), EditError> {
    let after = tx.doc().entry_points();
    let ids: Vec<TrackId> = tx.doc().regions().map(|(id, _)| id).collect();
    for id in ids {
        if before.get(&id) != Some(&0) {
            continue;
        }
        match after.get(&id) {
            Some(0) => {}
            Some(&start) => {
                debug!(track = %id, events = start, "trimming unreachable events");
                for _ in 0..start {
                    tx.apply(Change::RemoveEntry {
                        at: EventPosition::new(id, 0),
                    })?;
                }
            }
            None => {
                debug!(track = %id, "removing unreachable region");
                tx.apply(Change::RemoveRegion { id })?;
            }
        }
    }
    Ok(())
}

/// A slot entering at the first event of a region names the region, the way
/// decoding reads it back. The label goes too once nothing else uses it.
fn normalize_slot_entries(tx: &mut Transaction<'_>) -> Result<(), EditError> {
    for slot in 0..TRACK_SLOTS {
        let Some(SlotEntry::Label(label)) = tx.doc().slot(slot)? else {
            continue;
        };
        let Ok(start) = tx.doc().slot_start(slot) else {
            continue;
        };
        if start.index != 0 {
            continue;
        }
        tx.apply(Change::SetSlot {
            slot,
            entry: Some(SlotEntry::Region(start.track)),
        })?;
        release_label(tx, label)?;
    }
    Ok(())
}
