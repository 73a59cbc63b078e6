//! Address resolution and fork-on-edit.

use std::collections::BTreeMap;

use tracing::debug;

use bgmforge_model::{
    Document, EventPosition, Label, SlotEntry, Track, TrackEntry, TrackId, TrackLookupError,
};

use crate::change::{Change, Transaction};
use crate::error::EditError;
use crate::operation::{EventAddress, Route};

fn region_len(doc: &Document, id: TrackId) -> Result<usize, EditError> {
    doc.region(id)
        .map(Track::len)
        .ok_or(EditError::NoSuchTrack(TrackLookupError::UnknownRegion { id }))
}

/// Fail unless `at` names an existing event.
pub(crate) fn check_index(doc: &Document, at: EventPosition) -> Result<(), EditError> {
    let len = region_len(doc, at.track)?;
    if at.index >= len {
        return Err(EditError::IndexOutOfRange {
            track: at.track,
            index: at.index,
            len,
        });
    }
    Ok(())
}

/// The label the control-flow event at `at` enters through.
fn entry_target(doc: &Document, at: EventPosition) -> Result<Label, EditError> {
    check_index(doc, at)?;
    let event = doc.event(at).ok_or(EditError::IndexOutOfRange {
        track: at.track,
        index: at.index,
        len: 0,
    })?;
    event.entry_target().ok_or(EditError::NotControlFlow {
        at,
        mnemonic: event.mnemonic(),
    })
}

fn entered_at(doc: &Document, label: Label) -> Result<EventPosition, EditError> {
    doc.locate(label).ok_or(EditError::DanglingTarget { label })
}

/// Region and base index a route enters at.
fn entry_of(doc: &Document, route: &Route) -> Result<(TrackId, usize), EditError> {
    match route {
        Route::Slot(slot) => {
            let start = doc.slot_start(*slot)?;
            Ok((start.track, start.index))
        }
        Route::Call(caller) => {
            let at = locate(doc, caller)?;
            let entered = entered_at(doc, entry_target(doc, at)?)?;
            Ok((entered.track, entered.index))
        }
    }
}

/// Position of an existing event, without changing anything.
pub fn locate(doc: &Document, address: &EventAddress) -> Result<EventPosition, EditError> {
    let (track, base) = entry_of(doc, &address.route)?;
    let position = EventPosition::new(track, base + address.index);
    check_index(doc, position)?;
    Ok(position)
}

/// Resolve `route` for mutation.
///
/// Every shared region on the way is forked so that the region returned is
/// reached through this route alone.
pub(crate) fn entry_for_edit(
    tx: &mut Transaction<'_>,
    route: &Route,
) -> Result<(TrackId, usize), EditError> {
    match route {
        Route::Slot(slot) => {
            let start = tx.doc().slot_start(*slot)?;
            if !tx.doc().is_shared(start.track) {
                return Ok((start.track, start.index));
            }
            let previous = tx.doc().used_slot(*slot)?;
            let (fork, labels) = fork(tx, start.track, start.index)?;
            tx.apply(Change::SetSlot {
                slot: *slot,
                entry: Some(SlotEntry::Region(fork)),
            })?;
            // Labels only outside references used stay with the original.
            if let SlotEntry::Label(label) = previous {
                release_label(tx, label)?;
            }
            for fresh in labels.into_values() {
                release_label(tx, fresh)?;
            }
            debug!(slot, from = %start.track, to = %fork, "forked shared track");
            Ok((fork, 0))
        }
        Route::Call(caller) => {
            let (track, base) = entry_for_edit(tx, &caller.route)?;
            let at = EventPosition::new(track, base + caller.index);
            let entered = entered_at(tx.doc(), entry_target(tx.doc(), at)?)?;
            if !tx.doc().is_shared(entered.track) {
                return Ok((entered.track, entered.index));
            }

            let (fork, labels) = fork(tx, entered.track, entered.index)?;
            let mut entry = tx.doc().entry(at).cloned().ok_or(EditError::IndexOutOfRange {
                track: at.track,
                index: at.index,
                len: 0,
            })?;
            entry
                .event
                .map_targets(|label| labels.get(&label).copied().unwrap_or(label));
            tx.apply(Change::ReplaceEntry { at, entry })?;
            debug!(caller = %at, from = %entered.track, to = %fork, "forked shared sub-sequence");
            Ok((fork, 0))
        }
    }
}

/// Strip `label` from its event once no control flow or slot enters there.
pub(crate) fn release_label(tx: &mut Transaction<'_>, label: Label) -> Result<(), EditError> {
    let doc = tx.doc();
    if !doc.referrers_of(label).is_empty() || !doc.slots_entering(label).is_empty() {
        return Ok(());
    }
    let Some(at) = doc.locate(label) else {
        return Ok(());
    };
    let Some(entry) = doc.entry(at).cloned() else {
        return Ok(());
    };
    tx.apply(Change::ReplaceEntry {
        at,
        entry: TrackEntry::new(entry.event),
    })
}

/// Position `address` points at after resolving for mutation. The index is
/// not bounds-checked.
pub(crate) fn position_for_edit(
    tx: &mut Transaction<'_>,
    address: &EventAddress,
) -> Result<EventPosition, EditError> {
    let (track, base) = entry_for_edit(tx, &address.route)?;
    Ok(EventPosition::new(track, base + address.index))
}

/// Copy region `id` from entry `from` on into a new region with fresh labels.
/// Returns the new region and the old-to-fresh label map.
fn fork(
    tx: &mut Transaction<'_>,
    id: TrackId,
    from: usize,
) -> Result<(TrackId, BTreeMap<Label, Label>), EditError> {
    let len = region_len(tx.doc(), id)?;
    let mut entries: Vec<TrackEntry> = tx
        .doc()
        .region(id)
        .and_then(|track| track.entries().get(from..))
        .map(<[TrackEntry]>::to_vec)
        .ok_or(EditError::IndexOutOfRange {
            track: id,
            index: from,
            len,
        })?;

    let mut next = tx.doc().next_label().0;
    let mut labels = BTreeMap::new();
    for entry in &mut entries {
        if let Some(label) = entry.label {
            let fresh = Label(next);
            next += 1;
            labels.insert(label, fresh);
            entry.label = Some(fresh);
        }
    }
    for entry in &mut entries {
        entry
            .event
            .map_targets(|label| labels.get(&label).copied().unwrap_or(label));
    }

    let fork = tx.doc().next_track_id()?;
    tx.apply(Change::InsertRegion {
        id: fork,
        track: Track::from_entries(entries, Vec::new()),
    })?;
    Ok((fork, labels))
}
