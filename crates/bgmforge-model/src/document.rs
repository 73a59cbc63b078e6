//! The sequence document: track slots, a region arena, and metadata.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::TrackLookupError;
use crate::event::{Event, Label};
use crate::format::{DEFAULT_TIME_BASE, TRACK_SLOTS, VARIATION_LOOPS};
use crate::track::{EventPosition, Track, TrackEntry, TrackId};

/// One entry of the variation table: a named arrangement of track slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variation {
    /// Bit `n` set means slot `n` plays in this variation.
    pub slots: u16,
    /// Raw flag byte; bit 0 marks a looping variation.
    pub flags: u8,
}

impl Variation {
    pub fn new(slots: u16, loops: bool) -> Self {
        Self {
            slots,
            flags: if loops { VARIATION_LOOPS } else { 0 },
        }
    }

    pub fn loops(&self) -> bool {
        self.flags & VARIATION_LOOPS != 0
    }

    pub fn includes(&self, slot: usize) -> bool {
        slot < TRACK_SLOTS && self.slots & (1 << slot) != 0
    }
}

/// Where a track slot starts playing.
///
/// Most slots start at the first event of a region. A slot whose offset
/// lands part way into a region that another entry point already covers
/// enters through a label placed on that event instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotEntry {
    Region(TrackId),
    Label(Label),
}

impl From<TrackId> for SlotEntry {
    fn from(id: TrackId) -> Self {
        SlotEntry::Region(id)
    }
}

/// Something that leads playback into a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reference {
    /// A track table slot starts at the region.
    Slot(usize),
    /// A control-flow event in another region targets a label inside it.
    Event(EventPosition),
}

/// Raw pieces of a document, as produced by the decoder.
#[derive(Debug, Clone, Default)]
pub struct DocumentParts {
    pub name: [u8; 4],
    pub time_base: u16,
    pub variations: Vec<Variation>,
    pub slots: [Option<SlotEntry>; TRACK_SLOTS],
    pub regions: BTreeMap<TrackId, Track>,
    pub leading_filler: Vec<u8>,
}

/// A decoded (or freshly built) music sequence.
///
/// Track slots map to regions in an arena keyed by [`TrackId`]. Regions no
/// slot plays in are sub-sequences, reached only through control flow.
/// Several slots or call sites may share one region.
///
/// Every mutation is expected to go through the edit engine so that it is
/// recorded in the history. The raw mutators here exist for the codec and the
/// engine itself; calling them directly skips every edit-time check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Four-byte asset name from the header.
    pub name: [u8; 4],
    /// Ticks per quarter note.
    pub time_base: u16,
    /// Variation table.
    pub variations: Vec<Variation>,
    slots: [Option<SlotEntry>; TRACK_SLOTS],
    regions: BTreeMap<TrackId, Track>,
    leading_filler: Vec<u8>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new(*b"    ")
    }
}

impl From<DocumentParts> for Document {
    fn from(parts: DocumentParts) -> Self {
        Self {
            name: parts.name,
            time_base: parts.time_base,
            variations: parts.variations,
            slots: parts.slots,
            regions: parts.regions,
            leading_filler: parts.leading_filler,
        }
    }
}

impl Document {
    /// An empty document with every slot unused.
    pub fn new(name: [u8; 4]) -> Self {
        Self {
            name,
            time_base: DEFAULT_TIME_BASE,
            variations: Vec::new(),
            slots: [None; TRACK_SLOTS],
            regions: BTreeMap::new(),
            leading_filler: Vec::new(),
        }
    }

    /// Asset name with non-ASCII bytes replaced.
    pub fn name_lossy(&self) -> String {
        self.name
            .iter()
            .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '?' })
            .collect()
    }

    /// Region track slot `index` plays in.
    pub fn track(&self, index: usize) -> Result<&Track, TrackLookupError> {
        let id = self.track_id(index)?;
        self.regions
            .get(&id)
            .ok_or(TrackLookupError::UnknownRegion { id })
    }

    /// Id of the region a used slot plays in.
    pub fn track_id(&self, index: usize) -> Result<TrackId, TrackLookupError> {
        self.slot_start(index).map(|start| start.track)
    }

    /// Entry of a used slot.
    pub fn used_slot(&self, index: usize) -> Result<SlotEntry, TrackLookupError> {
        self.slot(index)?
            .ok_or(TrackLookupError::UnusedSlot { index })
    }

    /// The event a used slot starts playing at.
    pub fn slot_start(&self, index: usize) -> Result<EventPosition, TrackLookupError> {
        match self.used_slot(index)? {
            SlotEntry::Region(id) => {
                if !self.regions.contains_key(&id) {
                    return Err(TrackLookupError::UnknownRegion { id });
                }
                Ok(EventPosition::new(id, 0))
            }
            SlotEntry::Label(label) => self
                .locate(label)
                .ok_or(TrackLookupError::UnplacedEntry { index, label }),
        }
    }

    /// Raw slot contents; `None` is the unused sentinel.
    pub fn slot(&self, index: usize) -> Result<Option<SlotEntry>, TrackLookupError> {
        self.slots
            .get(index)
            .copied()
            .ok_or(TrackLookupError::TrackIndexOutOfRange {
                index,
                slots: TRACK_SLOTS,
            })
    }

    pub fn slots(&self) -> &[Option<SlotEntry>; TRACK_SLOTS] {
        &self.slots
    }

    /// Point a slot at the start of a region, returning its previous contents.
    pub fn set_slot(
        &mut self,
        index: usize,
        track: Option<TrackId>,
    ) -> Result<Option<SlotEntry>, TrackLookupError> {
        self.set_slot_entry(index, track.map(SlotEntry::Region))
    }

    /// Overwrite a slot, returning its previous contents.
    pub fn set_slot_entry(
        &mut self,
        index: usize,
        entry: Option<SlotEntry>,
    ) -> Result<Option<SlotEntry>, TrackLookupError> {
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(TrackLookupError::TrackIndexOutOfRange {
                index,
                slots: TRACK_SLOTS,
            })?;
        Ok(std::mem::replace(slot, entry))
    }

    /// Slots entering through `label`.
    pub fn slots_entering(&self, label: Label) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| **slot == Some(SlotEntry::Label(label)))
            .map(|(index, _)| index)
            .collect()
    }

    /// Used slots with the regions they play in, in slot order.
    pub fn tracks(&self) -> impl Iterator<Item = (usize, &Track)> + '_ {
        (0..TRACK_SLOTS).filter_map(|index| {
            self.track(index).ok().map(|track| (index, track))
        })
    }

    pub fn region(&self, id: TrackId) -> Option<&Track> {
        self.regions.get(&id)
    }

    pub fn region_mut(&mut self, id: TrackId) -> Option<&mut Track> {
        self.regions.get_mut(&id)
    }

    /// All regions in layout order.
    pub fn regions(&self) -> impl Iterator<Item = (TrackId, &Track)> + '_ {
        self.regions.iter().map(|(&id, track)| (id, track))
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    pub fn insert_region(&mut self, id: TrackId, track: Track) -> Option<Track> {
        self.regions.insert(id, track)
    }

    pub fn remove_region(&mut self, id: TrackId) -> Option<Track> {
        self.regions.remove(&id)
    }

    /// Append a region after every existing one.
    pub fn add_region(&mut self, track: Track) -> Result<TrackId, TrackLookupError> {
        let id = self.next_track_id()?;
        self.regions.insert(id, track);
        Ok(id)
    }

    /// Id that sorts after every existing region.
    pub fn next_track_id(&self) -> Result<TrackId, TrackLookupError> {
        match self.regions.keys().next_back() {
            None => Ok(TrackId(0)),
            Some(&last) => last
                .0
                .checked_add(1)
                .map(TrackId)
                .ok_or(TrackLookupError::RegionIdsExhausted { last }),
        }
    }

    /// Regions no slot plays in.
    pub fn subsequences(&self) -> Vec<TrackId> {
        let slotted: BTreeSet<TrackId> = (0..TRACK_SLOTS)
            .filter_map(|index| self.track_id(index).ok())
            .collect();
        self.regions
            .keys()
            .filter(|id| !slotted.contains(id))
            .copied()
            .collect()
    }

    /// Opaque bytes between the header and the first region.
    pub fn leading_filler(&self) -> &[u8] {
        &self.leading_filler
    }

    pub fn set_leading_filler(&mut self, filler: Vec<u8>) {
        self.leading_filler = filler;
    }

    pub fn entry(&self, position: EventPosition) -> Option<&TrackEntry> {
        self.regions.get(&position.track)?.get(position.index)
    }

    pub fn event(&self, position: EventPosition) -> Option<&Event> {
        self.entry(position).map(|e| &e.event)
    }

    /// Where `label` is placed. The first placement wins if it is duplicated.
    pub fn locate(&self, label: Label) -> Option<EventPosition> {
        self.regions.iter().find_map(|(&id, track)| {
            track
                .position_of(label)
                .map(|index| EventPosition::new(id, index))
        })
    }

    /// Every control-flow event that targets `label`.
    pub fn referrers_of(&self, label: Label) -> Vec<EventPosition> {
        let mut found = Vec::new();
        for (&id, track) in &self.regions {
            for (index, event) in track.events().enumerate() {
                if event.targets().any(|t| t == label) {
                    found.push(EventPosition::new(id, index));
                }
            }
        }
        found
    }

    /// Slots and outside control-flow events that lead into region `id`.
    /// Jumps inside the region itself are not counted.
    pub fn references_to(&self, id: TrackId) -> Vec<Reference> {
        let mut refs: Vec<Reference> = (0..TRACK_SLOTS)
            .filter(|&index| self.track_id(index).ok() == Some(id))
            .map(Reference::Slot)
            .collect();

        let Some(region) = self.regions.get(&id) else {
            return refs;
        };
        let inside: BTreeSet<Label> = region.labels().map(|(_, label)| label).collect();
        if inside.is_empty() {
            return refs;
        }

        for (&other, track) in &self.regions {
            if other == id {
                continue;
            }
            for (index, event) in track.events().enumerate() {
                if event.targets().any(|t| inside.contains(&t)) {
                    refs.push(Reference::Event(EventPosition::new(other, index)));
                }
            }
        }
        refs
    }

    /// Whether more than one reference leads into region `id`.
    pub fn is_shared(&self, id: TrackId) -> bool {
        self.references_to(id).len() > 1
    }

    /// A label that is neither placed nor targeted anywhere in the document.
    pub fn next_label(&self) -> Label {
        let highest = self
            .regions
            .values()
            .flat_map(|track| track.entries())
            .flat_map(|entry| entry.label.into_iter().chain(entry.event.targets()))
            .chain(self.slots.iter().filter_map(|slot| match slot {
                Some(SlotEntry::Label(label)) => Some(*label),
                _ => None,
            }))
            .map(|label| label.0)
            .max();
        Label(highest.map_or(0, |n| n.saturating_add(1)))
    }

    /// Encoded size of every region's events, excluding header and filler.
    pub fn events_byte_len(&self) -> usize {
        self.regions.values().map(Track::byte_len).sum()
    }
}
