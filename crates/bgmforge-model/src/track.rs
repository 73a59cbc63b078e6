//! Track regions: ordered runs of events terminated by `EndOfTrack`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::event::{Event, Label};

/// Identifier of a track region inside a document.
///
/// Regions are laid out in ascending id order when encoded.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TrackId(pub u16);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Position of one event: a region and an index from the region start.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct EventPosition {
    pub track: TrackId,
    pub index: usize,
}

impl EventPosition {
    pub fn new(track: TrackId, index: usize) -> Self {
        Self { track, index }
    }
}

impl fmt::Display for EventPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "track {} event {}", self.track, self.index)
    }
}

/// An event plus the label placed at its position, if any.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackEntry {
    pub label: Option<Label>,
    pub event: Event,
}

impl TrackEntry {
    pub fn new(event: Event) -> Self {
        Self { label: None, event }
    }

    pub fn labelled(label: Label, event: Event) -> Self {
        Self {
            label: Some(label),
            event,
        }
    }
}

impl From<Event> for TrackEntry {
    fn from(event: Event) -> Self {
        TrackEntry::new(event)
    }
}

/// A track region.
///
/// `filler` holds opaque bytes that followed the region in the source asset
/// (alignment padding or unreferenced data) and are written back verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Track {
    entries: Vec<TrackEntry>,
    filler: Vec<u8>,
}

impl Default for Track {
    fn default() -> Self {
        Self::new()
    }
}

impl Track {
    /// An empty track: just `EndOfTrack`.
    pub fn new() -> Self {
        Self {
            entries: vec![TrackEntry::new(Event::EndOfTrack)],
            filler: Vec::new(),
        }
    }

    /// Build a track from entries as-is. No terminator is added.
    pub fn from_entries(entries: Vec<TrackEntry>, filler: Vec<u8>) -> Self {
        Self { entries, filler }
    }

    /// Build a track from unlabelled events, appending `EndOfTrack` if the
    /// events do not already end with one.
    pub fn from_events(events: impl IntoIterator<Item = Event>) -> Self {
        let mut entries: Vec<TrackEntry> = events.into_iter().map(TrackEntry::new).collect();
        if !entries.last().is_some_and(|e| e.event.is_end_of_track()) {
            entries.push(TrackEntry::new(Event::EndOfTrack));
        }
        Self {
            entries,
            filler: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[TrackEntry] {
        &self.entries
    }

    /// Direct access to the entries.
    ///
    /// Mutating through this bypasses the edit history and every check the
    /// edit engine performs; `Document::validate` is the only safety net.
    pub fn entries_mut(&mut self) -> &mut Vec<TrackEntry> {
        &mut self.entries
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> + '_ {
        self.entries.iter().map(|e| &e.event)
    }

    pub fn get(&self, index: usize) -> Option<&TrackEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn filler(&self) -> &[u8] {
        &self.filler
    }

    pub fn set_filler(&mut self, filler: Vec<u8>) {
        self.filler = filler;
    }

    /// Index of the entry carrying `label`.
    pub fn position_of(&self, label: Label) -> Option<usize> {
        self.entries.iter().position(|e| e.label == Some(label))
    }

    /// Every placed label with its index.
    pub fn labels(&self) -> impl Iterator<Item = (usize, Label)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.label.map(|l| (i, l)))
    }

    /// Encoded size of the events, excluding filler.
    pub fn byte_len(&self) -> usize {
        self.events().map(Event::byte_len).sum()
    }

    /// Whether the region ends in exactly one `EndOfTrack`.
    pub fn is_terminated(&self) -> bool {
        let ends = self.events().filter(|e| e.is_end_of_track()).count();
        ends == 1 && self.entries.last().is_some_and(|e| e.event.is_end_of_track())
    }

    /// Length of the region's timeline in ticks. Only rests advance time.
    pub fn duration_ticks(&self) -> u64 {
        self.events()
            .filter(|e| matches!(e, Event::Rest { .. }))
            .filter_map(Event::duration)
            .map(u64::from)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_track_is_terminated() {
        let track = Track::new();
        assert!(track.is_terminated());
        assert_eq!(track.byte_len(), 1);
    }

    #[test]
    fn from_events_appends_terminator_once() {
        let track = Track::from_events([Event::marker(1)]);
        assert_eq!(track.len(), 2);
        let track = Track::from_events([Event::marker(1), Event::EndOfTrack]);
        assert_eq!(track.len(), 2);
        assert!(track.is_terminated());
    }

    #[test]
    fn terminator_must_be_last_and_unique() {
        let track = Track::from_entries(
            vec![Event::EndOfTrack.into(), Event::marker(0).into()],
            Vec::new(),
        );
        assert!(!track.is_terminated());
        let track = Track::from_entries(
            vec![Event::EndOfTrack.into(), Event::EndOfTrack.into()],
            Vec::new(),
        );
        assert!(!track.is_terminated());
    }

    #[test]
    fn labels_and_positions() {
        let track = Track::from_entries(
            vec![
                Event::marker(0).into(),
                TrackEntry::labelled(Label(7), Event::marker(1)),
                Event::EndOfTrack.into(),
            ],
            vec![0, 0],
        );
        assert_eq!(track.position_of(Label(7)), Some(1));
        assert_eq!(track.labels().collect::<Vec<_>>(), vec![(1, Label(7))]);
        assert_eq!(track.filler(), &[0, 0]);
    }

    #[test]
    fn duration_counts_rests() {
        let track = Track::from_events([
            Event::rest(10).unwrap(),
            Event::note_on(1, 1, 500).unwrap(),
            Event::rest(0x100).unwrap(),
        ]);
        assert_eq!(track.duration_ticks(), 0x10A);
    }
}
