//! Property-based codec and edit tests using proptest.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p bgmforge-tests --test proptest_codec
//! ```

use proptest::prelude::*;

use bgmforge_codec::{decode, encode};
use bgmforge_edit::{EditOperation, Editor, EventAddress};
use bgmforge_model::opcode::{BPM_MAX, NOTE_DURATION_MAX, PITCH_MAX, REST_MAX, SEVEN_BIT_MAX};
use bgmforge_model::{Document, Event, Label, Track, TrackEntry};
use bgmforge_tests::AssetBuilder;

// ============================================================================
// Strategies
// ============================================================================

/// Any non-control-flow event with in-range operands.
fn plain_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        (0..=PITCH_MAX, 0..=SEVEN_BIT_MAX, 0..=NOTE_DURATION_MAX).prop_map(
            |(pitch, velocity, duration)| Event::NoteOn {
                pitch,
                velocity,
                duration
            }
        ),
        (0..=PITCH_MAX).prop_map(|pitch| Event::NoteOff { pitch }),
        (1..=REST_MAX).prop_map(|duration| Event::Rest { duration }),
        (1..=BPM_MAX).prop_map(|bpm| Event::SetTempo { bpm }),
        (0..=SEVEN_BIT_MAX, 0..=SEVEN_BIT_MAX)
            .prop_map(|(controller, value)| Event::ControlChange { controller, value }),
        any::<u8>().prop_map(|id| Event::Marker { id }),
    ]
}

/// Up to four tracks; a looping track jumps back to its first event.
fn document() -> impl Strategy<Value = Document> {
    (
        prop::collection::vec(
            (prop::collection::vec(plain_event(), 0..24), any::<bool>()),
            1..=4,
        ),
        1u16..=960,
    )
        .prop_map(|(tracks, time_base)| {
            let mut doc = Document::new(*b"PROP");
            doc.time_base = time_base;
            let mut next_label = 0;
            for (slot, (events, loops)) in tracks.into_iter().enumerate() {
                let mut entries: Vec<TrackEntry> = events.into_iter().map(TrackEntry::new).collect();
                if loops {
                    let label = Label(next_label);
                    next_label += 1;
                    entries.push(Event::jump(label).into());
                    entries[0].label = Some(label);
                }
                entries.push(Event::EndOfTrack.into());
                let id = doc.add_region(Track::from_entries(entries, Vec::new())).unwrap();
                doc.set_slot(slot, Some(id)).unwrap();
            }
            doc
        })
}

// ============================================================================
// Codec properties
// ============================================================================

proptest! {
    /// Encoded documents decode to themselves.
    #[test]
    fn documents_round_trip(doc in document()) {
        prop_assert!(doc.validate().is_empty(), "{:?}", doc.validate());
        let bytes = encode(&doc).unwrap();
        prop_assert_eq!(decode(&bytes).unwrap(), doc);
    }

    /// Whatever decodes re-encodes to the same bytes.
    #[test]
    fn decodable_bodies_round_trip(body in prop::collection::vec(any::<u8>(), 1..96)) {
        let bytes = AssetBuilder::new(b"FUZZ").slot(0, 0x30).bytes(&body).build();
        if let Ok(doc) = decode(&bytes) {
            prop_assert_eq!(encode(&doc).unwrap(), bytes);
        }
    }

    /// Arbitrary input never panics the decoder.
    #[test]
    fn decode_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..128)) {
        let _ = decode(&bytes);
    }
}

// ============================================================================
// Edit properties
// ============================================================================

proptest! {
    /// Undo returns to the exact document an insert started from.
    #[test]
    fn insert_then_undo_is_identity(
        doc in document(),
        event in plain_event(),
        slot_pick in any::<prop::sample::Index>(),
        index_pick in any::<prop::sample::Index>(),
    ) {
        let slots: Vec<usize> = doc.tracks().map(|(slot, _)| slot).collect();
        let slot = slots[slot_pick.index(slots.len())];
        let len = doc.track(slot).unwrap().len();
        let at = EventAddress::slot(slot, index_pick.index(len));

        let mut editor = Editor::from_document(doc.clone());
        editor.apply(EditOperation::Insert { at, event }).unwrap();
        prop_assert!(editor.validate().is_empty());
        let edited = editor.document().clone();

        prop_assert!(editor.undo().unwrap());
        prop_assert_eq!(editor.document(), &doc);
        prop_assert!(editor.redo().unwrap());
        prop_assert_eq!(editor.document(), &edited);
    }
}
