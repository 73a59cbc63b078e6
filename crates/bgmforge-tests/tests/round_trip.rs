//! Decode/encode identity over the hand-assembled fixtures.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p bgmforge-tests --test round_trip
//! ```

use bgmforge_codec::{decode, encode, rebuild, RebuildOptions};
use bgmforge_model::{Event, EventPosition, Label, TrackEntry, TrackId, Variation};
use bgmforge_tests::{compute_hash, fixtures, init_tracing};
use pretty_assertions::assert_eq;

// ============================================================================
// Identity
// ============================================================================

#[test]
fn every_fixture_round_trips() {
    init_tracing();
    for fixture in fixtures::all() {
        let doc = decode(&fixture.bytes)
            .unwrap_or_else(|e| panic!("{} failed to decode: {}", fixture.name, e));
        assert!(doc.validate().is_empty(), "{}: {:?}", fixture.name, doc.validate());
        let encoded = encode(&doc).unwrap();
        assert_eq!(encoded, fixture.bytes, "{}", fixture.name);
    }
}

#[test]
fn decode_is_stable_across_round_trips() {
    for fixture in fixtures::all() {
        let doc = decode(&fixture.bytes).unwrap();
        let again = decode(&encode(&doc).unwrap()).unwrap();
        assert_eq!(again, doc, "{}", fixture.name);
    }
}

// ============================================================================
// Decoded structure
// ============================================================================

#[test]
fn two_track_song_structure() {
    let doc = decode(&fixtures::two_track_song().bytes).unwrap();
    assert_eq!(&doc.name, b"TWO ");
    assert_eq!(doc.region_count(), 2);

    let first = doc.track(0).unwrap();
    let events: Vec<&Event> = first.events().collect();
    assert_eq!(
        events,
        vec![
            &Event::set_tempo(120).unwrap(),
            &Event::note_on(0x24, 100, 24).unwrap(),
            &Event::rest(24).unwrap(),
            &Event::jump_if(1, Label(0)),
            &Event::EndOfTrack,
        ]
    );
    assert_eq!(
        first.get(1),
        Some(&TrackEntry::labelled(Label(0), Event::note_on(0x24, 100, 24).unwrap()))
    );
    assert_eq!(doc.locate(Label(0)), Some(EventPosition::new(TrackId(0), 1)));

    let second = doc.track(1).unwrap();
    assert_eq!(second.get(1).unwrap().event, Event::note_on(0x10, 80, 0xC0).unwrap());
    assert_eq!(second.get(2).unwrap().event, Event::note_off(0x10).unwrap());
}

#[test]
fn header_metadata_survives() {
    let doc = decode(&fixtures::variations_song().bytes).unwrap();
    assert_eq!(doc.time_base, 96);
    assert_eq!(
        doc.variations,
        vec![Variation::new(0x0003, true), Variation::new(0x0001, false)]
    );
    assert!(doc.variations[0].includes(1));
    assert!(!doc.variations[1].includes(1));
    assert_eq!(doc.track(0).unwrap().get(0).unwrap().event, Event::rest(0x288).unwrap());
}

#[test]
fn filler_is_preserved() {
    let doc = decode(&fixtures::filler_song().bytes).unwrap();
    assert_eq!(doc.leading_filler(), &[0xAA, 0xBB]);
    assert_eq!(doc.track(0).unwrap().filler(), &[0xCC, 0xDD]);
}

#[test]
fn loop_labels_follow_offsets() {
    let doc = decode(&fixtures::loop_song().bytes).unwrap();
    let track = doc.track(0).unwrap();
    assert_eq!(track.get(0).unwrap().event, Event::repeat(Label(0), Label(1), 4));
    assert_eq!(track.get(1).unwrap().label, Some(Label(0)));
    assert_eq!(track.get(2).unwrap().label, Some(Label(1)));
}

// ============================================================================
// Rebuild
// ============================================================================

#[test]
fn unpadded_rebuild_matches_encode() {
    for fixture in fixtures::all() {
        let doc = decode(&fixture.bytes).unwrap();
        let asset = rebuild(&doc, &RebuildOptions::unpadded()).unwrap();
        assert_eq!(asset.data, fixture.bytes, "{}", fixture.name);
        assert_eq!(asset.hash, compute_hash(&fixture.bytes));
        assert_eq!(asset.layout.padding, 0);
    }
}

#[test]
fn rom_rebuild_is_aligned_and_round_trips() {
    for fixture in fixtures::all() {
        let doc = decode(&fixture.bytes).unwrap();
        let asset = rebuild(&doc, &RebuildOptions::rom()).unwrap();
        assert_eq!(asset.data.len() % 4, 0, "{}", fixture.name);
        assert_eq!(asset.layout.size, asset.data.len());
        assert_eq!(&asset.data[..fixture.bytes.len()][8..], &fixture.bytes[8..]);

        let redecoded = decode(&asset.data).unwrap();
        assert_eq!(encode(&redecoded).unwrap(), asset.data, "{}", fixture.name);
    }
}

#[test]
fn layout_report_locates_slots_and_regions() {
    let doc = decode(&fixtures::shared_subroutine_song().bytes).unwrap();
    let asset = rebuild(&doc, &RebuildOptions::unpadded()).unwrap();

    let slots: Vec<(usize, u16)> = asset.layout.slots.iter().map(|s| (s.slot, s.offset)).collect();
    assert_eq!(slots, vec![(0, 0x30), (1, 0x35)]);

    let regions: Vec<(u16, usize, bool)> = asset
        .layout
        .regions
        .iter()
        .map(|r| (r.offset, r.len, r.shared))
        .collect();
    assert_eq!(regions, vec![(0x30, 5, false), (0x35, 4, false), (0x39, 4, true)]);

    let json = serde_json::to_string(&asset.layout).unwrap();
    assert!(json.contains("\"shared\":true"));
}
