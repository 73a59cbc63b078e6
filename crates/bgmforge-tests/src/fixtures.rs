//! Hand-assembled "BGM " assets.
//!
//! Every fixture is written byte by byte so the expected encoding never
//! comes from the encoder under test. Offsets in the comments are absolute.

use bgmforge_model::format::{
    regions_start, DEFAULT_TIME_BASE, HEADER_LEN, MAGIC, TRACK_SLOTS, TRACK_TABLE_OFFSET,
};

/// A named test asset.
#[derive(Debug, Clone)]
pub struct Fixture {
    pub name: &'static str,
    pub bytes: Vec<u8>,
}

/// Builds an asset from raw header fields and body bytes.
///
/// Variations must be declared before body bytes are added, since they move
/// the start of the region area.
#[derive(Debug, Clone)]
pub struct AssetBuilder {
    name: [u8; 4],
    time_base: u16,
    variations: Vec<[u8; 4]>,
    slots: [u16; TRACK_SLOTS],
    body: Vec<u8>,
    declared_size: Option<u32>,
}

impl AssetBuilder {
    pub fn new(name: &[u8; 4]) -> Self {
        Self {
            name: *name,
            time_base: DEFAULT_TIME_BASE,
            variations: Vec::new(),
            slots: [0; TRACK_SLOTS],
            body: Vec::new(),
            declared_size: None,
        }
    }

    pub fn time_base(mut self, time_base: u16) -> Self {
        self.time_base = time_base;
        self
    }

    /// Append a variation table entry.
    pub fn variation(mut self, slots: u16, flags: u8) -> Self {
        assert!(self.body.is_empty(), "declare variations before the body");
        let [hi, lo] = slots.to_be_bytes();
        self.variations.push([hi, lo, flags, 0]);
        self
    }

    pub fn slot(mut self, index: usize, offset: u16) -> Self {
        self.slots[index] = offset;
        self
    }

    /// Offset the next body byte will land at.
    pub fn here(&self) -> u16 {
        (regions_start(self.variations.len()) + self.body.len()) as u16
    }

    pub fn bytes(mut self, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(bytes);
        self
    }

    /// Write `size` into the size field instead of the real length.
    pub fn declared_size(mut self, size: u32) -> Self {
        self.declared_size = Some(size);
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut out = Vec::with_capacity(regions_start(self.variations.len()) + self.body.len());
        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&[0; 4]);
        out.extend_from_slice(&self.name);
        out.extend_from_slice(&self.time_base.to_be_bytes());
        out.push(self.variations.len() as u8);
        out.push(0);
        for slot in self.slots {
            out.extend_from_slice(&slot.to_be_bytes());
        }
        debug_assert_eq!(out.len(), HEADER_LEN);
        debug_assert_eq!(TRACK_TABLE_OFFSET + 2 * TRACK_SLOTS, HEADER_LEN);
        for variation in &self.variations {
            out.extend_from_slice(variation);
        }
        out.extend_from_slice(&self.body);

        let size = self.declared_size.unwrap_or(out.len() as u32);
        out[4..8].copy_from_slice(&size.to_be_bytes());
        out
    }
}

/// One track: tempo, note, rest, EOT.
pub fn single_track_song() -> Fixture {
    let bytes = AssetBuilder::new(b"ONE ")
        .slot(0, 0x30)
        .bytes(&[
            0xE0, 0x00, 0x78, // 0x30 SetTempo 120
            0xB0, 0x64, 0x30, // 0x33 NoteOn pitch 0x30 vel 100 dur 48
            0x18, // 0x36 Rest 24
            0x00, // 0x37 EndOfTrack
        ])
        .build();
    Fixture {
        name: "single_track_song",
        bytes,
    }
}

/// Two tracks; the first loops back to its note with a conditional jump,
/// the second uses a two-byte note duration.
pub fn two_track_song() -> Fixture {
    let bytes = AssetBuilder::new(b"TWO ")
        .slot(0, 0x30)
        .slot(1, 0x3C)
        .bytes(&[
            0xE0, 0x00, 0x78, // 0x30 SetTempo 120
            0xA4, 0x64, 0x18, // 0x33 NoteOn pitch 0x24 vel 100 dur 24
            0x18, // 0x36 Rest 24
            0xE5, 0x01, 0x00, 0x33, // 0x37 JumpIf 1 -> 0x33
            0x00, // 0x3B EndOfTrack
            0xE1, 0x07, 0x64, // 0x3C ControlChange 7 = 100
            0x90, 0x50, 0xC0, 0x00, // 0x3F NoteOn pitch 0x10 vel 80 dur 0xC0
            0xE2, 0x10, // 0x43 NoteOff 0x10
            0x00, // 0x45 EndOfTrack
        ])
        .build();
    Fixture {
        name: "two_track_song",
        bytes,
    }
}

/// Tracks 0 and 1 both call the sub-sequence at 0x39.
pub fn shared_subroutine_song() -> Fixture {
    let bytes = AssetBuilder::new(b"SUBR")
        .slot(0, 0x30)
        .slot(1, 0x35)
        .bytes(&[
            0xE7, 0x00, 0x39, // 0x30 Call 0x39
            0x0C, // 0x33 Rest 12
            0x00, // 0x34 EndOfTrack
            0xE7, 0x00, 0x39, // 0x35 Call 0x39
            0x00, // 0x38 EndOfTrack
            0xB0, 0x5A, 0x06, // 0x39 NoteOn pitch 0x30 vel 90 dur 6
            0x00, // 0x3C EndOfTrack
        ])
        .build();
    Fixture {
        name: "shared_subroutine_song",
        bytes,
    }
}

/// Slots 0 and 1 point at the same track.
pub fn shared_slot_song() -> Fixture {
    let bytes = AssetBuilder::new(b"DUAL")
        .slot(0, 0x30)
        .slot(1, 0x30)
        .bytes(&[
            0x18, // 0x30 Rest 24
            0x00, // 0x31 EndOfTrack
        ])
        .build();
    Fixture {
        name: "shared_slot_song",
        bytes,
    }
}

/// Track 0 calls into the middle of track 1.
pub fn mid_region_call_song() -> Fixture {
    let bytes = AssetBuilder::new(b"MIDC")
        .slot(0, 0x30)
        .slot(1, 0x34)
        .bytes(&[
            0xE7, 0x00, 0x35, // 0x30 Call 0x35
            0x00, // 0x33 EndOfTrack
            0x18, // 0x34 Rest 24
            0xE3, 0x01, // 0x35 Marker 1
            0x00, // 0x37 EndOfTrack
        ])
        .build();
    Fixture {
        name: "mid_region_call_song",
        bytes,
    }
}

/// Track 1 skips the tempo change and starts at track 0's note.
pub fn late_entry_song() -> Fixture {
    let bytes = AssetBuilder::new(b"LATE")
        .slot(0, 0x30)
        .slot(1, 0x33)
        .bytes(&[
            0xE0, 0x00, 0x78, // 0x30 SetTempo 120
            0xA4, 0x64, 0x18, // 0x33 NoteOn pitch 0x24 vel 100 dur 24
            0x18, // 0x36 Rest 24
            0x00, // 0x37 EndOfTrack
        ])
        .build();
    Fixture {
        name: "late_entry_song",
        bytes,
    }
}

/// Unreached bytes before the first track and after the last.
pub fn filler_song() -> Fixture {
    let bytes = AssetBuilder::new(b"FILL")
        .slot(0, 0x32)
        .bytes(&[
            0xAA, 0xBB, // 0x30 leading filler
            0x05, // 0x32 Rest 5
            0x00, // 0x33 EndOfTrack
            0xCC, 0xDD, // 0x34 trailing filler
        ])
        .build();
    Fixture {
        name: "filler_song",
        bytes,
    }
}

/// Two variations, a non-default time base, a long rest, and a jump back to
/// a track start.
pub fn variations_song() -> Fixture {
    let bytes = AssetBuilder::new(b"VARS")
        .time_base(96)
        .variation(0x0003, 0x01)
        .variation(0x0001, 0x00)
        .slot(0, 0x38)
        .slot(1, 0x3B)
        .bytes(&[
            0x7A, 0x10, // 0x38 Rest 0x288
            0x00, // 0x3A EndOfTrack
            0xE3, 0x05, // 0x3B Marker 5
            0xE4, 0x00, 0x3B, // 0x3D Jump 0x3B
            0x00, // 0x40 EndOfTrack
        ])
        .build();
    Fixture {
        name: "variations_song",
        bytes,
    }
}

/// A loop whose start and end are both mid-track.
pub fn loop_song() -> Fixture {
    let bytes = AssetBuilder::new(b"LOOP")
        .slot(0, 0x30)
        .bytes(&[
            0xE6, 0x00, 0x36, 0x00, 0x39, 0x04, // 0x30 Loop 0x36..0x39 x4
            0xA0, 0x40, 0x0C, // 0x36 NoteOn pitch 0x20 vel 64 dur 12
            0x0C, // 0x39 Rest 12
            0x00, // 0x3A EndOfTrack
        ])
        .build();
    Fixture {
        name: "loop_song",
        bytes,
    }
}

/// Every fixture that decodes.
pub fn all() -> Vec<Fixture> {
    vec![
        single_track_song(),
        two_track_song(),
        shared_subroutine_song(),
        shared_slot_song(),
        mid_region_call_song(),
        late_entry_song(),
        filler_song(),
        variations_song(),
        loop_song(),
    ]
}

/// A single track of `rests` one-byte rests, so the asset is exactly
/// `0x31 + rests` bytes long.
pub fn rest_run(rests: usize) -> Vec<u8> {
    let mut body = vec![0x01; rests];
    body.push(0x00);
    AssetBuilder::new(b"LONG").slot(0, 0x30).bytes(&body).build()
}
