//! Encoder: a [`Document`] back to asset bytes.
//!
//! Encoding is two-pass. The first pass lays out the header, leading filler,
//! and every region (ascending [`TrackId`]) followed by its filler, placing
//! labels as their entries are written and leaving target operands as
//! placeholders. The second pass backfills those operands, the track table,
//! and the size field.

use std::collections::BTreeMap;
use std::io::{Cursor, Write};

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use tracing::{debug, trace};

use bgmforge_model::format::{
    MAGIC, SIZE_OFFSET, TRACK_SLOTS, TRACK_TABLE_OFFSET, UNUSED_SLOT,
};
use bgmforge_model::{Document, SlotEntry, TrackId};

use crate::error::EncodeError;
use crate::instruction::write_instruction;
use crate::limits::CodecLimits;
use crate::relocation::LabelResolver;

/// Where one region landed in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PlacedRegion {
    pub id: TrackId,
    pub offset: usize,
    pub len: usize,
    pub filler: usize,
}

/// Encoder output with the layout it produced.
#[derive(Debug, Clone)]
pub(crate) struct Encoded {
    pub bytes: Vec<u8>,
    pub regions: Vec<PlacedRegion>,
    /// Offset written for every used slot, in slot order.
    pub slots: Vec<(usize, usize)>,
    pub padding: usize,
}

/// Encode a document with the default capacity limit.
pub fn encode(doc: &Document) -> Result<Vec<u8>, EncodeError> {
    encode_with_limits(doc, &CodecLimits::default())
}

/// Encode a document, failing if the result is larger than `limits` allows.
pub fn encode_with_limits(doc: &Document, limits: &CodecLimits) -> Result<Vec<u8>, EncodeError> {
    Ok(encode_layout(doc, limits, 1)?.bytes)
}

/// Encode with zero padding appended until the size is a multiple of
/// `alignment`. The size field covers the padding.
pub(crate) fn encode_layout(
    doc: &Document,
    limits: &CodecLimits,
    alignment: usize,
) -> Result<Encoded, EncodeError> {
    let errors = doc.validate();
    if !errors.is_empty() {
        debug!(errors = errors.len(), "refusing to encode invalid document");
        return Err(EncodeError::Invalid(errors));
    }
    let max = limits.max_size();
    if alignment > 1 && alignment > max {
        return Err(EncodeError::InvalidAlignment { alignment, max });
    }

    let mut w = Cursor::new(Vec::new());
    write_header(&mut w, doc)?;
    w.write_all(doc.leading_filler())?;

    let mut resolver = LabelResolver::new();
    let mut regions = Vec::with_capacity(doc.region_count());
    for (id, track) in doc.regions() {
        let offset = w.position() as usize;
        for entry in track.entries() {
            if let Some(label) = entry.label {
                resolver.place(label, w.position() as usize);
            }
            write_instruction(&mut w, &entry.event, &mut resolver)?;
        }
        let len = w.position() as usize - offset;
        w.write_all(track.filler())?;
        trace!(track = %id, offset, len, filler = track.filler().len(), "placed region");
        regions.push(PlacedRegion {
            id,
            offset,
            len,
            filler: track.filler().len(),
        });
    }

    let unpadded = w.position() as usize;
    let alignment = alignment.max(1);
    let padding = (alignment - unpadded % alignment) % alignment;
    let size = unpadded.saturating_add(padding);
    if size > max {
        debug!(size, max, padding, "encoded asset exceeds capacity");
        return Err(EncodeError::BufferTooLarge { size, max });
    }

    let mut bytes = w.into_inner();
    bytes.resize(size, 0);
    resolver.backfill(&mut bytes)?;
    let slots = write_track_table(&mut bytes, doc, &regions, &resolver)?;
    BigEndian::write_u32(&mut bytes[SIZE_OFFSET..SIZE_OFFSET + 4], size as u32);

    debug!(
        name = %doc.name_lossy(),
        size,
        regions = regions.len(),
        fixups = resolver.fixups().len(),
        "encoded sequence asset"
    );
    Ok(Encoded {
        bytes,
        regions,
        slots,
        padding,
    })
}

fn write_header(w: &mut Cursor<Vec<u8>>, doc: &Document) -> Result<(), EncodeError> {
    w.write_all(&MAGIC)?;
    // Size is written once layout is final.
    w.write_u32::<BigEndian>(0)?;
    w.write_all(&doc.name)?;
    w.write_u16::<BigEndian>(doc.time_base)?;
    w.write_u8(doc.variations.len() as u8)?;
    w.write_u8(0)?;
    for _ in 0..TRACK_SLOTS {
        w.write_u16::<BigEndian>(UNUSED_SLOT)?;
    }
    for variation in &doc.variations {
        w.write_u16::<BigEndian>(variation.slots)?;
        w.write_u8(variation.flags)?;
        w.write_u8(0)?;
    }
    Ok(())
}

/// Fill in the track table, returning each used slot with its offset.
fn write_track_table(
    bytes: &mut [u8],
    doc: &Document,
    regions: &[PlacedRegion],
    resolver: &LabelResolver,
) -> Result<Vec<(usize, usize)>, EncodeError> {
    let offsets: BTreeMap<TrackId, usize> = regions.iter().map(|r| (r.id, r.offset)).collect();
    let mut written = Vec::new();
    for (slot, entry) in doc.slots().iter().enumerate() {
        let offset = match *entry {
            None => continue,
            Some(SlotEntry::Region(id)) => offsets
                .get(&id)
                .copied()
                .ok_or(EncodeError::MissingRegion { slot, id })?,
            Some(SlotEntry::Label(label)) => resolver
                .offset_of(label)
                .ok_or(EncodeError::UnplacedEntry { slot, label })?,
        };
        let at = TRACK_TABLE_OFFSET + slot * 2;
        BigEndian::write_u16(&mut bytes[at..at + 2], offset as u16);
        written.push((slot, offset));
    }
    Ok(written)
}
