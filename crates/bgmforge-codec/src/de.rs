//! Decoder: raw asset bytes to a [`Document`].
//!
//! Decoding is a disassembly sweep. Starting from every used track slot, and
//! then from every control-flow target discovered along the way, instructions
//! are decoded linearly until an `EndOfTrack` or until the sweep runs into an
//! instruction that is already decoded. Contiguous runs of instructions become
//! track regions; whatever bytes no sweep reached are kept as filler. A slot
//! that lands part way into a region enters it through a label.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::io::{Cursor, Read};

use byteorder::{BigEndian, ReadBytesExt};
use tracing::{debug, trace};

use bgmforge_model::format::{
    regions_start, HEADER_LEN, MAGIC, MAX_VARIATIONS, RESERVED_OFFSET, TIME_BASE_MAX,
    TIME_BASE_MIN, TIME_BASE_OFFSET, TRACK_SLOTS, TRACK_TABLE_OFFSET, UNUSED_SLOT,
    VARIATION_COUNT_OFFSET, VARIATION_ENTRY_LEN, VARIATION_TABLE_OFFSET,
};
use bgmforge_model::{
    Document, DocumentParts, Label, SlotEntry, Track, TrackEntry, TrackId, Variation,
};

use crate::error::DecodeError;
use crate::instruction::{read_instruction, Instruction};
use crate::limits::CodecLimits;
use crate::relocation::LabelResolver;

/// Whether `bytes` starts with the "BGM " magic.
pub fn is_bgm(bytes: &[u8]) -> bool {
    bytes.get(..MAGIC.len()) == Some(&MAGIC[..])
}

/// Decode an asset with the default capacity limit.
pub fn decode(bytes: &[u8]) -> Result<Document, DecodeError> {
    decode_with_limits(bytes, &CodecLimits::default())
}

/// Decode an asset, rejecting anything larger than `limits` allows.
pub fn decode_with_limits(bytes: &[u8], limits: &CodecLimits) -> Result<Document, DecodeError> {
    let header = read_header(bytes, limits)?;
    let start = regions_start(header.variations.len());

    let instructions = disassemble(bytes, start, &header.slots)?;
    let regions = form_regions(&instructions);

    let region_starts: BTreeSet<usize> = regions.iter().map(|run| run[0].offset).collect();
    let mut entries = target_offsets(&instructions);
    entries.extend(
        header
            .slots
            .iter()
            .flatten()
            .map(|&offset| usize::from(offset))
            .filter(|offset| !region_starts.contains(offset) && instructions.contains_key(offset)),
    );
    let mut resolver = LabelResolver::new();
    for offset in entries {
        resolver.intern(offset);
    }

    let mut parts = DocumentParts {
        name: header.name,
        time_base: header.time_base,
        variations: header.variations,
        ..DocumentParts::default()
    };

    let region_ends: Vec<usize> = regions
        .iter()
        .skip(1)
        .map(|run| run[0].offset)
        .chain(std::iter::once(bytes.len()))
        .collect();
    parts.leading_filler = bytes[start..regions.first().map_or(bytes.len(), |run| run[0].offset)]
        .to_vec();

    let mut starts: BTreeMap<usize, TrackId> = BTreeMap::new();
    for (index, (run, next)) in regions.iter().zip(region_ends).enumerate() {
        let id = TrackId(index as u16);
        let first = run[0].offset;
        let end = run[run.len() - 1].end();
        starts.insert(first, id);

        let entries = run
            .iter()
            .map(|instruction| {
                let mut event = instruction.event.clone();
                event.map_targets(|raw| {
                    resolver
                        .label_at(raw.0 as usize)
                        .unwrap_or(raw)
                });
                TrackEntry {
                    label: resolver.label_at(instruction.offset),
                    event,
                }
            })
            .collect();
        trace!(track = %id, offset = first, len = end - first, filler = next - end, "decoded region");
        parts
            .regions
            .insert(id, Track::from_entries(entries, bytes[end..next].to_vec()));
    }

    for (slot, offset) in header.slots.iter().enumerate() {
        let Some(offset) = *offset else { continue };
        let at = usize::from(offset);
        let entry = match starts.get(&at) {
            Some(&id) => SlotEntry::Region(id),
            None => resolver
                .label_at(at)
                .map(SlotEntry::Label)
                .ok_or(DecodeError::BadTrackOffset { slot, offset })?,
        };
        parts.slots[slot] = Some(entry);
    }

    debug!(
        name = %String::from_utf8_lossy(&header.name),
        size = bytes.len(),
        regions = parts.regions.len(),
        labels = resolver.len(),
        "decoded sequence asset"
    );
    Ok(Document::from(parts))
}

struct Header {
    name: [u8; 4],
    time_base: u16,
    variations: Vec<Variation>,
    slots: [Option<u16>; TRACK_SLOTS],
}

fn truncated(bytes: &[u8], len: usize) -> DecodeError {
    DecodeError::Truncated {
        offset: bytes.len(),
        needed: len.saturating_sub(bytes.len()),
    }
}

fn invalid_header(offset: usize, reason: impl Into<String>) -> DecodeError {
    DecodeError::InvalidHeader {
        offset,
        reason: reason.into(),
    }
}

fn read_header(bytes: &[u8], limits: &CodecLimits) -> Result<Header, DecodeError> {
    if bytes.len() < HEADER_LEN {
        return Err(truncated(bytes, HEADER_LEN));
    }
    let header_err = |_| truncated(bytes, HEADER_LEN);
    let mut r = Cursor::new(bytes);

    let mut magic = [0u8; 4];
    r.read_exact(&mut magic).map_err(header_err)?;
    if magic != MAGIC {
        return Err(DecodeError::InvalidMagic { found: magic });
    }

    let declared = r.read_u32::<BigEndian>().map_err(header_err)?;
    if declared as usize != bytes.len() {
        return Err(DecodeError::SizeMismatch {
            declared,
            actual: bytes.len(),
        });
    }
    if bytes.len() > limits.max_size() {
        return Err(DecodeError::BufferTooLarge {
            size: bytes.len(),
            max: limits.max_size(),
        });
    }

    let mut name = [0u8; 4];
    r.read_exact(&mut name).map_err(header_err)?;

    let time_base = r.read_u16::<BigEndian>().map_err(header_err)?;
    let variation_count = usize::from(r.read_u8().map_err(header_err)?);
    let reserved = r.read_u8().map_err(header_err)?;
    if reserved != 0 {
        return Err(invalid_header(
            RESERVED_OFFSET,
            format!("reserved byte is {:#04x}, expected 0", reserved),
        ));
    }
    if variation_count > MAX_VARIATIONS {
        return Err(invalid_header(
            VARIATION_COUNT_OFFSET,
            format!("{} variations, at most {} allowed", variation_count, MAX_VARIATIONS),
        ));
    }
    if !(TIME_BASE_MIN..=TIME_BASE_MAX).contains(&time_base) {
        return Err(invalid_header(
            TIME_BASE_OFFSET,
            format!("time base {} outside {}..={}", time_base, TIME_BASE_MIN, TIME_BASE_MAX),
        ));
    }

    let mut slots = [None; TRACK_SLOTS];
    r.set_position(TRACK_TABLE_OFFSET as u64);
    for slot in slots.iter_mut() {
        let offset = r.read_u16::<BigEndian>().map_err(header_err)?;
        if offset != UNUSED_SLOT {
            *slot = Some(offset);
        }
    }

    let start = regions_start(variation_count);
    if bytes.len() < start {
        return Err(truncated(bytes, start));
    }
    let table_err = |_| truncated(bytes, start);
    let mut variations = Vec::with_capacity(variation_count);
    for index in 0..variation_count {
        let slots = r.read_u16::<BigEndian>().map_err(table_err)?;
        let flags = r.read_u8().map_err(table_err)?;
        if r.read_u8().map_err(table_err)? != 0 {
            return Err(invalid_header(
                VARIATION_TABLE_OFFSET + index * VARIATION_ENTRY_LEN + 3,
                format!("variation {} reserved byte is not 0", index),
            ));
        }
        variations.push(Variation { slots, flags });
    }

    for (slot, offset) in slots.iter().enumerate() {
        if let Some(offset) = *offset {
            let at = usize::from(offset);
            if at < start || at >= bytes.len() {
                return Err(DecodeError::BadTrackOffset { slot, offset });
            }
        }
    }

    Ok(Header {
        name,
        time_base,
        variations,
        slots,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cover {
    Free,
    Start,
    Inside,
}

/// Sweep every entry point and return the decoded instructions by offset.
fn disassemble(
    bytes: &[u8],
    start: usize,
    slots: &[Option<u16>; TRACK_SLOTS],
) -> Result<BTreeMap<usize, Instruction>, DecodeError> {
    let mut cover = vec![Cover::Free; bytes.len()];
    let mut decoded: BTreeMap<usize, Instruction> = BTreeMap::new();

    // (entry, referrer); slot entries have no referrer.
    let mut queue: VecDeque<(usize, Option<usize>)> = slots
        .iter()
        .flatten()
        .map(|&offset| (usize::from(offset), None))
        .collect();

    while let Some((entry, referrer)) = queue.pop_front() {
        if let Some(referrer) = referrer {
            if entry < start || entry >= bytes.len() || cover[entry] == Cover::Inside {
                return Err(DecodeError::UnresolvableTarget {
                    offset: entry,
                    referrer,
                });
            }
        }
        if cover[entry] == Cover::Start {
            continue;
        }
        if cover[entry] == Cover::Inside {
            // Slot offsets are bounds-checked already; landing mid-instruction
            // is reported when slots are matched to entry points.
            continue;
        }

        let mut pc = entry;
        loop {
            match cover.get(pc) {
                None => {
                    return Err(DecodeError::Truncated {
                        offset: pc,
                        needed: 1,
                    })
                }
                Some(Cover::Start) => break,
                Some(Cover::Inside) => return Err(DecodeError::OverlappingInstruction { offset: pc }),
                Some(Cover::Free) => {}
            }

            let instruction = read_instruction(bytes, pc)?;
            if cover[pc + 1..instruction.end()]
                .iter()
                .any(|c| *c != Cover::Free)
            {
                return Err(DecodeError::OverlappingInstruction { offset: pc });
            }
            cover[pc] = Cover::Start;
            for c in &mut cover[pc + 1..instruction.end()] {
                *c = Cover::Inside;
            }
            for target in instruction.raw_targets() {
                queue.push_back((target, Some(pc)));
            }

            let terminates = instruction.event.is_end_of_track();
            pc = instruction.end();
            decoded.insert(instruction.offset, instruction);
            if terminates {
                break;
            }
        }
    }

    Ok(decoded)
}

/// Split decoded instructions into regions. A region starts at every
/// instruction that is not the fall-through of a non-terminating one.
fn form_regions(instructions: &BTreeMap<usize, Instruction>) -> Vec<Vec<&Instruction>> {
    let mut regions: Vec<Vec<&Instruction>> = Vec::new();
    let mut previous: Option<&Instruction> = None;
    for instruction in instructions.values() {
        let falls_through = previous.is_some_and(|p| {
            p.end() == instruction.offset && !p.event.is_end_of_track()
        });
        match regions.last_mut() {
            Some(run) if falls_through => run.push(instruction),
            _ => regions.push(vec![instruction]),
        }
        previous = Some(instruction);
    }
    regions
}

/// Distinct control-flow target offsets in ascending order.
fn target_offsets(instructions: &BTreeMap<usize, Instruction>) -> BTreeSet<usize> {
    instructions
        .values()
        .flat_map(Instruction::raw_targets)
        .collect()
}
