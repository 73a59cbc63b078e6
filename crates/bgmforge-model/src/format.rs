//! Container layout constants for the "BGM " sequence asset.
//!
//! All multi-byte fields are big-endian. Offsets are absolute from the first
//! byte of the asset and 16 bits wide.
//!
//! ```text
//! 0x00  [u8; 4]   magic "BGM "
//! 0x04  u32       total asset size
//! 0x08  [u8; 4]   asset name
//! 0x0C  u16       time base (ticks per quarter note)
//! 0x0E  u8        variation count
//! 0x0F  u8        reserved (0)
//! 0x10  [u16; 16] track offset table (0 = unused slot)
//! 0x30  n * 4     variation table: u16 slot mask, u8 flags, u8 reserved (0)
//! ....            track regions and filler
//! ```

/// Asset magic at offset 0x00.
pub const MAGIC: [u8; 4] = *b"BGM ";

/// Offset of the u32 total size field.
pub const SIZE_OFFSET: usize = 0x04;

/// Offset of the four-byte asset name.
pub const NAME_OFFSET: usize = 0x08;

/// Offset of the u16 time base.
pub const TIME_BASE_OFFSET: usize = 0x0C;

/// Offset of the u8 variation count.
pub const VARIATION_COUNT_OFFSET: usize = 0x0E;

/// Offset of the reserved header byte.
pub const RESERVED_OFFSET: usize = 0x0F;

/// Offset of the track offset table.
pub const TRACK_TABLE_OFFSET: usize = 0x10;

/// Number of track slots in the offset table.
pub const TRACK_SLOTS: usize = 16;

/// Track table sentinel for an unused slot.
pub const UNUSED_SLOT: u16 = 0x0000;

/// Offset of the variation table.
pub const VARIATION_TABLE_OFFSET: usize = 0x30;

/// Size of one variation table entry.
pub const VARIATION_ENTRY_LEN: usize = 4;

/// Maximum number of variations a header can declare.
pub const MAX_VARIATIONS: usize = 4;

/// Size of the fixed part of the header (before the variation table).
pub const HEADER_LEN: usize = VARIATION_TABLE_OFFSET;

/// Capacity of the sound engine's sequence buffer.
pub const MAX_ASSET_SIZE: usize = 0x8000;

/// Number of addressable bytes with 16-bit offsets.
pub const OFFSET_SPACE: usize = 0x1_0000;

/// Smallest valid time base.
pub const TIME_BASE_MIN: u16 = 1;

/// Largest valid time base.
pub const TIME_BASE_MAX: u16 = 960;

/// Time base used for new documents.
pub const DEFAULT_TIME_BASE: u16 = 48;

/// Variation flag: playback loops back to the start of the variation.
pub const VARIATION_LOOPS: u8 = 0x01;

/// Offset at which track regions may begin for a given variation count.
pub const fn regions_start(variation_count: usize) -> usize {
    VARIATION_TABLE_OFFSET + variation_count * VARIATION_ENTRY_LEN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_table_fits_before_variations() {
        assert_eq!(TRACK_TABLE_OFFSET + TRACK_SLOTS * 2, VARIATION_TABLE_OFFSET);
    }

    #[test]
    fn regions_start_accounts_for_variations() {
        assert_eq!(regions_start(0), 0x30);
        assert_eq!(regions_start(MAX_VARIATIONS), 0x40);
    }

    #[test]
    fn capacity_is_addressable() {
        assert!(MAX_ASSET_SIZE <= OFFSET_SPACE);
    }
}
