//! Rebuild pipeline: re-encode an edited document into a deliverable asset.
//!
//! A rebuild is an encode with ROM alignment padding, plus the metadata an
//! external patcher needs: a BLAKE3 content hash and a layout report telling
//! where every slot and region landed.

use serde::{Deserialize, Serialize};
use tracing::info;

use bgmforge_model::{Document, TrackId};

use crate::en::encode_layout;
use crate::error::EncodeError;
use crate::limits::CodecLimits;

/// Rebuild configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RebuildOptions {
    /// Pad the asset with zeros to a multiple of this many bytes. 0 and 1
    /// disable padding; anything above the size limit is rejected.
    pub alignment: usize,
    /// Capacity limits.
    pub limits: CodecLimits,
}

impl Default for RebuildOptions {
    fn default() -> Self {
        Self::rom()
    }
}

impl RebuildOptions {
    /// Alignment used for assets copied by DMA from ROM.
    pub const ROM_ALIGNMENT: usize = 4;

    /// Word-aligned output for ROM insertion.
    pub fn rom() -> Self {
        Self {
            alignment: Self::ROM_ALIGNMENT,
            limits: CodecLimits::default(),
        }
    }

    /// Output identical to a plain encode.
    pub fn unpadded() -> Self {
        Self {
            alignment: 1,
            limits: CodecLimits::default(),
        }
    }

    /// Look up a preset by name.
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "rom" | "default" => Some(Self::rom()),
            "unpadded" => Some(Self::unpadded()),
            _ => None,
        }
    }

    pub fn with_limits(mut self, limits: CodecLimits) -> Self {
        self.limits = limits;
        self
    }
}

/// Where a used track slot points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotLayout {
    pub slot: usize,
    pub track: TrackId,
    pub offset: u16,
}

/// Where a region landed and how many bytes it occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionLayout {
    pub track: TrackId,
    pub offset: u16,
    /// Encoded events, excluding filler.
    pub len: usize,
    /// Filler bytes written after the region.
    pub filler: usize,
    /// Whether more than one slot or call site leads into the region.
    pub shared: bool,
}

/// Layout of a rebuilt asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutReport {
    /// Total size, padding included.
    pub size: usize,
    /// Alignment padding at the end of the asset.
    pub padding: usize,
    pub slots: Vec<SlotLayout>,
    pub regions: Vec<RegionLayout>,
}

/// A rebuilt asset ready for the external patcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuiltAsset {
    /// Asset bytes.
    pub data: Vec<u8>,
    /// BLAKE3 hash of `data`, hex encoded.
    pub hash: String,
    pub layout: LayoutReport,
}

/// Re-encode `doc` with the configured padding and report its layout.
///
/// The size field includes the padding, so decoding the result and encoding
/// it again reproduces it byte for byte.
pub fn rebuild(doc: &Document, options: &RebuildOptions) -> Result<RebuiltAsset, EncodeError> {
    let encoded = encode_layout(doc, &options.limits, options.alignment)?;

    let regions: Vec<RegionLayout> = encoded
        .regions
        .iter()
        .map(|placed| RegionLayout {
            track: placed.id,
            offset: placed.offset as u16,
            len: placed.len,
            filler: placed.filler,
            shared: doc.is_shared(placed.id),
        })
        .collect();

    let slots = encoded
        .slots
        .iter()
        .filter_map(|&(slot, offset)| {
            doc.track_id(slot).ok().map(|track| SlotLayout {
                slot,
                track,
                offset: offset as u16,
            })
        })
        .collect();

    let hash = blake3::hash(&encoded.bytes).to_hex().to_string();
    let layout = LayoutReport {
        size: encoded.bytes.len(),
        padding: encoded.padding,
        slots,
        regions,
    };

    info!(
        name = %doc.name_lossy(),
        size = layout.size,
        padding = layout.padding,
        hash = %hash,
        "rebuilt sequence asset"
    );
    Ok(RebuiltAsset {
        data: encoded.bytes,
        hash,
        layout,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::de::decode;
    use crate::en::encode;
    use bgmforge_model::{Event, Label, Track, TrackEntry};
    use pretty_assertions::assert_eq;

    fn shared_call_document() -> Document {
        let mut doc = Document::new(*b"RBLD");
        let a = doc
            .add_region(Track::from_events([Event::call(Label(0))]))
            .unwrap();
        let b = doc
            .add_region(Track::from_events([
                Event::rest(3).unwrap(),
                Event::call(Label(0)),
            ]))
            .unwrap();
        doc.add_region(Track::from_entries(
            vec![
                TrackEntry::labelled(Label(0), Event::note_on(1, 2, 3).unwrap()),
                Event::EndOfTrack.into(),
            ],
            Vec::new(),
        ))
        .unwrap();
        doc.set_slot(0, Some(a)).unwrap();
        doc.set_slot(1, Some(b)).unwrap();
        doc
    }

    #[test]
    fn rebuilt_asset_round_trips() {
        let doc = shared_call_document();
        let rebuilt = rebuild(&doc, &RebuildOptions::rom()).unwrap();
        assert_eq!(rebuilt.data.len() % 4, 0);

        let decoded = decode(&rebuilt.data).unwrap();
        assert_eq!(encode(&decoded).unwrap(), rebuilt.data);
        let again = rebuild(&decoded, &RebuildOptions::rom()).unwrap();
        assert_eq!(again.hash, rebuilt.hash);
    }

    #[test]
    fn unpadded_matches_encode() {
        let doc = shared_call_document();
        let rebuilt = rebuild(&doc, &RebuildOptions::unpadded()).unwrap();
        assert_eq!(rebuilt.data, encode(&doc).unwrap());
        assert_eq!(rebuilt.layout.padding, 0);
    }

    #[test]
    fn layout_reports_sharing() {
        let rebuilt = rebuild(&shared_call_document(), &RebuildOptions::unpadded()).unwrap();
        let layout = &rebuilt.layout;
        assert_eq!(layout.slots.len(), 2);
        assert_eq!(layout.slots[0].offset, 0x30);
        assert_eq!(layout.regions[0].len, 4);
        assert_eq!(layout.slots[1].offset, 0x34);
        assert!(layout.regions[2].shared);
        assert!(!layout.regions[0].shared);
        assert_eq!(
            rebuilt.hash,
            blake3::hash(&rebuilt.data).to_hex().to_string()
        );
    }

    #[test]
    fn oversized_alignment_from_config_is_an_error() {
        let options: RebuildOptions =
            serde_json::from_str(r#"{"alignment":4294967295}"#).unwrap();
        let err = rebuild(&shared_call_document(), &options).unwrap_err();
        assert!(
            matches!(err, EncodeError::InvalidAlignment { alignment: 4294967295, max: 0x8000 }),
            "{err}"
        );
    }

    #[test]
    fn options_from_json() {
        let options: RebuildOptions = serde_json::from_str(r#"{"alignment":16}"#).unwrap();
        assert_eq!(options.alignment, 16);
        assert_eq!(options.limits, CodecLimits::default());
        assert_eq!(RebuildOptions::by_name("unpadded"), Some(RebuildOptions::unpadded()));
        assert_eq!(RebuildOptions::by_name("tape"), None);
    }

    #[test]
    fn layout_serializes() {
        let rebuilt = rebuild(&shared_call_document(), &RebuildOptions::rom()).unwrap();
        let json = serde_json::to_string(&rebuilt.layout).unwrap();
        let back: LayoutReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rebuilt.layout);
    }
}
