//! Capacity limits shared by the decoder and encoder.

use serde::{Deserialize, Serialize};

use bgmforge_model::format::{MAX_ASSET_SIZE, OFFSET_SPACE};

/// Size limits applied when decoding or encoding an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecLimits {
    /// Largest asset accepted or produced, in bytes.
    pub max_asset_size: usize,
}

impl Default for CodecLimits {
    fn default() -> Self {
        Self {
            max_asset_size: MAX_ASSET_SIZE,
        }
    }
}

impl CodecLimits {
    /// Highest limit any configuration can reach: 16-bit offsets must be able
    /// to address every byte.
    pub const CEILING: usize = OFFSET_SPACE - 1;

    pub const fn new(max_asset_size: usize) -> Self {
        Self { max_asset_size }
    }

    /// The configured limit, capped at [`Self::CEILING`].
    pub fn max_size(&self) -> usize {
        self.max_asset_size.min(Self::CEILING)
    }
}
