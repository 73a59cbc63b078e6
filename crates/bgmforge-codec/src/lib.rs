//! bgmforge binary codec
//!
//! Converts "BGM " sequence assets to and from [`bgmforge_model::Document`].
//!
//! - [`decode`] disassembles an asset into track regions, interning a label
//!   for every control-flow target so that no byte offset survives in the
//!   model.
//! - [`encode`] lays regions out in ascending track id order and backfills
//!   every target once label offsets are known. It refuses documents that do
//!   not validate.
//! - [`rebuild`] is an encode with ROM alignment, a content hash, and a
//!   layout report.
//!
//! Decoding an asset and encoding the result reproduces the input exactly.
//!
//! ```
//! use bgmforge_codec::{decode, encode};
//! use bgmforge_model::{Document, Event, Track};
//!
//! let mut doc = Document::new(*b"DEMO");
//! let id = doc.add_region(Track::from_events([Event::rest(12).unwrap()])).unwrap();
//! doc.set_slot(0, Some(id)).unwrap();
//!
//! let bytes = encode(&doc).unwrap();
//! assert_eq!(bytes.len(), 0x32);
//! assert_eq!(decode(&bytes).unwrap(), doc);
//! ```

pub mod de;
pub mod en;
pub mod error;
mod instruction;
pub mod limits;
pub mod rebuild;
pub mod relocation;

pub use de::{decode, decode_with_limits, is_bgm};
pub use en::{encode, encode_with_limits};
pub use error::{DecodeError, EncodeError};
pub use limits::CodecLimits;
pub use rebuild::{rebuild, LayoutReport, RebuildOptions, RebuiltAsset, RegionLayout, SlotLayout};
pub use relocation::{Fixup, LabelResolver};
