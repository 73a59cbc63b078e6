//! The editor facade: one open document and its history.

use tracing::{debug, info};

use bgmforge_codec::{
    decode_with_limits, encode_with_limits, rebuild, CodecLimits, DecodeError, EncodeError,
    RebuildOptions, RebuiltAsset,
};
use bgmforge_model::{
    Document, Event, EventPosition, Label, Track, TrackLookupError, ValidationError,
};

use crate::change::Patch;
use crate::engine;
use crate::error::EditError;
use crate::operation::{EditOperation, EventAddress};
use crate::route;

/// An open sequence document with undo and redo.
///
/// All mutation goes through [`Editor::apply`], so every change is recorded.
#[derive(Debug, Clone, Default)]
pub struct Editor {
    document: Document,
    undo_stack: Vec<Patch>,
    redo_stack: Vec<Patch>,
    limits: CodecLimits,
}

impl Editor {
    /// Decode `bytes` and open the result with an empty history.
    pub fn open(bytes: &[u8]) -> Result<Self, DecodeError> {
        Self::open_with_limits(bytes, CodecLimits::default())
    }

    pub fn open_with_limits(bytes: &[u8], limits: CodecLimits) -> Result<Self, DecodeError> {
        let document = decode_with_limits(bytes, &limits)?;
        info!(
            name = %document.name_lossy(),
            regions = document.region_count(),
            "opened sequence"
        );
        Ok(Self {
            document,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            limits,
        })
    }

    /// Open a document built in memory.
    pub fn from_document(document: Document) -> Self {
        Self {
            document,
            ..Self::default()
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn limits(&self) -> &CodecLimits {
        &self.limits
    }

    pub fn track(&self, slot: usize) -> Result<&Track, TrackLookupError> {
        self.document.track(slot)
    }

    /// Position an address currently resolves to.
    pub fn position(&self, address: &EventAddress) -> Result<EventPosition, EditError> {
        route::locate(&self.document, address)
    }

    pub fn event(&self, address: &EventAddress) -> Result<&Event, EditError> {
        let position = self.position(address)?;
        self.document
            .event(position)
            .ok_or(EditError::IndexOutOfRange {
                track: position.track,
                index: position.index,
                len: 0,
            })
    }

    /// Label placed on the addressed event, if any.
    pub fn label_at(&self, address: &EventAddress) -> Result<Option<Label>, EditError> {
        let position = self.position(address)?;
        Ok(self.document.entry(position).and_then(|entry| entry.label))
    }

    /// Apply an operation and record it. A rejected operation changes
    /// nothing, history included.
    pub fn apply(&mut self, operation: EditOperation) -> Result<(), EditError> {
        let patch = engine::apply(&mut self.document, &operation)?;
        if patch.is_empty() {
            return Ok(());
        }
        self.undo_stack.push(patch);
        self.redo_stack.clear();
        Ok(())
    }

    /// Reverse the latest operation. Returns `false` when there is nothing
    /// to undo.
    pub fn undo(&mut self) -> Result<bool, EditError> {
        let Some(patch) = self.undo_stack.pop() else {
            return Ok(false);
        };
        match patch.flip(&mut self.document) {
            Ok(redo) => {
                debug!(operation = patch.operation().name(), "undo");
                self.redo_stack.push(redo);
                Ok(true)
            }
            Err(err) => {
                self.undo_stack.push(patch);
                Err(err)
            }
        }
    }

    /// Re-apply the latest undone operation. Returns `false` when there is
    /// nothing to redo.
    pub fn redo(&mut self) -> Result<bool, EditError> {
        let Some(patch) = self.redo_stack.pop() else {
            return Ok(false);
        };
        match patch.flip(&mut self.document) {
            Ok(undo) => {
                debug!(operation = patch.operation().name(), "redo");
                self.undo_stack.push(undo);
                Ok(true)
            }
            Err(err) => {
                self.redo_stack.push(patch);
                Err(err)
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Operations on the undo stack, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &EditOperation> + '_ {
        self.undo_stack.iter().map(Patch::operation)
    }

    pub fn validate(&self) -> Vec<ValidationError> {
        self.document.validate()
    }

    /// Encode the document as it stands.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        encode_with_limits(&self.document, &self.limits)
    }

    pub fn rebuild(&self, options: &RebuildOptions) -> Result<RebuiltAsset, EncodeError> {
        rebuild(&self.document, options)
    }

    /// Swap in a freshly decoded asset, discarding all history.
    pub fn replace(&mut self, bytes: &[u8]) -> Result<(), DecodeError> {
        self.document = decode_with_limits(bytes, &self.limits)?;
        self.undo_stack.clear();
        self.redo_stack.clear();
        Ok(())
    }

    /// Close the editor, handing back the document.
    pub fn close(self) -> Document {
        self.document
    }
}
