//! bgmforge edit engine
//!
//! Applies edit operations to a [`bgmforge_model::Document`] atomically and
//! keeps an undo/redo history.
//!
//! Events are addressed through the route playback takes to reach them: a
//! track slot, optionally followed by a chain of control-flow events. When an
//! edit goes through a region that other slots or call sites also reach, the
//! region is forked first so that only the addressed route sees the change.
//!
//! ```
//! use bgmforge_edit::{EditOperation, Editor, EventAddress};
//! use bgmforge_model::{Document, Event, Track};
//!
//! let mut doc = Document::new(*b"SONG");
//! let id = doc.add_region(Track::from_events([Event::rest(24).unwrap()])).unwrap();
//! doc.set_slot(0, Some(id)).unwrap();
//!
//! let mut editor = Editor::from_document(doc.clone());
//! editor
//!     .apply(EditOperation::Insert {
//!         at: EventAddress::slot(0, 0),
//!         event: Event::set_tempo(140).unwrap(),
//!     })
//!     .unwrap();
//! assert_eq!(editor.track(0).unwrap().len(), 3);
//!
//! editor.undo().unwrap();
//! assert_eq!(editor.document(), &doc);
//! ```
//!
//! # Modules
//!
//! - [`operation`]: Edit operations and event addresses
//! - [`engine`]: Applying an operation as one transaction
//! - [`change`]: Invertible primitive changes and patches
//! - [`route`]: Address resolution and fork-on-edit
//! - [`editor`]: The editor facade with history
//! - [`error`]: Edit rejection reasons

pub mod change;
pub mod editor;
pub mod engine;
pub mod error;
pub mod operation;
pub mod route;

pub use change::{Change, Patch};
pub use editor::Editor;
pub use engine::apply;
pub use error::EditError;
pub use operation::{EditOperation, EventAddress, Route};
pub use route::locate;
