//! Edit operations and event addressing.

use std::fmt;

use bgmforge_model::{Event, Variation};

/// How an address reaches its region.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    /// The region a track slot plays in, from the event it starts at.
    Slot(usize),
    /// The region entered by the control-flow event at another address.
    Call(Box<EventAddress>),
}

/// An event reached through a route.
///
/// `index` counts from the route's entry point: the event a slot starts at,
/// the targeted event for a call. Addressing through the route rather
/// than by region lets the engine tell which reference to a shared region an
/// edit is meant for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventAddress {
    pub route: Route,
    pub index: usize,
}

impl EventAddress {
    /// Event `index` of the track in `slot`.
    pub fn slot(slot: usize, index: usize) -> Self {
        Self {
            route: Route::Slot(slot),
            index,
        }
    }

    /// Event `index` after the entry point of the control flow at `caller`.
    pub fn via(caller: EventAddress, index: usize) -> Self {
        Self {
            route: Route::Call(Box::new(caller)),
            index,
        }
    }

    /// Same route, another index.
    pub fn at(&self, index: usize) -> Self {
        Self {
            route: self.route.clone(),
            index,
        }
    }
}

impl fmt::Display for EventAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.route {
            Route::Slot(slot) => write!(f, "slot {}[{}]", slot, self.index),
            Route::Call(caller) => write!(f, "({})->[{}]", caller, self.index),
        }
    }
}

/// A user-level edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOperation {
    /// Insert `event` before the event at `at`. A label at that position
    /// moves to the new event.
    Insert { at: EventAddress, event: Event },
    /// Remove the event at `at`.
    Remove { at: EventAddress },
    /// Replace the event at `at`, keeping its label.
    Replace { at: EventAddress, event: Event },
    /// Change the duration of a note or rest.
    Retime { at: EventAddress, duration: u16 },
    /// Give the event at `at` a label so new control flow can target it.
    AttachLabel { at: EventAddress },
    /// Put an empty track in an unused slot.
    AddTrack { slot: usize },
    /// Clear a slot. Its region goes too unless something else reaches it.
    RemoveTrack { slot: usize },
    /// Move a track to an unused slot.
    MoveTrack { from: usize, to: usize },
    SetTimeBase { time_base: u16 },
    SetVariations { variations: Vec<Variation> },
    SetName { name: [u8; 4] },
}

impl EditOperation {
    /// Short operation name for logs and history views.
    pub fn name(&self) -> &'static str {
        match self {
            EditOperation::Insert { .. } => "insert",
            EditOperation::Remove { .. } => "remove",
            EditOperation::Replace { .. } => "replace",
            EditOperation::Retime { .. } => "retime",
            EditOperation::AttachLabel { .. } => "attach-label",
            EditOperation::AddTrack { .. } => "add-track",
            EditOperation::RemoveTrack { .. } => "remove-track",
            EditOperation::MoveTrack { .. } => "move-track",
            EditOperation::SetTimeBase { .. } => "set-time-base",
            EditOperation::SetVariations { .. } => "set-variations",
            EditOperation::SetName { .. } => "set-name",
        }
    }
}
