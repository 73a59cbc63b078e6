//! Holistic document validation.
//!
//! Edits are range-checked when they are made, but some properties only hold
//! across the whole document (a jump target that lives in another region, a
//! region that stops being reachable after a slot is cleared). `validate`
//! checks all of them at once and collects every problem it finds.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

use crate::document::Document;
use crate::error::TrackLookupError;
use crate::event::Label;
use crate::format::{MAX_VARIATIONS, TIME_BASE_MAX, TIME_BASE_MIN};
use crate::track::{EventPosition, TrackId};

/// Stable codes for validation findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationCode {
    /// V001: A control-flow target is placed nowhere
    DanglingLabel,
    /// V002: An event operand does not fit its encoding
    OperandOutOfRange,
    /// V003: A region does not end with EndOfTrack
    MissingEndOfTrack,
    /// V004: EndOfTrack before the last position
    MisplacedEndOfTrack,
    /// V005: One label placed twice
    DuplicateLabel,
    /// V006: A slot names a missing region
    UnknownTrack,
    /// V007: A region would not be recovered by decoding
    UnreachableTrack,
    /// V008: Time base out of range
    TimeBaseOutOfRange,
    /// V009: Too many variations
    TooManyVariations,
}

impl ValidationCode {
    /// Returns the code string (e.g., "V001").
    pub fn code(&self) -> &'static str {
        match self {
            ValidationCode::DanglingLabel => "V001",
            ValidationCode::OperandOutOfRange => "V002",
            ValidationCode::MissingEndOfTrack => "V003",
            ValidationCode::MisplacedEndOfTrack => "V004",
            ValidationCode::DuplicateLabel => "V005",
            ValidationCode::UnknownTrack => "V006",
            ValidationCode::UnreachableTrack => "V007",
            ValidationCode::TimeBaseOutOfRange => "V008",
            ValidationCode::TooManyVariations => "V009",
        }
    }
}

impl fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A validation finding with code, message, and location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The finding code.
    pub code: ValidationCode,
    /// Human-readable message.
    pub message: String,
    /// Event the finding refers to.
    pub position: Option<EventPosition>,
    /// Region the finding refers to, when it is not tied to one event.
    pub track: Option<TrackId>,
}

impl ValidationError {
    pub fn new(code: ValidationCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            position: None,
            track: None,
        }
    }

    /// A finding about one event.
    pub fn at(code: ValidationCode, message: impl Into<String>, position: EventPosition) -> Self {
        Self {
            code,
            message: message.into(),
            position: Some(position),
            track: Some(position.track),
        }
    }

    /// A finding about a whole region.
    pub fn for_track(code: ValidationCode, message: impl Into<String>, track: TrackId) -> Self {
        Self {
            code,
            message: message.into(),
            position: None,
            track: Some(track),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.position, self.track) {
            (Some(position), _) => write!(f, "{}: {} (at {})", self.code, self.message, position),
            (None, Some(track)) => write!(f, "{}: {} (in track {})", self.code, self.message, track),
            (None, None) => write!(f, "{}: {}", self.code, self.message),
        }
    }
}

impl std::error::Error for ValidationError {}

impl Document {
    /// Check the whole document. An empty result means it can be encoded.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        validate_header(self, &mut errors);
        validate_slots(self, &mut errors);
        validate_regions(self, &mut errors);
        validate_labels(self, &mut errors);
        validate_reachability(self, &mut errors);
        errors
    }

    /// Whether `validate` finds nothing.
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

fn validate_header(doc: &Document, errors: &mut Vec<ValidationError>) {
    if !(TIME_BASE_MIN..=TIME_BASE_MAX).contains(&doc.time_base) {
        errors.push(ValidationError::new(
            ValidationCode::TimeBaseOutOfRange,
            format!(
                "time base {} is outside {}..={}",
                doc.time_base, TIME_BASE_MIN, TIME_BASE_MAX
            ),
        ));
    }
    if doc.variations.len() > MAX_VARIATIONS {
        errors.push(ValidationError::new(
            ValidationCode::TooManyVariations,
            format!(
                "{} variations declared, at most {} allowed",
                doc.variations.len(),
                MAX_VARIATIONS
            ),
        ));
    }
}

fn validate_slots(doc: &Document, errors: &mut Vec<ValidationError>) {
    for index in 0..doc.slots().len() {
        match doc.slot_start(index) {
            Err(TrackLookupError::UnknownRegion { id }) => {
                errors.push(ValidationError::for_track(
                    ValidationCode::UnknownTrack,
                    format!("slot {} refers to missing region {}", index, id),
                    id,
                ));
            }
            Err(TrackLookupError::UnplacedEntry { label, .. }) => {
                errors.push(ValidationError::new(
                    ValidationCode::DanglingLabel,
                    format!("slot {} enters at label {} which is not placed", index, label),
                ));
            }
            _ => {}
        }
    }
}

fn validate_regions(doc: &Document, errors: &mut Vec<ValidationError>) {
    for (id, track) in doc.regions() {
        let last = track.len().saturating_sub(1);
        for (index, entry) in track.entries().iter().enumerate() {
            let position = EventPosition::new(id, index);
            let event = &entry.event;

            if let Err(err) = event.check_operands() {
                errors.push(ValidationError::at(
                    ValidationCode::OperandOutOfRange,
                    format!("{}: {}", event.mnemonic(), err),
                    position,
                ));
            }

            if event.is_end_of_track() && index != last {
                errors.push(ValidationError::at(
                    ValidationCode::MisplacedEndOfTrack,
                    "EndOfTrack before the end of the region",
                    position,
                ));
            }

            for target in event.targets() {
                if doc.locate(target).is_none() {
                    errors.push(ValidationError::at(
                        ValidationCode::DanglingLabel,
                        format!("{} targets label {} which is not placed", event.mnemonic(), target),
                        position,
                    ));
                }
            }
        }

        if !track.entries().last().is_some_and(|e| e.event.is_end_of_track()) {
            errors.push(ValidationError::for_track(
                ValidationCode::MissingEndOfTrack,
                format!("region {} does not end with EndOfTrack", id),
                id,
            ));
        }
    }
}

fn validate_labels(doc: &Document, errors: &mut Vec<ValidationError>) {
    let mut seen: BTreeSet<Label> = BTreeSet::new();
    for (id, track) in doc.regions() {
        for (index, label) in track.labels() {
            if !seen.insert(label) {
                errors.push(ValidationError::at(
                    ValidationCode::DuplicateLabel,
                    format!("label {} is placed more than once", label),
                    EventPosition::new(id, index),
                ));
            }
        }
    }
}

impl Document {
    /// Earliest entry index of every region reachable from the track table.
    ///
    /// Regions are recovered by sweeping from the slot table and every
    /// control-flow target to the end of the region, so a region survives a
    /// decode only if it maps to 0 here. Targets in code no sweep reaches do
    /// not count.
    pub fn entry_points(&self) -> BTreeMap<TrackId, usize> {
        let mut swept: BTreeMap<TrackId, usize> = BTreeMap::new();
        let mut queue: VecDeque<TrackId> = VecDeque::new();
        let enter = |position: EventPosition,
                     swept: &mut BTreeMap<TrackId, usize>,
                     queue: &mut VecDeque<TrackId>| {
            let earlier = swept
                .get(&position.track)
                .map_or(true, |&start| position.index < start);
            if earlier {
                swept.insert(position.track, position.index);
                queue.push_back(position.track);
            }
        };

        for index in 0..self.slots().len() {
            if let Ok(start) = self.slot_start(index) {
                enter(start, &mut swept, &mut queue);
            }
        }

        while let Some(id) = queue.pop_front() {
            let (Some(track), Some(&from)) = (self.region(id), swept.get(&id)) else {
                continue;
            };
            for entry in track.entries().iter().skip(from) {
                for target in entry.event.targets() {
                    if let Some(position) = self.locate(target) {
                        enter(position, &mut swept, &mut queue);
                    }
                }
            }
        }
        swept
    }
}

fn validate_reachability(doc: &Document, errors: &mut Vec<ValidationError>) {
    let swept = doc.entry_points();
    for (id, _) in doc.regions() {
        match swept.get(&id) {
            Some(0) => {}
            Some(start) => errors.push(ValidationError::for_track(
                ValidationCode::UnreachableTrack,
                format!("region {} is only entered at event {}", id, start),
                id,
            )),
            None => errors.push(ValidationError::for_track(
                ValidationCode::UnreachableTrack,
                format!("region {} is not reachable from any slot", id),
                id,
            )),
        }
    }
}
