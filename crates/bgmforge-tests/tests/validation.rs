//! Validation catches what encode would refuse, and the editor refuses to
//! produce it in the first place.

use bgmforge_codec::{decode, encode, EncodeError};
use bgmforge_edit::{EditError, EditOperation, Editor, EventAddress};
use bgmforge_model::{
    EngineError, Event, EventPosition, Label, TrackId, ValidationCode, ValidationError,
};
use bgmforge_tests::fixtures;
use pretty_assertions::assert_eq;

#[test]
fn dangling_target_is_reported_once_at_the_jump() {
    let mut doc = decode(&fixtures::two_track_song().bytes).unwrap();
    // Strip the label the conditional jump targets, bypassing the editor.
    doc.region_mut(TrackId(0)).unwrap().entries_mut()[1].label = None;

    let errors = doc.validate();
    assert_eq!(errors.len(), 1, "{:?}", errors);
    assert_eq!(errors[0].code, ValidationCode::DanglingLabel);
    assert_eq!(errors[0].position, Some(EventPosition::new(TrackId(0), 3)));

    match encode(&doc) {
        Err(EncodeError::Invalid(reported)) => assert_eq!(reported, errors),
        other => panic!("expected Invalid, got {:?}", other),
    }
}

#[test]
fn removing_the_jump_target_directly_dangles_it() {
    let mut doc = decode(&fixtures::two_track_song().bytes).unwrap();
    doc.region_mut(TrackId(0)).unwrap().entries_mut().remove(1);

    let errors = doc.validate();
    assert_eq!(errors.len(), 1, "{:?}", errors);
    assert_eq!(errors[0].code.code(), "V001");
    assert_eq!(errors[0].position, Some(EventPosition::new(TrackId(0), 2)));
    assert!(matches!(encode(&doc), Err(EncodeError::Invalid(_))));
}

#[test]
fn editor_refuses_to_orphan_a_label() {
    let fixture = fixtures::two_track_song();
    let mut editor = Editor::open(&fixture.bytes).unwrap();
    let err = editor
        .apply(EditOperation::Remove {
            at: EventAddress::slot(0, 1),
        })
        .unwrap_err();
    assert_eq!(
        err,
        EditError::WouldOrphanLabel {
            label: Label(0),
            at: EventPosition::new(TrackId(0), 1),
            referrer: EventPosition::new(TrackId(0), 3),
        }
    );
    assert_eq!(err.code(), "EDIT_002");
    assert!(!editor.can_undo());
    assert_eq!(editor.encode().unwrap(), fixture.bytes);
}

#[test]
fn removing_the_referrer_first_frees_the_label() {
    let mut editor = Editor::open(&fixtures::two_track_song().bytes).unwrap();
    editor
        .apply(EditOperation::Remove {
            at: EventAddress::slot(0, 3),
        })
        .unwrap();
    editor
        .apply(EditOperation::Remove {
            at: EventAddress::slot(0, 1),
        })
        .unwrap();
    assert!(editor.validate().is_empty());
    assert_eq!(editor.track(0).unwrap().len(), 3);
}

#[test]
fn edits_cannot_break_termination() {
    let mut editor = Editor::open(&fixtures::single_track_song().bytes).unwrap();
    let rejected = [
        EditOperation::Remove {
            at: EventAddress::slot(0, 3),
        },
        EditOperation::Insert {
            at: EventAddress::slot(0, 1),
            event: Event::EndOfTrack,
        },
        EditOperation::Replace {
            at: EventAddress::slot(0, 0),
            event: Event::EndOfTrack,
        },
    ];
    for op in rejected {
        let err = editor.apply(op.clone()).unwrap_err();
        assert!(
            matches!(err, EditError::BreaksTermination { .. }),
            "{:?}: {}",
            op,
            err
        );
    }
    assert!(editor.validate().is_empty());
}

#[test]
fn validation_errors_display_their_code() {
    let mut doc = decode(&fixtures::single_track_song().bytes).unwrap();
    doc.time_base = 0;
    let errors: Vec<ValidationError> = doc.validate();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].to_string().starts_with("V008"), "{}", errors[0]);
}
