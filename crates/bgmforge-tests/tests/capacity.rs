//! Capacity ceiling at, below, and above the limit.

use bgmforge_codec::{
    decode, decode_with_limits, encode, rebuild, CodecLimits, DecodeError, EncodeError,
    RebuildOptions,
};
use bgmforge_edit::{EditError, EditOperation, Editor, EventAddress};
use bgmforge_model::format::MAX_ASSET_SIZE;
use bgmforge_model::Event;
use bgmforge_tests::fixtures::rest_run;
use pretty_assertions::assert_eq;

/// Rests needed for an asset of exactly `size` bytes.
fn rests_for(size: usize) -> usize {
    size - 0x31
}

#[test]
fn decodes_and_encodes_up_to_the_ceiling() {
    for size in [MAX_ASSET_SIZE - 1, MAX_ASSET_SIZE] {
        let bytes = rest_run(rests_for(size));
        assert_eq!(bytes.len(), size);
        let doc = decode(&bytes).unwrap();
        assert_eq!(doc.track(0).unwrap().len(), rests_for(size) + 1);
        assert_eq!(encode(&doc).unwrap(), bytes);
    }
}

#[test]
fn decode_rejects_oversized_asset() {
    let bytes = rest_run(rests_for(MAX_ASSET_SIZE + 1));
    assert_eq!(
        decode(&bytes).unwrap_err(),
        DecodeError::BufferTooLarge {
            size: MAX_ASSET_SIZE + 1,
            max: MAX_ASSET_SIZE,
        }
    );
}

#[test]
fn encode_rejects_growth_past_the_ceiling() {
    let bytes = rest_run(rests_for(MAX_ASSET_SIZE));
    let mut editor = Editor::open(&bytes).unwrap();
    // Edits are not size-checked; the overflow surfaces on encode.
    editor
        .apply(EditOperation::Insert {
            at: EventAddress::slot(0, 0),
            event: Event::rest(1).unwrap(),
        })
        .unwrap();
    match editor.encode() {
        Err(EncodeError::BufferTooLarge { size, max }) => {
            assert_eq!((size, max), (MAX_ASSET_SIZE + 1, MAX_ASSET_SIZE));
        }
        other => panic!("expected BufferTooLarge, got {:?}", other.map(|b| b.len())),
    }

    editor.undo().unwrap();
    assert_eq!(editor.encode().unwrap(), bytes);
}

#[test]
fn lowered_limit_applies_to_both_directions() {
    let limits = CodecLimits::new(0x40);
    let fits = rest_run(rests_for(0x40));
    let too_big = rest_run(rests_for(0x41));

    assert!(decode_with_limits(&fits, &limits).is_ok());
    assert!(matches!(
        decode_with_limits(&too_big, &limits),
        Err(DecodeError::BufferTooLarge { size: 0x41, max: 0x40 })
    ));

    let mut editor = Editor::open_with_limits(&fits, limits).unwrap();
    editor
        .apply(EditOperation::Replace {
            at: EventAddress::slot(0, 0),
            event: Event::rest(0x100).unwrap(),
        })
        .unwrap();
    assert!(matches!(
        editor.encode(),
        Err(EncodeError::BufferTooLarge { size: 0x41, max: 0x40 })
    ));
}

#[test]
fn rebuild_padding_counts_against_the_limit() {
    let limits = CodecLimits::new(0x41);
    let doc = decode_with_limits(&rest_run(rests_for(0x41)), &limits).unwrap();

    // Unpadded it fits exactly; word alignment pushes it over.
    let unpadded = rebuild(&doc, &RebuildOptions::unpadded().with_limits(limits)).unwrap();
    assert_eq!(unpadded.data.len(), 0x41);
    assert_eq!(
        rebuild(&doc, &RebuildOptions::rom().with_limits(limits)).unwrap_err().to_string(),
        EncodeError::BufferTooLarge { size: 0x44, max: 0x41 }.to_string()
    );

    // The same at the default ceiling with an odd alignment.
    let doc = decode(&rest_run(rests_for(MAX_ASSET_SIZE))).unwrap();
    let options = RebuildOptions {
        alignment: 3,
        ..RebuildOptions::rom()
    };
    assert!(matches!(
        rebuild(&doc, &options),
        Err(EncodeError::BufferTooLarge { size, max: MAX_ASSET_SIZE }) if size == MAX_ASSET_SIZE + 1
    ));
}

#[test]
fn rebuild_rejects_alignment_beyond_the_limit() {
    let doc = decode(&rest_run(4)).unwrap();
    let options = RebuildOptions {
        alignment: usize::MAX,
        ..RebuildOptions::rom()
    };
    assert!(matches!(
        rebuild(&doc, &options),
        Err(EncodeError::InvalidAlignment { alignment: usize::MAX, max: MAX_ASSET_SIZE })
    ));
}

#[test]
fn out_of_range_operands_are_rejected_before_encode() {
    let mut editor = Editor::open(&rest_run(1)).unwrap();
    let err = editor
        .apply(EditOperation::Retime {
            at: EventAddress::slot(0, 0),
            duration: 0,
        })
        .unwrap_err();
    assert!(matches!(err, EditError::InvalidOperand(_)), "{}", err);
}
