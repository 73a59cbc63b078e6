//! Malformed assets fail with the right error at the right offset.

use bgmforge_codec::{decode, is_bgm, DecodeError};
use bgmforge_edit::Editor;
use bgmforge_model::EngineError;
use bgmforge_tests::{fixtures, AssetBuilder};
use pretty_assertions::assert_eq;

#[test]
fn reserved_opcode_at_track_start() {
    let bytes = AssetBuilder::new(b"BAD ")
        .slot(0, 0x30)
        .bytes(&[0xFF, 0x00])
        .build();
    let err = decode(&bytes).unwrap_err();
    assert_eq!(err, DecodeError::MalformedOpcode { offset: 0x30, byte: 0xFF });
    assert_eq!(err.offset(), 0x30);
    assert_eq!(err.code(), "DECODE_006");
}

#[test]
fn reserved_opcode_mid_track() {
    let bytes = AssetBuilder::new(b"BAD ")
        .slot(0, 0x30)
        .bytes(&[0x18, 0xD4, 0x00])
        .build();
    assert_eq!(
        decode(&bytes).unwrap_err(),
        DecodeError::MalformedOpcode { offset: 0x31, byte: 0xD4 }
    );
}

#[test]
fn truncated_header_and_body() {
    let full = fixtures::single_track_song().bytes;
    assert!(matches!(
        decode(&full[..0x20]),
        Err(DecodeError::Truncated { .. })
    ));

    // A SetTempo cut short by the end of the asset.
    let bytes = AssetBuilder::new(b"CUT ")
        .slot(0, 0x30)
        .bytes(&[0x18, 0xE0, 0x00])
        .build();
    assert!(matches!(
        decode(&bytes),
        Err(DecodeError::Truncated { offset: 0x31, .. })
    ));

    // No EndOfTrack before the end.
    let bytes = AssetBuilder::new(b"CUT ").slot(0, 0x30).bytes(&[0x18]).build();
    assert!(matches!(
        decode(&bytes),
        Err(DecodeError::Truncated { offset: 0x31, .. })
    ));
}

#[test]
fn target_outside_the_asset() {
    let bytes = AssetBuilder::new(b"FAR ")
        .slot(0, 0x30)
        .bytes(&[0xE4, 0x12, 0x34, 0x00])
        .build();
    assert_eq!(
        decode(&bytes).unwrap_err(),
        DecodeError::UnresolvableTarget {
            offset: 0x1234,
            referrer: 0x30,
        }
    );
}

#[test]
fn target_into_the_header() {
    let bytes = AssetBuilder::new(b"HDR ")
        .slot(0, 0x30)
        .bytes(&[0xE7, 0x00, 0x10, 0x00])
        .build();
    assert!(matches!(
        decode(&bytes),
        Err(DecodeError::UnresolvableTarget { offset: 0x10, .. })
    ));
}

#[test]
fn bad_magic() {
    let mut bytes = fixtures::single_track_song().bytes;
    bytes[0..4].copy_from_slice(b"SEQ ");
    assert!(!is_bgm(&bytes));
    assert_eq!(
        decode(&bytes).unwrap_err(),
        DecodeError::InvalidMagic { found: *b"SEQ " }
    );
    assert!(Editor::open(&bytes).is_err());
}

#[test]
fn size_mismatch() {
    let bytes = AssetBuilder::new(b"SIZE")
        .slot(0, 0x30)
        .bytes(&[0x00])
        .declared_size(0x40)
        .build();
    assert_eq!(
        decode(&bytes).unwrap_err(),
        DecodeError::SizeMismatch {
            declared: 0x40,
            actual: 0x31,
        }
    );
}

#[test]
fn invalid_header_fields() {
    let zero_time_base = AssetBuilder::new(b"HDR ")
        .time_base(0)
        .slot(0, 0x30)
        .bytes(&[0x00])
        .build();
    assert!(matches!(
        decode(&zero_time_base),
        Err(DecodeError::InvalidHeader { .. })
    ));

    let mut reserved = fixtures::single_track_song().bytes;
    reserved[0x0F] = 1;
    assert!(matches!(
        decode(&reserved),
        Err(DecodeError::InvalidHeader { offset: 0x0F, .. })
    ));
}

#[test]
fn operand_out_of_range() {
    // NoteOn velocity 0x80.
    let bytes = AssetBuilder::new(b"VEL ")
        .slot(0, 0x30)
        .bytes(&[0x80, 0x80, 0x10, 0x00])
        .build();
    let err = decode(&bytes).unwrap_err();
    assert!(
        matches!(err, DecodeError::OperandOutOfRange { offset: 0x30, .. }),
        "{}",
        err
    );
}
