#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Anything the decoder accepts must re-encode to the same bytes.
    if let Ok(doc) = bgmforge_codec::decode(data) {
        let encoded = bgmforge_codec::encode(&doc).expect("decoded document must encode");
        assert_eq!(encoded, data, "round trip changed the asset");
    }
});
