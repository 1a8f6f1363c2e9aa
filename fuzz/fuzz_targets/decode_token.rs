#![no_main]

use libfuzzer_sys::fuzz_target;
use oaipmh_engine::TokenCodec;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };
    let codec = TokenCodec::new("fuzz");
    if let Ok(token) = codec.deserialize(raw) {
        // Anything accepted must re-encode to something that decodes identically.
        let wire = codec.serialize(&token).unwrap();
        assert_eq!(codec.deserialize(&wire).unwrap(), token);
    }
});
