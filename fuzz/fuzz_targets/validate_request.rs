#![no_main]

use libfuzzer_sys::fuzz_target;
use oaipmh_engine::HarvestRequest;

fuzz_target!(|data: &[u8]| {
    let Ok(query) = std::str::from_utf8(data) else {
        return;
    };
    let pairs = query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()));
    let request = HarvestRequest::from_pairs(pairs);
    let _ = request.validate();
});
