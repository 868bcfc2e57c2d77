#![no_main]

use libfuzzer_sys::fuzz_target;
use tapir_search::fieldnorm::{decode, encode};

fuzz_target!(|len: u32| {
    let code = encode(len);
    let decoded = decode(code);
    assert!(decoded <= len);
    assert_eq!(encode(decoded), code);
});
