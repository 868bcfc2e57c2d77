#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tapir_search::block::{compress, decompress, BlockPosting, BLOCK_SIZE};

#[derive(Arbitrary, Debug)]
struct RawPosting {
    doc_delta: u16,
    freq: u16,
    fieldnorm: u8,
}

fuzz_target!(|raw: Vec<RawPosting>| {
    let mut postings = Vec::new();
    let mut doc_id = 0u32;
    for r in raw.into_iter().take(BLOCK_SIZE) {
        doc_id += r.doc_delta as u32;
        postings.push(BlockPosting {
            doc_id,
            freq: r.freq,
            fieldnorm: r.fieldnorm,
        });
    }

    let compressed = compress(&postings);
    let decoded = decompress(&compressed, postings.len()).expect("compress output must decompress");
    assert_eq!(postings, decoded);
});
