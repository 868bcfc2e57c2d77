//! Bulk index construction (spec §4.5/§5, grounded on `build_parallel.c`'s
//! leader/worker split): tokenization is the expensive, parallelizable
//! step, so workers tokenize disjoint chunks of documents into private
//! memtables that the leader then merges and spills once, through a
//! single writer.

use crate::error::Result;
use crate::memtable::Memtable;
use crate::page::PageStore;
use crate::segment::{write_segment, SegmentLocation};
use crate::tid::Tid;
use crate::tokenizer::Tokenizer;
use rayon::prelude::*;

/// Tokenizes and indexes `docs` into a single memtable, one document at a
/// time. Used for small inputs and as the reference implementation
/// `build_parallel` is checked against.
pub fn build_serial(docs: &[(Tid, String)], tokenizer: &dyn Tokenizer) -> Memtable {
    let mut memtable = Memtable::new();
    for (tid, text) in docs {
        let (freqs, length) = tokenizer.tokenize(text);
        memtable.insert_doc(*tid, freqs, length);
    }
    memtable
}

/// Tokenizes `docs` across up to `num_workers` threads, each building a
/// private memtable over its chunk, then merges the chunk memtables into
/// one. `tokenizer` must be safe to share across threads.
pub fn build_parallel(docs: &[(Tid, String)], tokenizer: &(dyn Tokenizer + Sync), num_workers: usize) -> Memtable {
    let num_workers = num_workers.max(1);
    if docs.len() < num_workers * 2 {
        return build_serial(docs, tokenizer);
    }

    let chunk_size = docs.len().div_ceil(num_workers);
    let chunk_memtables: Vec<Memtable> = docs
        .par_chunks(chunk_size)
        .map(|chunk| build_serial(chunk, tokenizer))
        .collect();

    log::debug!(
        "parallel build: {} documents across {} worker memtables",
        docs.len(),
        chunk_memtables.len()
    );

    merge_memtables(chunk_memtables)
}

fn merge_memtables(memtables: Vec<Memtable>) -> Memtable {
    let mut merged = Memtable::new();
    for mt in memtables {
        for (doc_id, tid, len) in MemtableDocs::new(&mt) {
            let _ = doc_id;
            let freqs: Vec<(String, u16)> = mt
                .terms()
                .filter_map(|term| mt.term_freq(term, tid).map(|freq| (term.to_string(), freq)))
                .collect();
            merged.insert_doc(tid, freqs, len);
        }
    }
    merged
}

/// Iterates a memtable's documents by TID, used only by the in-process
/// merge step above (the memtable otherwise exposes lookups by TID, not
/// enumeration, since queries never need to scan it directly).
struct MemtableDocs<'a> {
    tids: std::vec::IntoIter<Tid>,
    mt: &'a Memtable,
}

impl<'a> MemtableDocs<'a> {
    fn new(mt: &'a Memtable) -> Self {
        // Re-derive the TID set from term postings; a memtable with terms
        // but no matching doc_length entries would mean a logic error
        // elsewhere, so this stays exhaustive over what's actually there.
        let mut tids: Vec<Tid> = mt
            .terms()
            .flat_map(|t| mt.postings_for_term(t).iter().map(|p| p.tid))
            .collect();
        tids.sort();
        tids.dedup();
        Self {
            tids: tids.into_iter(),
            mt,
        }
    }
}

impl<'a> Iterator for MemtableDocs<'a> {
    type Item = (u32, Tid, u32);

    fn next(&mut self) -> Option<Self::Item> {
        for tid in self.tids.by_ref() {
            if let Some(len) = self.mt.doc_length(tid) {
                return Some((0, tid, len));
            }
        }
        None
    }
}

/// Builds and writes a full segment from scratch: tokenize, accumulate,
/// spill. The common path for an initial bulk index build.
pub fn build_and_write_segment(
    store: &mut dyn PageStore,
    docs: &[(Tid, String)],
    tokenizer: &(dyn Tokenizer + Sync),
    num_workers: usize,
    level: u32,
    created_at_unix_ms: u64,
) -> Result<SegmentLocation> {
    let memtable = build_parallel(docs, tokenizer, num_workers);
    write_segment(store, memtable.build_input(level, created_at_unix_ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::MemPageStore;
    use crate::tokenizer::WhitespaceTokenizer;

    fn sample_docs(n: u32) -> Vec<(Tid, String)> {
        (0..n)
            .map(|i| (Tid::new(i + 1, 0), format!("term{} shared", i % 7)))
            .collect()
    }

    #[test]
    fn parallel_build_matches_serial_build() {
        let docs = sample_docs(50);
        let serial = build_serial(&docs, &WhitespaceTokenizer);
        let parallel = build_parallel(&docs, &WhitespaceTokenizer, 4);
        assert_eq!(serial.doc_count(), parallel.doc_count());
        assert_eq!(serial.total_tokens(), parallel.total_tokens());
        assert_eq!(serial.doc_freq("shared"), parallel.doc_freq("shared"));
    }

    #[test]
    fn small_input_falls_back_to_serial() {
        let docs = sample_docs(2);
        let parallel = build_parallel(&docs, &WhitespaceTokenizer, 8);
        assert_eq!(parallel.doc_count(), 2);
    }

    #[test]
    fn build_and_write_produces_queryable_segment() {
        let docs = sample_docs(20);
        let mut store = MemPageStore::default();
        let loc = build_and_write_segment(&mut store, &docs, &WhitespaceTokenizer, 2, 0, 0).unwrap();
        let segment = crate::segment::Segment::open(&store, loc).unwrap();
        assert_eq!(segment.num_docs(), 20);
        assert_eq!(segment.doc_freq("shared"), 20);
    }
}
