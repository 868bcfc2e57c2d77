//! N-way merge of segments into a single larger segment at compaction
//! time (spec §4.9, grounded on `segment/merge.c`).
//!
//! Each input segment contributes its terms, postings, and docmap; the
//! merge re-assigns doc IDs globally by sorting every contributing TID
//! ascending (the same invariant a single segment build uses), then
//! concatenates and re-sorts each term's postings against the new doc IDs.

use crate::block::BlockPosting;
use crate::error::{Error, Result};
use crate::fieldnorm;
use crate::page::PageStore;
use crate::segment::{write_segment, PostingCursor, Segment, SegmentBuildInput, SegmentLocation};
use crate::tid::Tid;
use std::collections::BTreeMap;

/// Merges `inputs` (read through `store`) into one new segment at
/// `target_level`, written back through the same store.
///
/// Input segments must not share TIDs; a caller merging a segment that
/// was produced after a row was re-indexed (delete + re-insert landing in
/// a newer segment) should exclude the stale copy before calling this.
pub fn merge_segments(
    store: &mut dyn PageStore,
    inputs: &[Segment],
    target_level: u32,
    created_at_unix_ms: u64,
) -> Result<SegmentLocation> {
    if inputs.is_empty() {
        return Err(Error::misuse("merge_segments called with no inputs"));
    }

    let mut docs: Vec<(Tid, u32)> = Vec::new();
    for seg in inputs {
        for doc_id in 0..seg.num_docs() {
            let tid = seg
                .tid(doc_id)
                .ok_or_else(|| Error::corruption("segment docmap missing an entry within its own range"))?;
            let len = seg.raw_doc_length(doc_id).unwrap_or(0);
            docs.push((tid, len));
        }
    }
    let mut sorted_tids: Vec<Tid> = docs.iter().map(|(t, _)| *t).collect();
    sorted_tids.sort();
    if sorted_tids.windows(2).any(|w| w[0] == w[1]) {
        return Err(Error::misuse(
            "merge_segments inputs share at least one TID; exclude stale copies first",
        ));
    }
    let new_doc_id_of = |tid: Tid| -> u32 { sorted_tids.binary_search(&tid).unwrap() as u32 };

    // term -> postings accumulated across all input segments, remapped to
    // the merged segment's doc IDs.
    let mut merged_terms: BTreeMap<String, Vec<BlockPosting>> = BTreeMap::new();
    for seg in inputs {
        for term in seg.terms() {
            let Some(list) = seg.posting_list(term)? else {
                continue;
            };
            let mut cursor = PostingCursor::new(&list);
            let entry = merged_terms.entry(term.to_string()).or_default();
            while let Some(p) = cursor.next()? {
                let tid = seg
                    .tid(p.doc_id)
                    .ok_or_else(|| Error::corruption("posting references unknown doc id"))?;
                let raw_len = seg.raw_doc_length(p.doc_id).unwrap_or(fieldnorm::decode(p.fieldnorm));
                entry.push(BlockPosting {
                    doc_id: new_doc_id_of(tid),
                    freq: p.freq,
                    fieldnorm: fieldnorm::encode(raw_len),
                });
            }
        }
    }
    for postings in merged_terms.values_mut() {
        postings.sort_by_key(|p| p.doc_id);
    }

    log::debug!(
        "merging {} segments ({} docs, {} terms) into level {}",
        inputs.len(),
        docs.len(),
        merged_terms.len(),
        target_level
    );

    write_segment(
        store,
        SegmentBuildInput {
            level: target_level,
            created_at_unix_ms,
            terms: merged_terms.into_iter().collect(),
            docs,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::MemPageStore;

    fn posting(doc_id: u32, freq: u16, fieldnorm: u8) -> BlockPosting {
        BlockPosting {
            doc_id,
            freq,
            fieldnorm,
        }
    }

    fn build(store: &mut MemPageStore, level: u32, terms: Vec<(&str, Vec<BlockPosting>)>, docs: Vec<(Tid, u32)>) -> Segment {
        let loc = write_segment(
            store,
            SegmentBuildInput {
                level,
                created_at_unix_ms: 0,
                terms: terms.into_iter().map(|(t, p)| (t.to_string(), p)).collect(),
                docs,
            },
        )
        .unwrap();
        Segment::open(store, loc).unwrap()
    }

    #[test]
    fn merges_two_disjoint_segments() {
        let mut store = MemPageStore::default();
        let seg_a = build(
            &mut store,
            0,
            vec![("apple", vec![posting(0, 1, 5)])],
            vec![(Tid::new(1, 0), 5)],
        );
        let seg_b = build(
            &mut store,
            0,
            vec![("banana", vec![posting(0, 2, 9)])],
            vec![(Tid::new(2, 0), 9)],
        );

        let loc = merge_segments(&mut store, &[seg_a, seg_b], 1, 0).unwrap();
        let merged = Segment::open(&store, loc).unwrap();
        assert_eq!(merged.num_docs(), 2);
        assert_eq!(merged.level(), 1);
        assert_eq!(merged.doc_freq("apple"), 1);
        assert_eq!(merged.doc_freq("banana"), 1);
    }

    #[test]
    fn rejects_overlapping_tids() {
        let mut store = MemPageStore::default();
        let seg_a = build(&mut store, 0, vec![("x", vec![posting(0, 1, 1)])], vec![(Tid::new(1, 0), 1)]);
        let seg_b = build(&mut store, 0, vec![("y", vec![posting(0, 1, 1)])], vec![(Tid::new(1, 0), 1)]);
        let err = merge_segments(&mut store, &[seg_a, seg_b], 1, 0).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Misuse);
    }
}
