//! In-memory inverted index accumulating inserts before a spill to a
//! segment (spec §4.5, grounded on `TpPostingList`/`TpDocLengthEntry`).
//!
//! Unlike the host format this was distilled from, there is no shared
//! memory segment or dshash here: a memtable belongs to exactly one
//! writer at a time, guarded by the index's `parking_lot::RwLock`.

use crate::block::BlockPosting;
use crate::fieldnorm;
use crate::segment::SegmentBuildInput;
use crate::tid::Tid;
use std::collections::BTreeMap;

/// One occurrence of a term in a document, before fieldnorm assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawPosting {
    pub tid: Tid,
    pub freq: u16,
}

/// Accumulates postings and per-document lengths until spilled.
#[derive(Debug, Default)]
pub struct Memtable {
    postings: BTreeMap<String, Vec<RawPosting>>,
    doc_lengths: BTreeMap<Tid, u32>,
}

impl Memtable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes one document: `term_freqs` is the document's term -> count
    /// map (already tokenized), `doc_length` is the total token count.
    pub fn insert_doc(
        &mut self,
        tid: Tid,
        term_freqs: impl IntoIterator<Item = (String, u16)>,
        doc_length: u32,
    ) {
        for (term, freq) in term_freqs {
            self.postings
                .entry(term)
                .or_default()
                .push(RawPosting { tid, freq });
        }
        self.doc_lengths.insert(tid, doc_length);
    }

    /// Removes a document's postings and length entry, used by bulk
    /// delete (spec §4.9) before the removal is reflected in future
    /// segments.
    pub fn remove_doc(&mut self, tid: Tid) {
        self.doc_lengths.remove(&tid);
        for postings in self.postings.values_mut() {
            postings.retain(|p| p.tid != tid);
        }
    }

    pub fn doc_count(&self) -> usize {
        self.doc_lengths.len()
    }

    pub fn term_count(&self) -> usize {
        self.postings.len()
    }

    pub fn total_tokens(&self) -> u64 {
        self.doc_lengths.values().map(|&l| l as u64).sum()
    }

    /// A cheap proxy for memory pressure, used to decide when to spill:
    /// roughly the bytes a segment build from this memtable would need to
    /// hold in its intermediate buffers.
    pub fn estimated_bytes(&self) -> usize {
        let posting_bytes: usize = self
            .postings
            .iter()
            .map(|(term, postings)| term.len() + postings.len() * std::mem::size_of::<RawPosting>())
            .sum();
        posting_bytes + self.doc_lengths.len() * (Tid::ENCODED_LEN + 4)
    }

    pub fn doc_length(&self, tid: Tid) -> Option<u32> {
        self.doc_lengths.get(&tid).copied()
    }

    /// Term frequency for `term` in document `tid`, used by scoring to
    /// combine memtable and segment contributions without spilling first.
    pub fn term_freq(&self, term: &str, tid: Tid) -> Option<u16> {
        self.postings
            .get(term)
            .and_then(|postings| postings.iter().find(|p| p.tid == tid).map(|p| p.freq))
    }

    pub fn doc_freq(&self, term: &str) -> u32 {
        self.postings.get(term).map(|p| p.len() as u32).unwrap_or(0)
    }

    /// Every `(tid, freq)` occurrence recorded for `term`, in insertion
    /// order. Used by scoring to combine the memtable's unindexed
    /// postings with segment results.
    pub fn postings_for_term(&self, term: &str) -> &[RawPosting] {
        self.postings.get(term).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.postings.keys().map(|s| s.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.doc_lengths.is_empty()
    }

    /// Converts the accumulated postings into the shape [`write_segment`]
    /// expects: doc IDs assigned by sorting TIDs ascending, fieldnorms
    /// computed from each document's raw length.
    ///
    /// [`write_segment`]: crate::segment::write_segment
    pub fn build_input(&self, level: u32, created_at_unix_ms: u64) -> SegmentBuildInput {
        let docs: Vec<(Tid, u32)> = self.doc_lengths.iter().map(|(&tid, &len)| (tid, len)).collect();
        let mut sorted_tids: Vec<Tid> = docs.iter().map(|(t, _)| *t).collect();
        sorted_tids.sort();
        let doc_id_of = |tid: Tid| -> u32 {
            sorted_tids.binary_search(&tid).expect("tid present in docmap") as u32
        };

        let mut terms: Vec<(String, Vec<BlockPosting>)> = Vec::with_capacity(self.postings.len());
        for (term, raw) in &self.postings {
            let mut blocks: Vec<BlockPosting> = raw
                .iter()
                .filter_map(|p| {
                    self.doc_lengths.get(&p.tid).map(|&len| BlockPosting {
                        doc_id: doc_id_of(p.tid),
                        freq: p.freq,
                        fieldnorm: fieldnorm::encode(len),
                    })
                })
                .collect();
            blocks.sort_by_key(|p| p.doc_id);
            terms.push((term.clone(), blocks));
        }

        SegmentBuildInput {
            level,
            created_at_unix_ms,
            terms,
            docs,
        }
    }
}
