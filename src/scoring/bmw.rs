//! Block-Max WAND top-K scoring (spec §4.6, grounded on `bmw.c`'s
//! heap-driven query loop and the block-max-score pruning from
//! `fts_rust_core::profiles::bmw_simd`).
//!
//! For a single collection (one segment, or the memtable), this finds the
//! documents with the highest summed BM25 score across a set of query
//! terms, skipping whole blocks whose upper bound can't beat the current
//! top-K threshold.

use super::bm25::{self, max_term_score, term_score};
use super::heap::TopKHeap;
use crate::config::Bm25Params;
use crate::error::Result;
use crate::fieldnorm;
use crate::memtable::Memtable;
use crate::segment::{PostingCursor, PostingList, Segment};
use crate::tid::Tid;

/// A query term together with its corpus-wide IDF (precomputed by the
/// caller from global document-frequency statistics).
#[derive(Debug, Clone, Copy)]
pub struct ScoredTerm<'a> {
    pub term: &'a str,
    pub idf: f32,
}

struct TermCursor<'a> {
    idf: f32,
    cursor: PostingCursor<'a>,
    current: Option<crate::block::BlockPosting>,
}

impl<'a> TermCursor<'a> {
    fn new(list: &'a PostingList, idf: f32) -> Result<Self> {
        let mut cursor = PostingCursor::new(list);
        let current = cursor.next()?;
        Ok(Self {
            idf,
            cursor,
            current,
        })
    }

    fn current_doc_id(&self) -> Option<u32> {
        self.current.map(|p| p.doc_id)
    }

    /// Upper bound on this term's contribution for any document in the
    /// cursor's current block.
    fn block_upper_bound(&self, params: Bm25Params, avg_doc_len: f64) -> f32 {
        let Some(max_freq) = self.cursor.current_block_max_freq() else {
            return 0.0;
        };
        let Some(min_fieldnorm) = self.cursor.current_block_max_fieldnorm() else {
            return 0.0;
        };
        let min_len_norm = bm25::len_norm(params, fieldnorm::decode(min_fieldnorm), avg_doc_len);
        max_term_score(params, self.idf, max_freq as u32, min_len_norm)
    }

    /// Seeks to the first posting with `doc_id >= target`.
    fn advance_to(&mut self, target: u32) -> Result<()> {
        if self.current_doc_id().map(|d| d >= target).unwrap_or(false) {
            return Ok(());
        }
        self.current = self.cursor.seek(target)?;
        Ok(())
    }

    fn advance_past(&mut self, doc_id: u32) -> Result<()> {
        self.current = self.cursor.seek(doc_id + 1)?;
        Ok(())
    }
}

/// Runs block-max WAND over one segment for the given query terms, adding
/// matches to `heap`. Terms absent from the segment are skipped.
pub fn score_segment_topk(
    segment: &Segment,
    lists: &[(String, PostingList)],
    query: &[ScoredTerm<'_>],
    params: Bm25Params,
    avg_doc_len: f64,
    heap: &mut TopKHeap,
) -> Result<()> {
    let mut cursors: Vec<TermCursor<'_>> = Vec::new();
    for q in query {
        if let Some((_, list)) = lists.iter().find(|(t, _)| t == q.term) {
            let tc = TermCursor::new(list, q.idf)?;
            if tc.current.is_some() {
                cursors.push(tc);
            }
        }
    }
    if cursors.is_empty() {
        return Ok(());
    }

    loop {
        cursors.sort_by_key(|c| c.current_doc_id().unwrap_or(u32::MAX));
        if cursors[0].current_doc_id().is_none() {
            break;
        }

        let threshold = heap.threshold().unwrap_or(0.0);
        let mut cumulative = 0.0f32;
        let mut pivot_idx = None;
        for (i, c) in cursors.iter().enumerate() {
            if c.current_doc_id().is_none() {
                break;
            }
            cumulative += c.block_upper_bound(params, avg_doc_len);
            if cumulative > threshold {
                pivot_idx = Some(i);
                break;
            }
        }
        let Some(pivot_idx) = pivot_idx else {
            break; // no document can beat the current threshold
        };
        let pivot_doc = cursors[pivot_idx].current_doc_id().unwrap();

        if cursors[0].current_doc_id() == Some(pivot_doc) {
            let mut total = 0.0f32;
            for c in cursors.iter_mut() {
                if c.current_doc_id() == Some(pivot_doc) {
                    let posting = c.current.unwrap();
                    let len_norm =
                        bm25::len_norm(params, fieldnorm::decode(posting.fieldnorm), avg_doc_len);
                    total += term_score(params, c.idf, posting.freq as u32, len_norm);
                }
            }
            if let Some(tid) = segment.tid(pivot_doc) {
                heap.push(tid, total);
            }
            for c in cursors.iter_mut() {
                if c.current_doc_id() == Some(pivot_doc) {
                    c.advance_past(pivot_doc)?;
                }
            }
        } else {
            for c in cursors.iter_mut().take(pivot_idx + 1) {
                c.advance_to(pivot_doc)?;
            }
        }

        cursors.retain(|c| c.current_doc_id().is_some());
        if cursors.is_empty() {
            break;
        }
    }

    Ok(())
}

/// Exhaustively scores every document in the memtable against the query
/// terms. The memtable is small and unindexed by block, so there's no
/// pruning benefit to WAND here.
pub fn score_memtable_topk(
    mt: &Memtable,
    query: &[ScoredTerm<'_>],
    params: Bm25Params,
    avg_doc_len: f64,
    heap: &mut TopKHeap,
) {
    use std::collections::HashMap;
    let mut totals: HashMap<Tid, f32> = HashMap::new();
    for q in query {
        for (tid, freq, len) in super::source::memtable_postings(mt, q.term) {
            let len_norm = bm25::len_norm(params, len, avg_doc_len);
            let score = term_score(params, q.idf, freq as u32, len_norm);
            *totals.entry(tid).or_insert(0.0) += score;
        }
    }
    for (tid, score) in totals {
        heap.push(tid, score);
    }
}
