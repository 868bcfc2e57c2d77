//! Dispatches a term's postings to either the active memtable or a
//! segment's decoded posting list, so scoring code can treat both
//! uniformly (spec §9).

use crate::memtable::Memtable;
use crate::segment::Segment;
use crate::tid::Tid;

/// Where a term's postings for one collection (the memtable, or a single
/// segment) come from.
pub enum PostingSource<'a> {
    Memtable(&'a Memtable),
    Segment(&'a Segment),
}

impl<'a> PostingSource<'a> {
    pub fn doc_freq(&self, term: &str) -> u32 {
        match self {
            PostingSource::Memtable(mt) => mt.doc_freq(term),
            PostingSource::Segment(seg) => seg.doc_freq(term),
        }
    }

    pub fn collection_doc_count(&self) -> u64 {
        match self {
            PostingSource::Memtable(mt) => mt.doc_count() as u64,
            PostingSource::Segment(seg) => seg.num_docs() as u64,
        }
    }

    pub fn avg_doc_len(&self) -> f64 {
        match self {
            PostingSource::Memtable(mt) => {
                if mt.doc_count() == 0 {
                    0.0
                } else {
                    mt.total_tokens() as f64 / mt.doc_count() as f64
                }
            }
            PostingSource::Segment(seg) => seg.avg_doc_len(),
        }
    }
}

/// Every `(tid, freq, raw_doc_length)` occurrence of `term` in the
/// memtable. The memtable is unindexed by block, so this is always an
/// exhaustive scan rather than a block-max skip.
pub fn memtable_postings<'a>(mt: &'a Memtable, term: &'a str) -> impl Iterator<Item = (Tid, u16, u32)> + 'a {
    mt.postings_for_term(term)
        .iter()
        .filter_map(move |p| mt.doc_length(p.tid).map(|len| (p.tid, p.freq, len)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tid::Tid;

    #[test]
    fn memtable_postings_pairs_freq_with_length() {
        let mut mt = Memtable::new();
        mt.insert_doc(Tid::new(1, 0), [("cat".to_string(), 3)], 10);
        mt.insert_doc(Tid::new(2, 0), [("cat".to_string(), 1)], 4);
        let collected: Vec<_> = memtable_postings(&mt, "cat").collect();
        assert_eq!(collected.len(), 2);
        assert!(collected.contains(&(Tid::new(1, 0), 3, 10)));
        assert!(collected.contains(&(Tid::new(2, 0), 1, 4)));
    }
}
