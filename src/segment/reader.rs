//! Opens an immutable on-disk segment for querying (spec §4.4, grounded
//! on `TpSegmentReader` / `tp_segment_open`).
//!
//! Mirrors the cheaply-cloneable `Segment(Arc<Inner>)` handle pattern: the
//! whole segment is parsed once at open time and held behind an `Arc` so
//! concurrent readers share one copy.

use super::dictionary::Dictionary;
use super::docmap::DocMap;
use super::header::SegmentHeader;
use super::page_index;
use super::posting_list::{PostingCursor, PostingList};
use super::writer::SegmentLocation;
use crate::error::Result;
use crate::page::{PageStore, DATA_PER_PAGE, PAGE_SIZE};
use crate::tid::Tid;
use std::sync::Arc;

struct Inner {
    header: SegmentHeader,
    dictionary: Dictionary,
    docmap: DocMap,
    logical: Vec<u8>,
}

/// A handle to one immutable on-disk segment. Cheap to clone; all
/// segment state is loaded once at [`Segment::open`].
#[derive(Clone)]
pub struct Segment(Arc<Inner>);

impl Segment {
    pub fn open(store: &dyn PageStore, location: SegmentLocation) -> Result<Self> {
        let page_map = page_index::read_page_index(store, location.page_index_root)?;

        let mut first = [0u8; PAGE_SIZE];
        store.read_page(page_map[0], &mut first)?;
        let header = SegmentHeader::decode_from(&mut &first[..])?;

        let mut logical = Vec::with_capacity(header.data_size as usize);
        for &page in &page_map {
            let mut buf = [0u8; PAGE_SIZE];
            store.read_page(page, &mut buf)?;
            logical.extend_from_slice(&buf);
        }
        logical.truncate(header.data_size as usize);

        let dict_bytes = &logical[header.dictionary_offset as usize..header.postings_offset as usize];
        let dictionary = Dictionary::decode_from(&mut &dict_bytes[..])?;
        let docmap_bytes = &logical[header.docmap_offset as usize..];
        let docmap = DocMap::decode_from(&mut &docmap_bytes[..])?;

        log::debug!(
            "opened segment: level={} docs={} terms={}",
            header.level,
            header.num_docs,
            header.num_terms
        );

        Ok(Self(Arc::new(Inner {
            header,
            dictionary,
            docmap,
            logical,
        })))
    }

    pub fn level(&self) -> u32 {
        self.0.header.level
    }

    pub fn num_docs(&self) -> u32 {
        self.0.header.num_docs
    }

    pub fn num_terms(&self) -> u32 {
        self.0.header.num_terms
    }

    pub fn total_tokens(&self) -> u64 {
        self.0.header.total_tokens
    }

    pub fn avg_doc_len(&self) -> f64 {
        if self.0.header.num_docs == 0 {
            0.0
        } else {
            self.0.header.total_tokens as f64 / self.0.header.num_docs as f64
        }
    }

    pub fn doc_freq(&self, term: &str) -> u32 {
        self.0.dictionary.get(term).map(|e| e.doc_freq).unwrap_or(0)
    }

    pub fn tid(&self, doc_id: u32) -> Option<Tid> {
        self.0.docmap.tid(doc_id)
    }

    pub fn doc_id_for_tid(&self, tid: Tid) -> Option<u32> {
        self.0.docmap.doc_id_for_tid(tid)
    }

    pub fn raw_doc_length(&self, doc_id: u32) -> Option<u32> {
        self.0.docmap.raw_length(doc_id)
    }

    /// Decodes and returns the full posting list for `term`, or `None` if
    /// the term does not appear in this segment.
    pub fn posting_list(&self, term: &str) -> Result<Option<PostingList>> {
        let Some(entry) = self.0.dictionary.get(term) else {
            return Ok(None);
        };
        let start = self.0.header.postings_offset as usize + entry.posting_offset as usize;
        let mut slice = &self.0.logical[start..];
        Ok(Some(PostingList::decode_from(&mut slice)?))
    }

    /// Terms present in this segment, in sorted order.
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.0.dictionary.iter().map(|(t, _)| t.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockPosting;
    use crate::page::MemPageStore;
    use crate::segment::writer::{write_segment, SegmentBuildInput};

    fn posting(doc_id: u32, freq: u16, fieldnorm: u8) -> BlockPosting {
        BlockPosting {
            doc_id,
            freq,
            fieldnorm,
        }
    }

    fn build_sample() -> (MemPageStore, SegmentLocation) {
        let mut store = MemPageStore::default();
        let terms = vec![
            ("apple".to_string(), vec![posting(0, 1, 5), posting(2, 2, 8)]),
            ("banana".to_string(), vec![posting(1, 3, 6)]),
        ];
        let docs = vec![(Tid::new(1, 0), 5), (Tid::new(2, 0), 8), (Tid::new(3, 0), 6)];
        let loc = write_segment(
            &mut store,
            SegmentBuildInput {
                level: 0,
                created_at_unix_ms: 42,
                terms,
                docs,
            },
        )
        .unwrap();
        (store, loc)
    }

    #[test]
    fn open_and_read_back_stats() {
        let (store, loc) = build_sample();
        let seg = Segment::open(&store, loc).unwrap();
        assert_eq!(seg.num_docs(), 3);
        assert_eq!(seg.num_terms(), 2);
        assert_eq!(seg.doc_freq("apple"), 2);
        assert_eq!(seg.doc_freq("missing"), 0);
        assert_eq!(seg.tid(0), Some(Tid::new(1, 0)));
    }

    #[test]
    fn posting_list_decodes() {
        let (store, loc) = build_sample();
        let seg = Segment::open(&store, loc).unwrap();
        let list = seg.posting_list("apple").unwrap().unwrap();
        assert_eq!(list.doc_freq(), 2);
        let mut cursor = PostingCursor::new(&list);
        assert_eq!(cursor.next().unwrap().unwrap().doc_id, 0);
        assert_eq!(cursor.next().unwrap().unwrap().doc_id, 2);
        assert_eq!(cursor.next().unwrap(), None);
    }

    #[test]
    fn unknown_term_returns_none() {
        let (store, loc) = build_sample();
        let seg = Segment::open(&store, loc).unwrap();
        assert!(seg.posting_list("nope").unwrap().is_none());
    }
}
