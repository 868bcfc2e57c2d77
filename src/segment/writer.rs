//! Assembles an in-memory set of postings, terms, and documents into an
//! immutable on-disk segment (spec §4.4, grounded on `tp_write_segment`).

use super::dictionary::{DictEntry, Dictionary};
use super::docmap::DocMap;
use super::header::{SegmentHeader, SEGMENT_MAGIC, SEGMENT_VERSION};
use super::page_index;
use super::posting_list::PostingList;
use crate::block::BlockPosting;
use crate::error::Result;
use crate::page::{PageStore, DATA_PER_PAGE, PAGE_SIZE};
use crate::tid::Tid;

/// Identifies a segment's location among the index's pages: the root of
/// its page-index chain. Everything else (header, dictionary, postings,
/// docmap) is reached by walking that chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentLocation {
    pub page_index_root: u32,
}

/// Input to [`write_segment`]: one posting list per term (postings sorted
/// ascending by doc ID) and the full doc-ID assignment.
pub struct SegmentBuildInput {
    pub level: u32,
    pub created_at_unix_ms: u64,
    pub terms: Vec<(String, Vec<BlockPosting>)>,
    pub docs: Vec<(Tid, u32)>,
}

pub fn write_segment(store: &mut dyn PageStore, input: SegmentBuildInput) -> Result<SegmentLocation> {
    let mut postings_buf = Vec::new();
    let mut dict_entries = Vec::with_capacity(input.terms.len());
    for (term, postings) in &input.terms {
        let list = PostingList::build(postings);
        let offset = postings_buf.len() as u32;
        list.encode_into(&mut postings_buf)?;
        dict_entries.push((
            term.clone(),
            DictEntry {
                posting_offset: offset,
                posting_count: postings.len() as u32,
                doc_freq: list.doc_freq(),
            },
        ));
    }
    let dictionary = Dictionary::from_entries(dict_entries);
    let mut dict_buf = Vec::new();
    dictionary.encode_into(&mut dict_buf)?;

    let docmap = DocMap::build(input.docs);
    let mut docmap_buf = Vec::new();
    docmap.encode_into(&mut docmap_buf)?;

    let total_tokens: u64 = docmap.iter().map(|(_, _, len)| len as u64).sum();
    let num_docs = docmap.len() as u32;
    let num_terms = dictionary.len() as u32;

    let header_len = SegmentHeader::ENCODED_LEN as u32;
    let dictionary_offset = header_len;
    let postings_offset = dictionary_offset + dict_buf.len() as u32;
    let docmap_offset = postings_offset + postings_buf.len() as u32;
    let data_size = docmap_offset + docmap_buf.len() as u32;

    let header = SegmentHeader {
        magic: SEGMENT_MAGIC,
        version: SEGMENT_VERSION,
        created_at_unix_ms: input.created_at_unix_ms,
        level: input.level,
        num_docs,
        num_terms,
        total_tokens,
        dictionary_offset,
        postings_offset,
        docmap_offset,
        data_size,
    };

    let mut logical = Vec::with_capacity(data_size as usize);
    header.encode_into(&mut logical)?;
    logical.extend_from_slice(&dict_buf);
    logical.extend_from_slice(&postings_buf);
    logical.extend_from_slice(&docmap_buf);
    debug_assert_eq!(logical.len(), data_size as usize);

    let mut page_map = Vec::new();
    for chunk in logical.chunks(DATA_PER_PAGE) {
        let page = store.allocate()?;
        let mut buf = [0u8; PAGE_SIZE];
        buf[..chunk.len()].copy_from_slice(chunk);
        store.write_page(page, &buf)?;
        page_map.push(page);
    }

    log::debug!(
        "wrote segment: level={} docs={} terms={} pages={} bytes={}",
        header.level,
        num_docs,
        num_terms,
        page_map.len(),
        data_size
    );

    let page_index_root = page_index::write_page_index(store, &page_map)?;
    Ok(SegmentLocation { page_index_root })
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

    #[test]
    fn writes_without_error_and_spans_pages() {
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
                created_at_unix_ms: 0,
                terms,
                docs,
            },
        )
        .unwrap();
        assert!(store.page_count() > 0);
        let page_map = page_index::read_page_index(&store, loc.page_index_root).unwrap();
        assert!(!page_map.is_empty());
    }
}
