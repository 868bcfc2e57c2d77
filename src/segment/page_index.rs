//! Page-index chain: a segment's logical byte stream lives on many
//! physical pages allocated in no particular order, so each segment keeps
//! a chain of pages recording that order (spec §4.3, grounded on
//! `TpPageIndexSpecial`).

use crate::error::Result;
use crate::page::{PageStore, DATA_PER_PAGE, INVALID_PAGE, PAGE_SIZE};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

/// Header bytes reserved on each page-index page: `next_page` + `count`.
const INDEX_PAGE_HEADER: usize = 8;

/// How many physical-page-number entries fit on one page-index page.
const ENTRIES_PER_INDEX_PAGE: usize = (DATA_PER_PAGE - INDEX_PAGE_HEADER) / 4;

/// Writes `page_map` (the ordered list of physical pages holding a
/// segment's logical data) out as a chain of page-index pages, returning
/// the first page of the chain.
pub fn write_page_index(store: &mut dyn PageStore, page_map: &[u32]) -> Result<u32> {
    assert!(!page_map.is_empty());

    let chunks: Vec<&[u32]> = page_map.chunks(ENTRIES_PER_INDEX_PAGE).collect();
    let mut page_numbers = Vec::with_capacity(chunks.len());
    for _ in &chunks {
        page_numbers.push(store.allocate()?);
    }

    for (i, chunk) in chunks.iter().enumerate() {
        let next = page_numbers.get(i + 1).copied().unwrap_or(INVALID_PAGE);
        let mut buf = [0u8; PAGE_SIZE];
        {
            let mut w = &mut buf[..];
            w.write_u32::<LittleEndian>(next).unwrap();
            w.write_u32::<LittleEndian>(chunk.len() as u32).unwrap();
            for &entry in *chunk {
                w.write_u32::<LittleEndian>(entry).unwrap();
            }
        }
        store.write_page(page_numbers[i], &buf)?;
    }

    Ok(page_numbers[0])
}

/// Reads back a page-index chain starting at `first_page` into the
/// ordered list of physical page numbers it describes.
pub fn read_page_index(store: &dyn PageStore, first_page: u32) -> Result<Vec<u32>> {
    let mut page_map = Vec::new();
    let mut current = first_page;
    while current != INVALID_PAGE {
        let mut buf = [0u8; PAGE_SIZE];
        store.read_page(current, &mut buf)?;
        let mut r = &buf[..];
        let next = r.read_u32::<LittleEndian>()?;
        let count = r.read_u32::<LittleEndian>()? as usize;
        for _ in 0..count {
            page_map.push(r.read_u32::<LittleEndian>()?);
        }
        current = next;
    }
    Ok(page_map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::MemPageStore;

    #[test]
    fn roundtrip_small_map() {
        let mut store = MemPageStore::default();
        let data_page_a = store.allocate().unwrap();
        let data_page_b = store.allocate().unwrap();
        let map = vec![data_page_a, data_page_b];
        let first = write_page_index(&mut store, &map).unwrap();
        let back = read_page_index(&store, first).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn roundtrip_spans_multiple_index_pages() {
        let mut store = MemPageStore::default();
        let mut map = Vec::new();
        for _ in 0..(ENTRIES_PER_INDEX_PAGE * 3 + 5) {
            map.push(store.allocate().unwrap());
        }
        let first = write_page_index(&mut store, &map).unwrap();
        let back = read_page_index(&store, first).unwrap();
        assert_eq!(back, map);
    }
}
