//! TID-recovery log: a durable chain of pages recording every TID
//! inserted since the last checkpoint, so a crash can be recovered from
//! by retokenizing those rows rather than replaying a full WAL (spec
//! §4.7, grounded on `TpDocidPageHeader` / `tp_add_docid_to_pages` /
//! `tp_recover_from_docid_pages`).
//!
//! This is deliberately not bounded: nothing in this crate triggers an
//! external checkpoint that would truncate the chain, so callers who care
//! about its size should watch [`RecoveryLog::tid_count`] and checkpoint
//! (by calling [`RecoveryLog::reset`] after a successful spill) on their
//! own schedule.

use crate::error::Result;
use crate::heap_reader::HeapReader;
use crate::memtable::Memtable;
use crate::page::{PageStore, DATA_PER_PAGE, INVALID_PAGE, PAGE_SIZE};
use crate::tid::Tid;
use crate::tokenizer::Tokenizer;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

/// Identifies a recovery-log page as belonging to this format.
pub const RECOVERY_PAGE_MAGIC: u32 = 0x5450_4449; // "TPDI"

const PAGE_HEADER: usize = 4 + 4 + 4; // magic + count + next_page
const ENTRIES_PER_PAGE: usize = (DATA_PER_PAGE - PAGE_HEADER) / Tid::ENCODED_LEN;

/// An append-only chain of TIDs recorded as they're inserted. Held by the
/// index alongside the memtable; truncated (logically) once its TIDs are
/// durably reflected in a spilled segment.
#[derive(Debug, Default)]
pub struct RecoveryLog {
    head_page: Option<u32>,
    tail_page: Option<u32>,
    tail_count: usize,
    tids: Vec<Tid>,
}

impl RecoveryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tid_count(&self) -> usize {
        self.tids.len()
    }

    /// Appends a TID to the in-memory log and its backing page chain.
    pub fn append(&mut self, store: &mut dyn PageStore, tid: Tid) -> Result<()> {
        self.tids.push(tid);

        if self.tail_page.is_none() || self.tail_count >= ENTRIES_PER_PAGE {
            let page = store.allocate()?;
            if let Some(old_tail) = self.tail_page {
                Self::link_next(store, old_tail, page)?;
            } else {
                self.head_page = Some(page);
            }
            Self::init_page(store, page)?;
            self.tail_page = Some(page);
            self.tail_count = 0;
        }

        let page = self.tail_page.unwrap();
        Self::append_to_page(store, page, self.tail_count, tid)?;
        self.tail_count += 1;
        Ok(())
    }

    /// Drops all recorded TIDs, for use right after their documents are
    /// durably present in a spilled segment. Does not reclaim the
    /// already-written pages; a future compaction pass may do so.
    pub fn reset(&mut self) {
        self.head_page = None;
        self.tail_page = None;
        self.tail_count = 0;
        self.tids.clear();
    }

    pub fn head_page(&self) -> Option<u32> {
        self.head_page
    }

    fn init_page(store: &mut dyn PageStore, page: u32) -> Result<()> {
        let mut buf = [0u8; PAGE_SIZE];
        {
            let mut w = &mut buf[..];
            w.write_u32::<LittleEndian>(RECOVERY_PAGE_MAGIC).unwrap();
            w.write_u32::<LittleEndian>(0).unwrap();
            w.write_u32::<LittleEndian>(INVALID_PAGE).unwrap();
        }
        store.write_page(page, &buf)
    }

    fn link_next(store: &mut dyn PageStore, page: u32, next: u32) -> Result<()> {
        let mut buf = [0u8; PAGE_SIZE];
        store.read_page(page, &mut buf)?;
        (&mut buf[8..12]).write_u32::<LittleEndian>(next)?;
        store.write_page(page, &buf)
    }

    fn append_to_page(store: &mut dyn PageStore, page: u32, slot: usize, tid: Tid) -> Result<()> {
        let mut buf = [0u8; PAGE_SIZE];
        store.read_page(page, &mut buf)?;
        let offset = PAGE_HEADER + slot * Tid::ENCODED_LEN;
        let mut slice = &mut buf[offset..offset + Tid::ENCODED_LEN];
        tid.encode_into(&mut slice)?;
        let count = (slot + 1) as u32;
        (&mut buf[4..8]).write_u32::<LittleEndian>(count)?;
        store.write_page(page, &buf)
    }

    /// Reads back every TID recorded in the on-disk chain starting at
    /// `head_page`, independent of any in-memory state (used by recovery
    /// after a restart, when `RecoveryLog` itself has not been built up
    /// from inserts yet).
    pub fn read_chain(store: &dyn PageStore, head_page: u32) -> Result<Vec<Tid>> {
        let mut tids = Vec::new();
        let mut current = head_page;
        while current != INVALID_PAGE {
            let mut buf = [0u8; PAGE_SIZE];
            store.read_page(current, &mut buf)?;
            let mut header = &buf[..PAGE_HEADER];
            let magic = header.read_u32::<LittleEndian>()?;
            if magic != RECOVERY_PAGE_MAGIC {
                return Err(crate::error::Error::corruption(format!(
                    "recovery page {current} has bad magic {magic:#x}"
                )));
            }
            let count = header.read_u32::<LittleEndian>()? as usize;
            let next = header.read_u32::<LittleEndian>()?;
            for slot in 0..count {
                let offset = PAGE_HEADER + slot * Tid::ENCODED_LEN;
                let mut slice = &buf[offset..offset + Tid::ENCODED_LEN];
                tids.push(Tid::decode_from(&mut slice)?);
            }
            current = next;
        }
        Ok(tids)
    }
}

/// Rebuilds a memtable by refetching and retokenizing every TID recorded
/// in a recovery chain. Rows that no longer exist (deleted since the TID
/// was logged) are silently skipped, matching the host's crash-recovery
/// behavior of tolerating dangling TIDs.
pub fn recover_memtable(
    store: &dyn PageStore,
    head_page: u32,
    heap: &dyn HeapReader,
    tokenizer: &dyn Tokenizer,
) -> Result<Memtable> {
    let tids = RecoveryLog::read_chain(store, head_page)?;
    let mut memtable = Memtable::new();
    let mut recovered = 0usize;
    for tid in tids {
        if let Some(text) = heap.fetch(tid) {
            let (freqs, length) = tokenizer.tokenize(&text);
            memtable.insert_doc(tid, freqs, length);
            recovered += 1;
        }
    }
    log::info!("recovered {recovered} documents from recovery log");
    Ok(memtable)
}
