//! Logical-to-physical page address translation (spec §4.3).
//!
//! A segment's dictionary, postings, and docmap are logical contiguous
//! byte streams, but physically they live across many fixed-size pages.
//! [`PageMapper`] translates a logical byte offset into a page number and
//! an in-page offset; [`PageStore`] is the storage backend a segment
//! reads and writes those pages through.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Total bytes per physical page.
pub const PAGE_SIZE: usize = 8192;

/// Bytes reserved for a page header, matching the host-heap convention
/// this format was distilled from: each page keeps a small header and
/// devotes the rest to logical data.
pub const PAGE_HEADER_SIZE: usize = 24;

/// Usable data bytes per page.
pub const DATA_PER_PAGE: usize = PAGE_SIZE - PAGE_HEADER_SIZE;

/// Sentinel meaning "no page" (the chain terminator), matching the host
/// format's invalid block number.
pub const INVALID_PAGE: u32 = u32::MAX;

/// Translates logical byte offsets in a segment's data stream to page
/// numbers and in-page offsets. Does not itself perform I/O.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageMapper;

impl PageMapper {
    /// The logical page index containing `logical_offset`.
    pub fn logical_page(logical_offset: u64) -> u32 {
        (logical_offset / DATA_PER_PAGE as u64) as u32
    }

    /// The offset within that logical page.
    pub fn page_offset(logical_offset: u64) -> u32 {
        (logical_offset % DATA_PER_PAGE as u64) as u32
    }

    /// Bytes remaining on the current page starting at `logical_offset`.
    pub fn bytes_remaining_on_page(logical_offset: u64) -> u32 {
        DATA_PER_PAGE as u32 - Self::page_offset(logical_offset)
    }

    /// Whether a `len`-byte read starting at `logical_offset` fits on a
    /// single page without crossing a page boundary.
    pub fn fits_on_page(logical_offset: u64, len: u32) -> bool {
        Self::page_offset(logical_offset) as u64 + len as u64 <= DATA_PER_PAGE as u64
    }
}

/// Storage backend a segment reads and writes pages through. Implementors
/// need not be thread-safe; the index serializes writers at a higher
/// level (`parking_lot::RwLock<IndexInner>`).
pub trait PageStore {
    /// Allocates and zero-initializes a fresh page, returning its number.
    fn allocate(&mut self) -> Result<u32>;

    /// Reads the full contents of `page` into a fixed [`PAGE_SIZE`] buffer.
    fn read_page(&self, page: u32, buf: &mut [u8; PAGE_SIZE]) -> Result<()>;

    /// Overwrites the full contents of `page`.
    fn write_page(&mut self, page: u32, buf: &[u8; PAGE_SIZE]) -> Result<()>;

    /// Number of pages currently allocated.
    fn page_count(&self) -> u32;

    /// Zero-copy access to `len` bytes of `page` starting at `offset`,
    /// when the backend can hand out a borrow without copying (spec §4.5's
    /// `direct(off, len)`). Returns `None` if the range doesn't fit on the
    /// page or the backend has no pinned buffer to borrow from, in which
    /// case the caller falls back to `read_page`. The default implementation
    /// always falls back.
    fn direct(&self, _page: u32, _offset: u32, _len: u32) -> Option<&[u8]> {
        None
    }
}

/// A file-backed [`PageStore`]: each page is a fixed-size slot in a single
/// flat file, addressed by `page * PAGE_SIZE`.
pub struct FilePageStore {
    file: std::fs::File,
    path: PathBuf,
    page_count: u32,
}

impl FilePageStore {
    /// Opens (creating if absent) a page file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;
        let len = file.metadata()?.len();
        if len % PAGE_SIZE as u64 != 0 {
            return Err(Error::corruption(format!(
                "page file {} has length {len} not a multiple of page size",
                path.display()
            )));
        }
        let page_count = (len / PAGE_SIZE as u64) as u32;
        Ok(Self {
            file,
            path,
            page_count,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PageStore for FilePageStore {
    fn allocate(&mut self) -> Result<u32> {
        let page = self.page_count;
        self.file.seek(SeekFrom::Start(page as u64 * PAGE_SIZE as u64))?;
        self.file.write_all(&[0u8; PAGE_SIZE])?;
        self.page_count += 1;
        Ok(page)
    }

    fn read_page(&self, page: u32, buf: &mut [u8; PAGE_SIZE]) -> Result<()> {
        if page >= self.page_count {
            return Err(Error::corruption(format!(
                "read of out-of-range page {page} (have {} pages)",
                self.page_count
            )));
        }
        let mut file = self.file.try_clone()?;
        file.seek(SeekFrom::Start(page as u64 * PAGE_SIZE as u64))?;
        file.read_exact(buf)?;
        Ok(())
    }

    fn write_page(&mut self, page: u32, buf: &[u8; PAGE_SIZE]) -> Result<()> {
        if page >= self.page_count {
            return Err(Error::corruption(format!(
                "write of out-of-range page {page} (have {} pages)",
                self.page_count
            )));
        }
        self.file.seek(SeekFrom::Start(page as u64 * PAGE_SIZE as u64))?;
        self.file.write_all(buf)?;
        Ok(())
    }

    fn page_count(&self) -> u32 {
        self.page_count
    }
}

/// An in-memory [`PageStore`] used by tests and by the parallel build's
/// scratch workers before pages are handed to the shared file store.
#[derive(Default)]
pub struct MemPageStore {
    pages: HashMap<u32, [u8; PAGE_SIZE]>,
    next: u32,
}

impl PageStore for MemPageStore {
    fn allocate(&mut self) -> Result<u32> {
        let page = self.next;
        self.next += 1;
        self.pages.insert(page, [0u8; PAGE_SIZE]);
        Ok(page)
    }

    fn read_page(&self, page: u32, buf: &mut [u8; PAGE_SIZE]) -> Result<()> {
        let data = self
            .pages
            .get(&page)
            .ok_or_else(|| Error::corruption(format!("read of unallocated page {page}")))?;
        buf.copy_from_slice(data);
        Ok(())
    }

    fn write_page(&mut self, page: u32, buf: &[u8; PAGE_SIZE]) -> Result<()> {
        let slot = self
            .pages
            .get_mut(&page)
            .ok_or_else(|| Error::corruption(format!("write of unallocated page {page}")))?;
        slot.copy_from_slice(buf);
        Ok(())
    }

    fn page_count(&self) -> u32 {
        self.next
    }

    fn direct(&self, page: u32, offset: u32, len: u32) -> Option<&[u8]> {
        let data = self.pages.get(&page)?;
        let start = offset as usize;
        let end = start.checked_add(len as usize)?;
        data.get(start..end)
    }
}

/// Allocator for the parallel build's shared page pool: workers claim
/// disjoint page ranges via atomic fetch-add, avoiding a lock per page.
pub struct PagePool {
    next_free: std::sync::atomic::AtomicU32,
    limit: u32,
}

impl PagePool {
    pub fn new(limit: u32) -> Self {
        Self {
            next_free: std::sync::atomic::AtomicU32::new(0),
            limit,
        }
    }

    /// Claims the next free page number, or an exhaustion error once
    /// `limit` is reached.
    pub fn claim(&self) -> Result<u32> {
        let page = self
            .next_free
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        if page >= self.limit {
            return Err(Error::exhausted(
                "page pool exhausted",
                "raise the configured page limit or trigger a compaction",
            ));
        }
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logical_page_arithmetic() {
        assert_eq!(PageMapper::logical_page(0), 0);
        assert_eq!(PageMapper::logical_page(DATA_PER_PAGE as u64), 1);
        assert_eq!(PageMapper::page_offset(DATA_PER_PAGE as u64 + 5), 5);
    }

    #[test]
    fn fits_on_page_boundary() {
        let near_end = DATA_PER_PAGE as u64 - 10;
        assert!(PageMapper::fits_on_page(near_end, 10));
        assert!(!PageMapper::fits_on_page(near_end, 11));
    }

    #[test]
    fn mem_page_store_roundtrip() {
        let mut store = MemPageStore::default();
        let p = store.allocate().unwrap();
        let mut buf = [7u8; PAGE_SIZE];
        store.write_page(p, &buf).unwrap();
        buf = [0u8; PAGE_SIZE];
        store.read_page(p, &mut buf).unwrap();
        assert_eq!(buf, [7u8; PAGE_SIZE]);
    }

    #[test]
    fn file_page_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FilePageStore::open(dir.path().join("pages.bin")).unwrap();
        let p0 = store.allocate().unwrap();
        let p1 = store.allocate().unwrap();
        assert_eq!(store.page_count(), 2);

        let mut buf = [0u8; PAGE_SIZE];
        buf[0] = 42;
        store.write_page(p1, &buf).unwrap();

        let mut read_back = [0u8; PAGE_SIZE];
        store.read_page(p1, &mut read_back).unwrap();
        assert_eq!(read_back[0], 42);

        let mut zero = [0u8; PAGE_SIZE];
        store.read_page(p0, &mut zero).unwrap();
        assert_eq!(zero, [0u8; PAGE_SIZE]);
    }

    #[test]
    fn mem_page_store_direct_borrows_without_copying() {
        let mut store = MemPageStore::default();
        let p = store.allocate().unwrap();
        let mut buf = [0u8; PAGE_SIZE];
        buf[10..14].copy_from_slice(&[1, 2, 3, 4]);
        store.write_page(p, &buf).unwrap();

        assert_eq!(store.direct(p, 10, 4), Some(&[1u8, 2, 3, 4][..]));
        assert_eq!(store.direct(p, PAGE_SIZE as u32 - 2, 4), None);
        assert_eq!(store.direct(p + 1, 0, 4), None);
    }

    #[test]
    fn file_page_store_direct_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FilePageStore::open(dir.path().join("pages.bin")).unwrap();
        let p = store.allocate().unwrap();
        assert_eq!(store.direct(p, 0, 4), None);
    }

    #[test]
    fn pool_exhausts() {
        let pool = PagePool::new(2);
        assert!(pool.claim().is_ok());
        assert!(pool.claim().is_ok());
        assert!(pool.claim().is_err());
    }
}
