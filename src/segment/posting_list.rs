//! A single term's posting list: a sequence of compressed 128-posting
//! blocks plus a skip list that lets block-max WAND skip whole blocks
//! without decompressing them (spec §4.2/§4.4).

use crate::block::{self, BlockPosting, BLOCK_SIZE};
use crate::error::Result;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Per-block skip metadata: enough to decide, without decompressing, an
/// upper bound on this block's BM25 contribution and where the doc-ID
/// range continues from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkipEntry {
    pub last_doc_id: u32,
    pub block_max_fieldnorm: u8,
    pub block_max_freq: u16,
    pub byte_offset: u32,
    pub byte_len: u32,
    pub count: u16,
    /// Which block layout was chosen (spec §3: "`flags` distinguishes
    /// uncompressed vs delta-bitpacked block"). Kept alongside the block's
    /// own leading flag byte so a caller can decide whether to take the
    /// zero-copy raw path without touching the block bytes at all.
    pub flags: u8,
}

impl SkipEntry {
    const ENCODED_LEN: usize = 4 + 1 + 2 + 4 + 4 + 2 + 1;

    fn encode_into<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_u32::<LittleEndian>(self.last_doc_id)?;
        w.write_u8(self.block_max_fieldnorm)?;
        w.write_u16::<LittleEndian>(self.block_max_freq)?;
        w.write_u32::<LittleEndian>(self.byte_offset)?;
        w.write_u32::<LittleEndian>(self.byte_len)?;
        w.write_u16::<LittleEndian>(self.count)?;
        w.write_u8(self.flags)?;
        Ok(())
    }

    fn decode_from<R: Read>(r: &mut R) -> Result<Self> {
        Ok(Self {
            last_doc_id: r.read_u32::<LittleEndian>()?,
            block_max_fieldnorm: r.read_u8()?,
            block_max_freq: r.read_u16::<LittleEndian>()?,
            byte_offset: r.read_u32::<LittleEndian>()?,
            byte_len: r.read_u32::<LittleEndian>()?,
            count: r.read_u16::<LittleEndian>()?,
            flags: r.read_u8()?,
        })
    }

    /// Whether this block used the raw, uncompressed layout.
    pub fn is_raw(&self) -> bool {
        self.flags == block::BlockEncoding::Raw.as_flag()
    }
}

/// A term's full posting list as it sits in a segment: skip entries
/// followed by the concatenated compressed block bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostingList {
    pub skips: Vec<SkipEntry>,
    pub block_bytes: Vec<u8>,
}

impl PostingList {
    /// Builds a posting list from postings sorted ascending by doc ID,
    /// chunking into `BLOCK_SIZE`-sized blocks.
    pub fn build(postings: &[BlockPosting]) -> Self {
        let mut skips = Vec::new();
        let mut block_bytes = Vec::new();
        for chunk in postings.chunks(BLOCK_SIZE) {
            let compressed = block::compress(chunk);
            let last_doc_id = chunk.last().map(|p| p.doc_id).unwrap_or(0);
            skips.push(SkipEntry {
                last_doc_id,
                block_max_fieldnorm: block::block_max_fieldnorm(chunk),
                block_max_freq: chunk.iter().map(|p| p.freq).max().unwrap_or(0),
                byte_offset: block_bytes.len() as u32,
                byte_len: compressed.len() as u32,
                count: chunk.len() as u16,
                flags: compressed[0],
            });
            block_bytes.extend_from_slice(&compressed);
        }
        Self { skips, block_bytes }
    }

    pub fn doc_freq(&self) -> u32 {
        self.skips.iter().map(|s| s.count as u32).sum()
    }

    pub fn encode_into<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_u32::<LittleEndian>(self.skips.len() as u32)?;
        for skip in &self.skips {
            skip.encode_into(w)?;
        }
        w.write_u32::<LittleEndian>(self.block_bytes.len() as u32)?;
        w.write_all(&self.block_bytes)?;
        Ok(())
    }

    pub fn decode_from<R: Read>(r: &mut R) -> Result<Self> {
        let num_skips = r.read_u32::<LittleEndian>()?;
        let mut skips = Vec::with_capacity(num_skips as usize);
        for _ in 0..num_skips {
            skips.push(SkipEntry::decode_from(r)?);
        }
        let block_len = r.read_u32::<LittleEndian>()? as usize;
        let mut block_bytes = vec![0u8; block_len];
        r.read_exact(&mut block_bytes)?;
        Ok(Self { skips, block_bytes })
    }

    /// Decompresses and returns block `i`'s postings.
    pub fn decode_block(&self, i: usize) -> Result<Vec<BlockPosting>> {
        let skip = &self.skips[i];
        let bytes =
            &self.block_bytes[skip.byte_offset as usize..(skip.byte_offset + skip.byte_len) as usize];
        block::decompress(bytes, skip.count as usize)
    }

    /// Borrows block `i`'s raw fixed-width records directly out of this
    /// list's resident bytes, with no decompression and no copy (spec
    /// §4.5's `direct` path). Returns `None` if the block is bitpacked,
    /// in which case the caller falls back to [`decode_block`].
    pub fn raw_block_bytes(&self, i: usize) -> Option<&[u8]> {
        let skip = &self.skips[i];
        if !skip.is_raw() {
            return None;
        }
        let bytes =
            &self.block_bytes[skip.byte_offset as usize..(skip.byte_offset + skip.byte_len) as usize];
        block::raw_block_bytes(bytes)
    }
}

/// Forward-only cursor over a term's posting list, supporting the seeks
/// block-max WAND needs: skip whole blocks using [`SkipEntry`] bounds, and
/// decode a block only when its postings might matter.
pub struct PostingCursor<'a> {
    list: &'a PostingList,
    block_idx: usize,
    current: Option<Vec<BlockPosting>>,
    pos_in_block: usize,
}

impl<'a> PostingCursor<'a> {
    pub fn new(list: &'a PostingList) -> Self {
        Self {
            list,
            block_idx: 0,
            current: None,
            pos_in_block: 0,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.block_idx >= self.list.skips.len()
    }

    /// The last doc ID of the current block, without decoding it.
    pub fn current_block_max_doc_id(&self) -> Option<u32> {
        self.list.skips.get(self.block_idx).map(|s| s.last_doc_id)
    }

    /// The block-max fieldnorm of the current block, without decoding it.
    pub fn current_block_max_fieldnorm(&self) -> Option<u8> {
        self.list
            .skips
            .get(self.block_idx)
            .map(|s| s.block_max_fieldnorm)
    }

    /// The largest term frequency in the current block, without decoding it.
    pub fn current_block_max_freq(&self) -> Option<u16> {
        self.list.skips.get(self.block_idx).map(|s| s.block_max_freq)
    }

    /// Advances whole blocks until the current block's last doc ID is
    /// `>= target`, without decompressing skipped blocks.
    pub fn advance_block_to(&mut self, target: u32) {
        while let Some(last) = self.current_block_max_doc_id() {
            if last >= target {
                break;
            }
            self.block_idx += 1;
            self.current = None;
            self.pos_in_block = 0;
        }
    }

    fn ensure_decoded(&mut self) -> Result<()> {
        if self.current.is_none() && self.block_idx < self.list.skips.len() {
            self.current = Some(self.list.decode_block(self.block_idx)?);
        }
        Ok(())
    }

    /// Returns the next posting with `doc_id >= target`, decoding blocks
    /// as needed.
    pub fn seek(&mut self, target: u32) -> Result<Option<BlockPosting>> {
        self.advance_block_to(target);
        loop {
            self.ensure_decoded()?;
            let Some(block) = &self.current else {
                return Ok(None);
            };
            while self.pos_in_block < block.len() {
                let p = block[self.pos_in_block];
                if p.doc_id >= target {
                    return Ok(Some(p));
                }
                self.pos_in_block += 1;
            }
            self.block_idx += 1;
            self.current = None;
            self.pos_in_block = 0;
            if self.block_idx >= self.list.skips.len() {
                return Ok(None);
            }
        }
    }

    /// Returns the next posting in order, or `None` at the end.
    pub fn next(&mut self) -> Result<Option<BlockPosting>> {
        loop {
            self.ensure_decoded()?;
            let Some(block) = &self.current else {
                return Ok(None);
            };
            if self.pos_in_block < block.len() {
                let p = block[self.pos_in_block];
                self.pos_in_block += 1;
                return Ok(Some(p));
            }
            self.block_idx += 1;
            self.current = None;
            self.pos_in_block = 0;
            if self.block_idx >= self.list.skips.len() {
                return Ok(None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posting(doc_id: u32, freq: u16, fieldnorm: u8) -> BlockPosting {
        BlockPosting {
            doc_id,
            freq,
            fieldnorm,
        }
    }

    fn sample_postings(n: u32) -> Vec<BlockPosting> {
        (0..n).map(|i| posting(i * 2, 1 + (i % 5) as u16, (i % 40) as u8)).collect()
    }

    #[test]
    fn build_chunks_into_blocks() {
        let postings = sample_postings(300);
        let list = PostingList::build(&postings);
        assert_eq!(list.skips.len(), 3); // 128 + 128 + 44
        assert_eq!(list.doc_freq(), 300);
    }

    #[test]
    fn roundtrip() {
        let postings = sample_postings(150);
        let list = PostingList::build(&postings);
        let mut buf = Vec::new();
        list.encode_into(&mut buf).unwrap();
        let back = PostingList::decode_from(&mut &buf[..]).unwrap();
        assert_eq!(list, back);
    }

    #[test]
    fn huge_doc_gap_block_is_marked_raw_and_exposes_zero_copy_bytes() {
        let postings = vec![posting(0, 1, 0), posting(u32::MAX, 1, 0)];
        let list = PostingList::build(&postings);
        assert!(list.skips[0].is_raw());
        assert!(list.raw_block_bytes(0).is_some());
        assert_eq!(list.decode_block(0).unwrap(), postings);
    }

    #[test]
    fn normal_block_is_not_raw() {
        let postings = sample_postings(10);
        let list = PostingList::build(&postings);
        assert!(!list.skips[0].is_raw());
        assert!(list.raw_block_bytes(0).is_none());
    }

    #[test]
    fn cursor_iterates_all_postings_in_order() {
        let postings = sample_postings(260);
        let list = PostingList::build(&postings);
        let mut cursor = PostingCursor::new(&list);
        let mut collected = Vec::new();
        while let Some(p) = cursor.next().unwrap() {
            collected.push(p);
        }
        assert_eq!(collected, postings);
    }

    #[test]
    fn cursor_seek_skips_whole_blocks() {
        let postings = sample_postings(300);
        let list = PostingList::build(&postings);
        let mut cursor = PostingCursor::new(&list);
        let target = postings[260].doc_id;
        let found = cursor.seek(target).unwrap().unwrap();
        assert_eq!(found.doc_id, target);
    }

    #[test]
    fn cursor_seek_past_end_returns_none() {
        let postings = sample_postings(5);
        let list = PostingList::build(&postings);
        let mut cursor = PostingCursor::new(&list);
        assert_eq!(cursor.seek(10_000).unwrap(), None);
    }
}
