//! Delta + bitpack codec for posting blocks (spec §4.2).
//!
//! Each block holds up to [`BLOCK_SIZE`] postings belonging to a single
//! term, sorted by ascending doc ID. Doc IDs are delta-encoded against the
//! previous doc ID in the block (the first delta is the first doc ID
//! itself, decoded against a `first_doc_id` base of 0), then both the delta
//! stream and the frequency stream are bitpacked to the minimum width that
//! covers their respective maxima. Fieldnorm bytes are stored uncompressed,
//! one per posting.
//!
//! When the deltas need the full 32 bits (realistically only a single huge
//! doc-ID gap), bitpacking saves nothing over a flat array of fixed-width
//! records, so [`compress`] also tries a raw, uncompressed layout and keeps
//! whichever is smaller (resolved Open Question: spec §3's skip-entry
//! `flags` byte records which one was chosen).
//!
//! Bitpacked layout:
//! ```text
//! [1 byte:  flags = 0]
//! [1 byte:  doc_id_bits]
//! [1 byte:  freq_bits]
//! [ceil(count * doc_id_bits / 8) bytes: bitpacked doc ID deltas]
//! [ceil(count * freq_bits / 8) bytes:   bitpacked frequencies]
//! [count bytes: fieldnorms]
//! ```
//!
//! Raw layout (`doc_id_bits == 32` case, or whenever it's smaller):
//! ```text
//! [1 byte: flags = 1]
//! [count * 7 bytes: (doc_id: u32 LE, freq: u16 LE, fieldnorm: u8) per posting]
//! ```

use crate::error::{Error, Result};
use crate::fieldnorm;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

/// Maximum postings per block.
pub const BLOCK_SIZE: usize = 128;

/// Which of the two block layouts a compressed block uses. Mirrors the
/// `flags` byte spec §3 stores redundantly in the block's skip entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockEncoding {
    Bitpacked,
    Raw,
}

impl BlockEncoding {
    pub fn as_flag(self) -> u8 {
        match self {
            BlockEncoding::Bitpacked => 0,
            BlockEncoding::Raw => 1,
        }
    }

    pub fn from_flag(flag: u8) -> Result<Self> {
        match flag {
            0 => Ok(BlockEncoding::Bitpacked),
            1 => Ok(BlockEncoding::Raw),
            other => Err(Error::corruption(format!("unknown block encoding flag {other}"))),
        }
    }
}

/// Bytes per posting in the raw layout: 4 (doc id) + 2 (freq) + 1 (fieldnorm).
const RAW_RECORD_LEN: usize = 7;

/// Worst case is the raw layout at a full block: 1-byte flag + 128 * 7.
/// `compress` always picks the smaller of the two layouts, so this also
/// bounds the bitpacked case in practice.
pub const MAX_COMPRESSED_BLOCK_SIZE: usize = 1 + BLOCK_SIZE * RAW_RECORD_LEN;

/// A single posting before fieldnorm lookup: doc ID, term frequency within
/// the document, and the document's fieldnorm byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockPosting {
    pub doc_id: u32,
    pub freq: u16,
    pub fieldnorm: u8,
}

/// Minimum number of bits needed to represent `max_value`, at least 1.
pub fn bit_width(max_value: u32) -> u8 {
    if max_value == 0 {
        return 1;
    }
    32 - max_value.leading_zeros().min(31) as u8
}

fn bitpack_encode(values: &[u32], bits: u8, out: &mut Vec<u8>) {
    let mask: u64 = if bits == 32 {
        u32::MAX as u64
    } else {
        (1u64 << bits) - 1
    };
    let mut buffer: u64 = 0;
    let mut buf_bits: u32 = 0;
    for &v in values {
        buffer |= (v as u64 & mask) << buf_bits;
        buf_bits += bits as u32;
        while buf_bits >= 8 {
            out.push((buffer & 0xFF) as u8);
            buffer >>= 8;
            buf_bits -= 8;
        }
    }
    if buf_bits > 0 {
        out.push((buffer & 0xFF) as u8);
    }
}

fn bitpack_decode(input: &[u8], count: usize, bits: u8, out: &mut Vec<u32>) {
    let mask: u64 = if bits == 32 {
        u32::MAX as u64
    } else {
        (1u64 << bits) - 1
    };
    let mut buffer: u64 = 0;
    let mut buf_bits: u32 = 0;
    let mut in_pos = 0usize;
    for _ in 0..count {
        while buf_bits < bits as u32 {
            buffer |= (input[in_pos] as u64) << buf_bits;
            in_pos += 1;
            buf_bits += 8;
        }
        out.push((buffer & mask) as u32);
        buffer >>= bits as u32;
        buf_bits -= bits as u32;
    }
}

/// Bytes needed to bitpack `count` values at `bits` each.
fn packed_len(count: usize, bits: u8) -> usize {
    (count * bits as usize + 7) / 8
}

fn bitpacked_encode(postings: &[BlockPosting]) -> Vec<u8> {
    let mut deltas = Vec::with_capacity(postings.len());
    let mut freqs = Vec::with_capacity(postings.len());
    let mut max_delta = 0u32;
    let mut max_freq = 0u32;
    let mut prev_doc = 0u32;
    for p in postings {
        let delta = p.doc_id - prev_doc;
        deltas.push(delta);
        freqs.push(p.freq as u32);
        max_delta = max_delta.max(delta);
        max_freq = max_freq.max(p.freq as u32);
        prev_doc = p.doc_id;
    }

    let doc_id_bits = bit_width(max_delta);
    let freq_bits = bit_width(max_freq);

    let mut out = Vec::with_capacity(
        3 + packed_len(postings.len(), doc_id_bits) + packed_len(postings.len(), freq_bits)
            + postings.len(),
    );
    out.push(BlockEncoding::Bitpacked.as_flag());
    out.push(doc_id_bits);
    out.push(freq_bits);
    bitpack_encode(&deltas, doc_id_bits, &mut out);
    bitpack_encode(&freqs, freq_bits, &mut out);
    for p in postings {
        out.push(p.fieldnorm);
    }
    out
}

fn bitpacked_decode(compressed: &[u8], count: usize) -> Result<Vec<BlockPosting>> {
    if compressed.len() < 2 {
        return Err(Error::corruption("posting block shorter than its header"));
    }
    let doc_id_bits = compressed[0];
    let freq_bits = compressed[1];
    if !(1..=32).contains(&doc_id_bits) || !(1..=16).contains(&freq_bits) {
        return Err(Error::corruption(format!(
            "posting block header out of range: doc_id_bits={doc_id_bits} freq_bits={freq_bits}"
        )));
    }

    let doc_id_bytes = packed_len(count, doc_id_bits);
    let freq_bytes = packed_len(count, freq_bits);
    let expected = 2 + doc_id_bytes + freq_bytes + count;
    if compressed.len() < expected {
        return Err(Error::corruption(format!(
            "posting block truncated: need {expected} bytes, have {}",
            compressed.len()
        )));
    }

    let mut pos = 2;
    let mut deltas = Vec::with_capacity(count);
    bitpack_decode(&compressed[pos..], count, doc_id_bits, &mut deltas);
    pos += doc_id_bytes;

    let mut freqs = Vec::with_capacity(count);
    bitpack_decode(&compressed[pos..], count, freq_bits, &mut freqs);
    pos += freq_bytes;

    let fieldnorms = &compressed[pos..pos + count];

    let mut prev_doc = 0u32;
    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let doc_id = prev_doc + deltas[i];
        out.push(BlockPosting {
            doc_id,
            freq: freqs[i] as u16,
            fieldnorm: fieldnorms[i],
        });
        prev_doc = doc_id;
    }
    Ok(out)
}

fn bitpacked_size(compressed: &[u8], count: usize) -> Result<usize> {
    if compressed.len() < 2 {
        return Err(Error::corruption("posting block shorter than its header"));
    }
    let doc_id_bits = compressed[0];
    let freq_bits = compressed[1];
    Ok(2 + packed_len(count, doc_id_bits) + packed_len(count, freq_bits) + count)
}

fn raw_encode(postings: &[BlockPosting]) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + postings.len() * RAW_RECORD_LEN);
    out.push(BlockEncoding::Raw.as_flag());
    for p in postings {
        out.write_u32::<LittleEndian>(p.doc_id).unwrap();
        out.write_u16::<LittleEndian>(p.freq).unwrap();
        out.write_u8(p.fieldnorm).unwrap();
    }
    out
}

fn raw_decode(body: &[u8], count: usize) -> Result<Vec<BlockPosting>> {
    let expected = count * RAW_RECORD_LEN;
    if body.len() < expected {
        return Err(Error::corruption(format!(
            "raw posting block truncated: need {expected} bytes, have {}",
            body.len()
        )));
    }
    let mut out = Vec::with_capacity(count);
    let mut r = body;
    for _ in 0..count {
        let doc_id = r.read_u32::<LittleEndian>()?;
        let freq = r.read_u16::<LittleEndian>()?;
        let fieldnorm = r.read_u8()?;
        out.push(BlockPosting {
            doc_id,
            freq,
            fieldnorm,
        });
    }
    Ok(out)
}

/// Compresses a block of at most [`BLOCK_SIZE`] postings, sorted by
/// ascending `doc_id`. Tries both layouts and keeps the smaller one,
/// recording the choice in the leading flag byte.
pub fn compress(postings: &[BlockPosting]) -> Vec<u8> {
    assert!(postings.len() <= BLOCK_SIZE);
    if postings.is_empty() {
        return Vec::new();
    }

    let bitpacked = bitpacked_encode(postings);
    let raw = raw_encode(postings);
    if raw.len() < bitpacked.len() {
        raw
    } else {
        bitpacked
    }
}

/// Decompresses `count` postings from a block produced by [`compress`].
pub fn decompress(compressed: &[u8], count: usize) -> Result<Vec<BlockPosting>> {
    if count == 0 {
        return Ok(Vec::new());
    }
    if compressed.is_empty() {
        return Err(Error::corruption("posting block shorter than its header"));
    }
    match BlockEncoding::from_flag(compressed[0])? {
        BlockEncoding::Bitpacked => bitpacked_decode(&compressed[1..], count),
        BlockEncoding::Raw => raw_decode(&compressed[1..], count),
    }
}

/// The exact compressed size of a block without fully decompressing it.
pub fn compressed_size(compressed: &[u8], count: usize) -> Result<usize> {
    if count == 0 {
        return Ok(0);
    }
    if compressed.is_empty() {
        return Err(Error::corruption("posting block shorter than its header"));
    }
    match BlockEncoding::from_flag(compressed[0])? {
        BlockEncoding::Bitpacked => Ok(1 + bitpacked_size(&compressed[1..], count)?),
        BlockEncoding::Raw => Ok(1 + count * RAW_RECORD_LEN),
    }
}

/// Raw, zero-copy byte view of an uncompressed block's fixed-width records,
/// or `None` if this block used the bitpacked layout (spec §4.5's `direct`
/// path: callers that only need a borrowed byte range, rather than decoded
/// postings, can skip `decompress` entirely for raw blocks).
pub fn raw_block_bytes(compressed: &[u8]) -> Option<&[u8]> {
    if compressed.first() == Some(&BlockEncoding::Raw.as_flag()) {
        Some(&compressed[1..])
    } else {
        None
    }
}

/// The block-max score upper bound used by block-max WAND (spec §4.2,
/// resolved Open Question): the minimum fieldnorm code in the block, since
/// BM25's length-normalization term is decreasing in document length and a
/// smaller fieldnorm yields a larger per-term score for any fixed tf.
pub fn block_max_fieldnorm(postings: &[BlockPosting]) -> u8 {
    postings.iter().map(|p| p.fieldnorm).min().unwrap_or(0)
}

/// Decoded document length corresponding to [`block_max_fieldnorm`], for
/// feeding the BM25 upper-bound formula directly.
pub fn block_max_len(postings: &[BlockPosting]) -> u32 {
    fieldnorm::decode(block_max_fieldnorm(postings))
}
