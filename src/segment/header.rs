//! Segment header: the fixed-size preamble at the start of every segment's
//! logical byte stream (spec §3, grounded on `TpSegmentHeader`).

use crate::error::{Error, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Identifies a segment page stream as belonging to this format.
pub const SEGMENT_MAGIC: u32 = 0x5441_5049; // "TAPI"

/// On-disk segment format version.
pub const SEGMENT_VERSION: u32 = 1;

/// Fixed-size metadata stored at the start of a segment's logical stream.
/// Section offsets let a reader jump straight to the dictionary, postings,
/// or docmap without scanning the whole segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentHeader {
    pub magic: u32,
    pub version: u32,
    pub created_at_unix_ms: u64,
    pub level: u32,
    pub num_docs: u32,
    pub num_terms: u32,
    pub total_tokens: u64,
    pub dictionary_offset: u32,
    pub postings_offset: u32,
    pub docmap_offset: u32,
    pub data_size: u32,
}

impl SegmentHeader {
    pub const ENCODED_LEN: usize = 4 + 4 + 8 + 4 + 4 + 4 + 8 + 4 + 4 + 4 + 4;

    pub fn encode_into<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_u32::<LittleEndian>(self.magic)?;
        w.write_u32::<LittleEndian>(self.version)?;
        w.write_u64::<LittleEndian>(self.created_at_unix_ms)?;
        w.write_u32::<LittleEndian>(self.level)?;
        w.write_u32::<LittleEndian>(self.num_docs)?;
        w.write_u32::<LittleEndian>(self.num_terms)?;
        w.write_u64::<LittleEndian>(self.total_tokens)?;
        w.write_u32::<LittleEndian>(self.dictionary_offset)?;
        w.write_u32::<LittleEndian>(self.postings_offset)?;
        w.write_u32::<LittleEndian>(self.docmap_offset)?;
        w.write_u32::<LittleEndian>(self.data_size)?;
        Ok(())
    }

    pub fn decode_from<R: Read>(r: &mut R) -> Result<Self> {
        let magic = r.read_u32::<LittleEndian>()?;
        if magic != SEGMENT_MAGIC {
            return Err(Error::corruption(format!(
                "bad segment magic: expected {SEGMENT_MAGIC:#x}, found {magic:#x}"
            )));
        }
        let version = r.read_u32::<LittleEndian>()?;
        if version != SEGMENT_VERSION {
            return Err(Error::corruption_with_hint(
                format!("unsupported segment version {version}"),
                "rebuild the index with a matching crate version",
            ));
        }
        Ok(Self {
            magic,
            version,
            created_at_unix_ms: r.read_u64::<LittleEndian>()?,
            level: r.read_u32::<LittleEndian>()?,
            num_docs: r.read_u32::<LittleEndian>()?,
            num_terms: r.read_u32::<LittleEndian>()?,
            total_tokens: r.read_u64::<LittleEndian>()?,
            dictionary_offset: r.read_u32::<LittleEndian>()?,
            postings_offset: r.read_u32::<LittleEndian>()?,
            docmap_offset: r.read_u32::<LittleEndian>()?,
            data_size: r.read_u32::<LittleEndian>()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SegmentHeader {
        SegmentHeader {
            magic: SEGMENT_MAGIC,
            version: SEGMENT_VERSION,
            created_at_unix_ms: 1_700_000_000_000,
            level: 0,
            num_docs: 42,
            num_terms: 17,
            total_tokens: 1234,
            dictionary_offset: 64,
            postings_offset: 512,
            docmap_offset: 4096,
            data_size: 8192,
        }
    }

    #[test]
    fn roundtrip() {
        let h = sample();
        let mut buf = Vec::new();
        h.encode_into(&mut buf).unwrap();
        assert_eq!(buf.len(), SegmentHeader::ENCODED_LEN);
        let back = SegmentHeader::decode_from(&mut &buf[..]).unwrap();
        assert_eq!(h, back);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut buf = Vec::new();
        sample().encode_into(&mut buf).unwrap();
        buf[0] ^= 0xFF;
        let err = SegmentHeader::decode_from(&mut &buf[..]).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Corruption);
    }

    #[test]
    fn rejects_future_version() {
        let mut h = sample();
        h.version = SEGMENT_VERSION + 1;
        let mut buf = Vec::new();
        // encode manually so magic stays valid while version is bumped
        buf.write_u32::<LittleEndian>(h.magic).unwrap();
        buf.write_u32::<LittleEndian>(h.version).unwrap();
        assert!(SegmentHeader::decode_from(&mut &buf[..]).is_err());
    }
}
