//! The index metapage: fixed page-0 metadata tying together corpus
//! statistics, BM25 parameters, per-level segment locations, and the
//! recovery log head (spec §4.7, grounded on `TpIndexMetaPageData`).

use crate::config::Bm25Params;
use crate::error::{Error, Result};
use crate::page::INVALID_PAGE;
use crate::segment::SegmentLocation;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Identifies a metapage as belonging to this format.
pub const METAPAGE_MAGIC: u32 = 0x5441_4D50; // "TAMP"
pub const METAPAGE_VERSION: u32 = 1;

/// Corpus-wide statistics, updated as segments are added or merged away.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CorpusStats {
    pub total_docs: u64,
    pub total_tokens: u64,
}

impl CorpusStats {
    pub fn avg_doc_len(&self) -> f64 {
        if self.total_docs == 0 {
            0.0
        } else {
            self.total_tokens as f64 / self.total_docs as f64
        }
    }
}

/// Durable index metadata. Held in memory by the index and rewritten to
/// page 0 whenever segment locations or corpus stats change.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaPage {
    pub magic: u32,
    pub version: u32,
    pub bm25: Bm25Params,
    pub stats: CorpusStats,
    /// One list of segment locations per level; `levels[0]` is L0.
    pub levels: Vec<Vec<SegmentLocation>>,
    /// Head of the TID-recovery log chain, or `None` if nothing has been
    /// inserted since the last checkpoint.
    pub recovery_head: Option<u32>,
}

impl MetaPage {
    pub fn new(bm25: Bm25Params) -> Self {
        Self {
            magic: METAPAGE_MAGIC,
            version: METAPAGE_VERSION,
            bm25,
            stats: CorpusStats::default(),
            levels: Vec::new(),
            recovery_head: None,
        }
    }

    pub fn encode_into<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_u32::<LittleEndian>(self.magic)?;
        w.write_u32::<LittleEndian>(self.version)?;
        w.write_f32::<LittleEndian>(self.bm25.k1)?;
        w.write_f32::<LittleEndian>(self.bm25.b)?;
        w.write_u64::<LittleEndian>(self.stats.total_docs)?;
        w.write_u64::<LittleEndian>(self.stats.total_tokens)?;
        w.write_u32::<LittleEndian>(self.recovery_head.unwrap_or(INVALID_PAGE))?;

        w.write_u32::<LittleEndian>(self.levels.len() as u32)?;
        for level in &self.levels {
            w.write_u32::<LittleEndian>(level.len() as u32)?;
            for loc in level {
                w.write_u32::<LittleEndian>(loc.page_index_root)?;
            }
        }
        Ok(())
    }

    pub fn decode_from<R: Read>(r: &mut R) -> Result<Self> {
        let magic = r.read_u32::<LittleEndian>()?;
        if magic != METAPAGE_MAGIC {
            return Err(Error::corruption(format!(
                "bad metapage magic: expected {METAPAGE_MAGIC:#x}, found {magic:#x}"
            )));
        }
        let version = r.read_u32::<LittleEndian>()?;
        if version != METAPAGE_VERSION {
            return Err(Error::corruption_with_hint(
                format!("unsupported metapage version {version}"),
                "rebuild the index with a matching crate version",
            ));
        }
        let k1 = r.read_f32::<LittleEndian>()?;
        let b = r.read_f32::<LittleEndian>()?;
        let total_docs = r.read_u64::<LittleEndian>()?;
        let total_tokens = r.read_u64::<LittleEndian>()?;
        let recovery_raw = r.read_u32::<LittleEndian>()?;
        let recovery_head = (recovery_raw != INVALID_PAGE).then_some(recovery_raw);

        let num_levels = r.read_u32::<LittleEndian>()?;
        let mut levels = Vec::with_capacity(num_levels as usize);
        for _ in 0..num_levels {
            let count = r.read_u32::<LittleEndian>()?;
            let mut segs = Vec::with_capacity(count as usize);
            for _ in 0..count {
                segs.push(SegmentLocation {
                    page_index_root: r.read_u32::<LittleEndian>()?,
                });
            }
            levels.push(segs);
        }

        Ok(Self {
            magic,
            version,
            bm25: Bm25Params { k1, b },
            stats: CorpusStats {
                total_docs,
                total_tokens,
            },
            levels,
            recovery_head,
        })
    }

    pub fn segment_count_per_level(&self) -> Vec<u32> {
        self.levels.iter().map(|l| l.len() as u32).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let mut meta = MetaPage::new(Bm25Params::default());
        meta.stats = CorpusStats {
            total_docs: 10,
            total_tokens: 100,
        };
        meta.levels = vec![
            vec![SegmentLocation { page_index_root: 5 }, SegmentLocation { page_index_root: 9 }],
            vec![],
        ];
        meta.recovery_head = Some(3);

        let mut buf = Vec::new();
        meta.encode_into(&mut buf).unwrap();
        let back = MetaPage::decode_from(&mut &buf[..]).unwrap();
        assert_eq!(meta, back);
    }

    #[test]
    fn no_recovery_head_roundtrips_as_none() {
        let meta = MetaPage::new(Bm25Params::default());
        let mut buf = Vec::new();
        meta.encode_into(&mut buf).unwrap();
        let back = MetaPage::decode_from(&mut &buf[..]).unwrap();
        assert_eq!(back.recovery_head, None);
    }

    #[test]
    fn rejects_bad_magic() {
        let meta = MetaPage::new(Bm25Params::default());
        let mut buf = Vec::new();
        meta.encode_into(&mut buf).unwrap();
        buf[0] ^= 0xFF;
        assert!(MetaPage::decode_from(&mut &buf[..]).is_err());
    }
}
