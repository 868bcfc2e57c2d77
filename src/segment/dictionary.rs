//! Term dictionary: a sorted term -> posting-list-location index, enabling
//! binary search lookup (spec §3, grounded on `TpDictionary`/`TpDictEntry`).

use crate::error::Result;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Location and stats for one term's posting list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DictEntry {
    pub posting_offset: u32,
    pub posting_count: u32,
    pub doc_freq: u32,
}

impl DictEntry {
    pub const ENCODED_LEN: usize = 12;

    fn encode_into<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_u32::<LittleEndian>(self.posting_offset)?;
        w.write_u32::<LittleEndian>(self.posting_count)?;
        w.write_u32::<LittleEndian>(self.doc_freq)?;
        Ok(())
    }

    fn decode_from<R: Read>(r: &mut R) -> Result<Self> {
        Ok(Self {
            posting_offset: r.read_u32::<LittleEndian>()?,
            posting_count: r.read_u32::<LittleEndian>()?,
            doc_freq: r.read_u32::<LittleEndian>()?,
        })
    }
}

/// Sorted term index for a single segment. Built once at segment-write time
/// from a term -> entry map and never mutated afterward.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dictionary {
    terms: Vec<(String, DictEntry)>,
}

impl Dictionary {
    /// Builds a dictionary from an arbitrary iterator, sorting by term.
    pub fn from_entries(mut entries: Vec<(String, DictEntry)>) -> Self {
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Self { terms: entries }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Binary search lookup by term.
    pub fn get(&self, term: &str) -> Option<DictEntry> {
        self.terms
            .binary_search_by(|(t, _)| t.as_str().cmp(term))
            .ok()
            .map(|idx| self.terms[idx].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, DictEntry)> {
        self.terms.iter()
    }

    /// Layout: `[count:u32]` then, per term sorted ascending,
    /// `[len:u32][utf8 bytes][DictEntry]`.
    pub fn encode_into<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_u32::<LittleEndian>(self.terms.len() as u32)?;
        for (term, entry) in &self.terms {
            let bytes = term.as_bytes();
            w.write_u32::<LittleEndian>(bytes.len() as u32)?;
            w.write_all(bytes)?;
            entry.encode_into(w)?;
        }
        Ok(())
    }

    pub fn decode_from<R: Read>(r: &mut R) -> Result<Self> {
        let count = r.read_u32::<LittleEndian>()?;
        let mut terms = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let len = r.read_u32::<LittleEndian>()? as usize;
            let mut bytes = vec![0u8; len];
            r.read_exact(&mut bytes)?;
            let term = String::from_utf8(bytes)
                .map_err(|_| crate::error::Error::corruption("dictionary term is not valid utf-8"))?;
            let entry = DictEntry::decode_from(r)?;
            terms.push((term, entry));
        }
        Ok(Self { terms })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(n: u32) -> DictEntry {
        DictEntry {
            posting_offset: n * 10,
            posting_count: n,
            doc_freq: n,
        }
    }

    #[test]
    fn lookup_after_sorting() {
        let dict = Dictionary::from_entries(vec![
            ("zebra".into(), entry(3)),
            ("apple".into(), entry(1)),
            ("mango".into(), entry(2)),
        ]);
        assert_eq!(dict.get("apple"), Some(entry(1)));
        assert_eq!(dict.get("mango"), Some(entry(2)));
        assert_eq!(dict.get("zebra"), Some(entry(3)));
        assert_eq!(dict.get("missing"), None);
    }

    #[test]
    fn roundtrip() {
        let dict = Dictionary::from_entries(vec![
            ("alpha".into(), entry(1)),
            ("beta".into(), entry(2)),
        ]);
        let mut buf = Vec::new();
        dict.encode_into(&mut buf).unwrap();
        let back = Dictionary::decode_from(&mut &buf[..]).unwrap();
        assert_eq!(dict, back);
    }

    #[test]
    fn empty_dictionary_roundtrips() {
        let dict = Dictionary::default();
        let mut buf = Vec::new();
        dict.encode_into(&mut buf).unwrap();
        let back = Dictionary::decode_from(&mut &buf[..]).unwrap();
        assert_eq!(dict, back);
    }
}
