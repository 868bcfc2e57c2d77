//! Doc-ID assignment: maps the dense `u32` doc IDs used inside a segment
//! back to the sparse [`Tid`]s used by the host, and records each
//! document's raw (pre-fieldnorm) length (spec §3/§4, grounded on
//! `TpDocLength`).
//!
//! The central invariant: doc IDs are assigned by sorting TIDs ascending,
//! so doc-ID order equals TID order. That lets block-level doc-ID deltas
//! stay small and lets a docmap binary search resolve `Tid -> doc_id`.

use crate::error::Result;
use crate::tid::Tid;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocMap {
    tids: Vec<Tid>,
    lengths: Vec<u32>,
}

impl DocMap {
    /// Builds a docmap from `(tid, raw_length)` pairs, sorting by TID
    /// ascending to assign doc IDs.
    pub fn build(mut docs: Vec<(Tid, u32)>) -> Self {
        docs.sort_by_key(|(tid, _)| *tid);
        let (tids, lengths) = docs.into_iter().unzip();
        Self { tids, lengths }
    }

    pub fn len(&self) -> usize {
        self.tids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tids.is_empty()
    }

    pub fn tid(&self, doc_id: u32) -> Option<Tid> {
        self.tids.get(doc_id as usize).copied()
    }

    pub fn raw_length(&self, doc_id: u32) -> Option<u32> {
        self.lengths.get(doc_id as usize).copied()
    }

    /// Resolves a host TID back to its doc ID via binary search, relying
    /// on doc-ID order matching TID order.
    pub fn doc_id_for_tid(&self, tid: Tid) -> Option<u32> {
        self.tids.binary_search(&tid).ok().map(|i| i as u32)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, Tid, u32)> + '_ {
        self.tids
            .iter()
            .zip(self.lengths.iter())
            .enumerate()
            .map(|(doc_id, (tid, len))| (doc_id as u32, *tid, *len))
    }

    /// Layout: `[count:u32]` then, per doc ascending by doc ID,
    /// `[Tid: 6 bytes][length:u32]`.
    pub fn encode_into<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_u32::<LittleEndian>(self.tids.len() as u32)?;
        for (tid, &len) in self.tids.iter().zip(&self.lengths) {
            tid.encode_into(w)?;
            w.write_u32::<LittleEndian>(len)?;
        }
        Ok(())
    }

    pub fn decode_from<R: Read>(r: &mut R) -> Result<Self> {
        let count = r.read_u32::<LittleEndian>()?;
        let mut tids = Vec::with_capacity(count as usize);
        let mut lengths = Vec::with_capacity(count as usize);
        for _ in 0..count {
            tids.push(Tid::decode_from(r)?);
            lengths.push(r.read_u32::<LittleEndian>()?);
        }
        Ok(Self { tids, lengths })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_ids_follow_tid_order() {
        let map = DocMap::build(vec![
            (Tid::new(5, 0), 10),
            (Tid::new(1, 2), 20),
            (Tid::new(1, 0), 30),
        ]);
        assert_eq!(map.tid(0), Some(Tid::new(1, 0)));
        assert_eq!(map.tid(1), Some(Tid::new(1, 2)));
        assert_eq!(map.tid(2), Some(Tid::new(5, 0)));
        assert_eq!(map.raw_length(0), Some(30));
    }

    #[test]
    fn resolves_tid_to_doc_id() {
        let map = DocMap::build(vec![(Tid::new(5, 0), 1), (Tid::new(1, 0), 1)]);
        assert_eq!(map.doc_id_for_tid(Tid::new(1, 0)), Some(0));
        assert_eq!(map.doc_id_for_tid(Tid::new(5, 0)), Some(1));
        assert_eq!(map.doc_id_for_tid(Tid::new(9, 0)), None);
    }

    #[test]
    fn roundtrip() {
        let map = DocMap::build(vec![(Tid::new(1, 0), 5), (Tid::new(2, 0), 7)]);
        let mut buf = Vec::new();
        map.encode_into(&mut buf).unwrap();
        let back = DocMap::decode_from(&mut &buf[..]).unwrap();
        assert_eq!(map, back);
    }
}
