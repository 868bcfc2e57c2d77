use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::cmp::Ordering;
use std::fmt;
use std::io::{self, Read, Write};

/// Opaque tuple identifier: a (block, offset) pair naming a row in the
/// host heap. Two TIDs are equal iff both fields are equal; ordering is
/// lexicographic on (block, offset). Segment doc-ID assignment sorts by
/// this order (spec §3's central invariant).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Tid {
    pub block: u32,
    pub offset: u16,
}

impl Tid {
    /// The invalid sentinel. `(0, 0)` is a valid, usable TID.
    pub const INVALID: Tid = Tid {
        block: 0xFFFF_FFFF,
        offset: 0,
    };

    pub const fn new(block: u32, offset: u16) -> Self {
        Self { block, offset }
    }

    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    pub fn encode_into<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32::<LittleEndian>(self.block)?;
        w.write_u16::<LittleEndian>(self.offset)
    }

    pub fn decode_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let block = r.read_u32::<LittleEndian>()?;
        let offset = r.read_u16::<LittleEndian>()?;
        Ok(Self { block, offset })
    }

    pub const ENCODED_LEN: usize = 6;
}

impl PartialOrd for Tid {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Tid {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.block, self.offset).cmp(&(other.block, other.offset))
    }
}

impl fmt::Debug for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.block, self.offset)
    }
}

impl fmt::Display for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
