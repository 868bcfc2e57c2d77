//! On-disk segment format: immutable, page-backed, one per flush or merge
//! (spec §4).

pub mod dictionary;
pub mod docmap;
pub mod header;
pub mod page_index;
pub mod posting_list;
pub mod reader;
pub mod writer;

pub use dictionary::{DictEntry, Dictionary};
pub use docmap::DocMap;
pub use header::{SegmentHeader, SEGMENT_MAGIC, SEGMENT_VERSION};
pub use posting_list::{PostingCursor, PostingList, SkipEntry};
pub use reader::Segment;
pub use writer::{write_segment, SegmentBuildInput, SegmentLocation};
