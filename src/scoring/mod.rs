//! BM25 ranking and block-max WAND top-K retrieval (spec §4.6).

pub mod bm25;
pub mod bmw;
pub mod heap;
pub mod source;

pub use bmw::{score_memtable_topk, score_segment_topk, ScoredTerm};
pub use heap::TopKHeap;
pub use source::PostingSource;
