//! Tunable parameters for an index: BM25 constants and the thresholds
//! that drive spills and compaction (spec §2/§5).

/// BM25 ranking parameters (spec §4.6).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Params {
    /// Term-frequency saturation point. Higher values let repeated terms
    /// keep contributing longer before diminishing returns kick in.
    pub k1: f32,
    /// Length-normalization strength, in `[0, 1]`. `0` disables length
    /// normalization entirely; `1` applies it fully.
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75 }
    }
}

/// Thresholds governing when a memtable spills and when levels compact.
/// Mirrors the teacher's `compaction::levelled::Strategy` shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Spill the active memtable once it holds roughly this many bytes.
    pub memtable_spill_bytes: usize,
    /// Trigger an L0 compaction once this many L0 segments have piled up.
    pub l0_compaction_trigger: u8,
    /// Target size in bytes for a compacted segment at level N+1 relative
    /// to level N.
    pub level_size_multiplier: u32,
    /// Upper bound on concurrent build/compaction workers.
    pub max_parallel_workers: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            memtable_spill_bytes: 64 * 1024 * 1024,
            l0_compaction_trigger: 4,
            level_size_multiplier: 10,
            max_parallel_workers: 4,
        }
    }
}

/// Top-level configuration for an [`crate::index::Index`].
#[derive(Debug, Clone, PartialEq)]
pub struct IndexConfig {
    pub bm25: Bm25Params,
    pub thresholds: Thresholds,
    /// Total pages the index's page pool may allocate before returning
    /// `ResourceExhaustion`.
    pub page_limit: u32,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            bm25: Bm25Params::default(),
            thresholds: Thresholds::default(),
            page_limit: 1 << 20,
        }
    }
}

/// Builder for [`IndexConfig`], following the teacher's builder-pattern
/// config construction.
#[derive(Debug, Clone, Default)]
pub struct IndexConfigBuilder {
    config: IndexConfig,
}

impl IndexConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: IndexConfig::default(),
        }
    }

    pub fn bm25(mut self, k1: f32, b: f32) -> Self {
        self.config.bm25 = Bm25Params { k1, b };
        self
    }

    pub fn memtable_spill_bytes(mut self, bytes: usize) -> Self {
        self.config.thresholds.memtable_spill_bytes = bytes;
        self
    }

    pub fn l0_compaction_trigger(mut self, n: u8) -> Self {
        self.config.thresholds.l0_compaction_trigger = n;
        self
    }

    pub fn max_parallel_workers(mut self, n: usize) -> Self {
        self.config.thresholds.max_parallel_workers = n.max(1);
        self
    }

    pub fn page_limit(mut self, pages: u32) -> Self {
        self.config.page_limit = pages;
        self
    }

    pub fn build(self) -> IndexConfig {
        self.config
    }
}
