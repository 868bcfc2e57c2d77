//! The top-level `Index`: ties memtable, segments, metapage, and recovery
//! log into the public operations named in spec §6
//! (`build`/`insert`/`scan`/`bulk_delete`/`vacuum_cleanup`/`spill`/`merge`/
//! `dump`), guarded by a single `parking_lot::RwLock` the way the teacher's
//! top-level store wraps its mutable state.

use crate::build;
use crate::compaction::{self, Trigger};
use crate::config::IndexConfig;
use crate::dump::{self, IndexSummary, SegmentSummary};
use crate::error::{Error, Result};
use crate::heap_reader::HeapReader;
use crate::memtable::Memtable;
use crate::merge;
use crate::metapage::MetaPage;
use crate::page::{PageStore, PAGE_SIZE};
use crate::recovery::{self, RecoveryLog};
use crate::scoring::{self, ScoredTerm, TopKHeap};
use crate::segment::{Segment, SegmentLocation};
use crate::tid::Tid;
use crate::tokenizer::Tokenizer;
use parking_lot::RwLock;

/// Page 0 always holds the metapage; every other page belongs to a segment
/// or the recovery log.
const METAPAGE_BLOCK: u32 = 0;

/// Result of [`Index::build`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub heap_tuples: u64,
    pub index_tuples: u64,
}

/// Result of [`Index::bulk_delete`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteStats {
    pub deleted: u64,
}

/// Result of [`Index::vacuum_cleanup`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VacuumStats {
    pub merges_performed: u64,
}

struct IndexInner {
    config: IndexConfig,
    meta: MetaPage,
    memtable: Memtable,
    recovery: RecoveryLog,
    store: Box<dyn PageStore + Send + Sync>,
}

/// An embeddable BM25 index. Cheap to share behind an `Arc`; all mutation
/// goes through a single reader-writer lock (writers exclusive, scans and
/// dumps shared).
pub struct Index {
    inner: RwLock<IndexInner>,
    tokenizer: Box<dyn Tokenizer>,
}

impl Index {
    /// Creates a brand-new, empty index over `store`. `store` must not have
    /// any pages allocated yet; page 0 is reserved for the metapage.
    pub fn create(
        mut store: Box<dyn PageStore + Send + Sync>,
        tokenizer: Box<dyn Tokenizer>,
        config: IndexConfig,
    ) -> Result<Self> {
        if store.page_count() != 0 {
            return Err(Error::misuse("Index::create requires a freshly allocated page store"));
        }
        let page = store.allocate()?;
        debug_assert_eq!(page, METAPAGE_BLOCK);
        let meta = MetaPage::new(config.bm25);
        let mut inner = IndexInner {
            config,
            meta,
            memtable: Memtable::new(),
            recovery: RecoveryLog::new(),
            store,
        };
        inner.persist_meta()?;
        log::info!("created new index");
        Ok(Self {
            inner: RwLock::new(inner),
            tokenizer,
        })
    }

    /// Opens an existing index, replaying its recovery log (if any) through
    /// `heap` and immediately spilling the recovered documents so the
    /// recovery chain can be reset to empty.
    pub fn open(
        store: Box<dyn PageStore + Send + Sync>,
        tokenizer: Box<dyn Tokenizer>,
        config: IndexConfig,
        heap: &dyn HeapReader,
    ) -> Result<Self> {
        let mut first = [0u8; PAGE_SIZE];
        store.read_page(METAPAGE_BLOCK, &mut first)?;
        let meta = MetaPage::decode_from(&mut &first[..])?;

        let mut inner = IndexInner {
            config,
            meta,
            memtable: Memtable::new(),
            recovery: RecoveryLog::new(),
            store,
        };

        if let Some(head) = inner.meta.recovery_head {
            let recovered = recovery::recover_memtable(inner.store.as_ref(), head, heap, tokenizer.as_ref())?;
            if !recovered.is_empty() {
                inner.memtable = recovered;
                inner.spill_locked()?;
            }
            inner.meta.recovery_head = None;
            inner.persist_meta()?;
        }

        log::info!("opened index: {} levels", inner.meta.levels.len());
        Ok(Self {
            inner: RwLock::new(inner),
            tokenizer,
        })
    }

    /// Bulk-builds the index from a full corpus, bypassing the memtable:
    /// tokenizes and writes a single level-0 segment directly.
    pub fn build(&self, docs: &[(Tid, String)]) -> Result<BuildStats> {
        let mut inner = self.inner.write();
        let workers = inner.config.thresholds.max_parallel_workers;
        let loc = build::build_and_write_segment(
            inner.store.as_mut(),
            docs,
            self.tokenizer.as_ref(),
            workers,
            0,
            0,
        )?;
        let segment = Segment::open(inner.store.as_ref(), loc)?;
        let stats = BuildStats {
            heap_tuples: docs.len() as u64,
            index_tuples: segment.num_docs() as u64,
        };
        inner.meta.stats.total_docs += segment.num_docs() as u64;
        inner.meta.stats.total_tokens += segment.total_tokens();
        inner.push_segment(0, loc);
        inner.persist_meta()?;
        log::info!("build: {} heap tuples -> {} index tuples", stats.heap_tuples, stats.index_tuples);
        Ok(stats)
    }

    /// Tokenizes and indexes one document, recording it in the recovery
    /// log before acknowledging. Spills the memtable if it has grown past
    /// the configured threshold. Returns whether the document was new
    /// (always `true` here; the core does not track prior existence).
    pub fn insert(&self, tid: Tid, text: &str) -> Result<bool> {
        let mut inner = self.inner.write();
        let (freqs, length) = self.tokenizer.tokenize(text);
        inner.recovery.append(inner.store.as_mut(), tid)?;
        inner.memtable.insert_doc(tid, freqs, length);
        inner.meta.stats.total_docs += 1;
        inner.meta.stats.total_tokens += length as u64;

        if inner.memtable.estimated_bytes() >= inner.config.thresholds.memtable_spill_bytes {
            inner.spill_locked()?;
        }
        inner.persist_meta()?;
        Ok(true)
    }

    /// Ranked top-`limit` retrieval across the memtable and every segment,
    /// merged into one non-increasing-score ordering (ties by TID
    /// ascending, per spec §6).
    pub fn scan(&self, query_text: &str, limit: usize) -> Result<Vec<(Tid, f32)>> {
        let inner = self.inner.read();
        let (query_freqs, _) = self.tokenizer.tokenize(query_text);
        let terms: Vec<&str> = query_freqs.keys().map(|s| s.as_str()).collect();
        if terms.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let open_segments = inner.open_all_segments()?;
        let total_docs = inner.memtable.doc_count() as u64
            + open_segments.iter().map(|s| s.num_docs() as u64).sum::<u64>();
        let total_tokens = inner.memtable.total_tokens()
            + open_segments.iter().map(|s| s.total_tokens()).sum::<u64>();
        let avg_doc_len = if total_docs == 0 {
            0.0
        } else {
            total_tokens as f64 / total_docs as f64
        };

        let idfs: Vec<f32> = terms
            .iter()
            .map(|term| {
                let df = inner.memtable.doc_freq(term)
                    + open_segments.iter().map(|s| s.doc_freq(term)).sum::<u32>();
                crate::scoring::bm25::idf(total_docs, df)
            })
            .collect();
        let query: Vec<ScoredTerm<'_>> = terms
            .iter()
            .zip(idfs.iter())
            .map(|(&term, &idf)| ScoredTerm { term, idf })
            .collect();

        let mut heap = TopKHeap::new(limit);
        scoring::score_memtable_topk(&inner.memtable, &query, inner.config.bm25, avg_doc_len, &mut heap);
        for segment in &open_segments {
            let lists: Vec<(String, crate::segment::PostingList)> = query
                .iter()
                .filter_map(|q| segment.posting_list(q.term).ok().flatten().map(|l| (q.term.to_string(), l)))
                .collect();
            scoring::score_segment_topk(segment, &lists, &query, inner.config.bm25, avg_doc_len, &mut heap)?;
        }
        Ok(heap.into_sorted_vec())
    }

    /// Removes every currently-indexed document for which `should_delete`
    /// returns `true`. Only the active memtable is affected: once a
    /// document is sealed into a segment the core has no tombstoning path
    /// (spec §1 Non-goals), so deletes of already-spilled rows must wait
    /// for the next merge that rewrites them out (not implemented here).
    pub fn bulk_delete(&self, mut should_delete: impl FnMut(Tid) -> bool) -> Result<DeleteStats> {
        let mut inner = self.inner.write();
        let candidates: Vec<Tid> = inner
            .memtable
            .terms()
            .flat_map(|t| inner.memtable.postings_for_term(t).iter().map(|p| p.tid))
            .collect();
        let mut seen = std::collections::BTreeSet::new();
        let mut deleted = 0u64;
        for tid in candidates {
            if !seen.insert(tid) {
                continue;
            }
            if should_delete(tid) {
                inner.memtable.remove_doc(tid);
                deleted += 1;
            }
        }
        Ok(DeleteStats { deleted })
    }

    /// Runs compaction levels repeatedly until none need it.
    pub fn vacuum_cleanup(&self) -> Result<VacuumStats> {
        let mut inner = self.inner.write();
        let mut merges = 0u64;
        loop {
            let counts = inner.meta.segment_count_per_level();
            match compaction::decide(&counts, &inner.config.thresholds) {
                Trigger::Idle => break,
                Trigger::Compact { level } => {
                    inner.merge_level(level)?;
                    merges += 1;
                }
            }
        }
        inner.persist_meta()?;
        log::info!("vacuum: {merges} merges performed");
        Ok(VacuumStats { merges_performed: merges })
    }

    /// Forces a memtable spill regardless of its size.
    pub fn spill(&self) -> Result<()> {
        let mut inner = self.inner.write();
        inner.spill_locked()?;
        inner.persist_meta()
    }

    /// Forces a compaction of `level` into `level + 1`, regardless of
    /// whether [`compaction::decide`] would currently trigger one.
    pub fn merge(&self, level: u32) -> Result<()> {
        let mut inner = self.inner.write();
        inner.merge_level(level)?;
        inner.persist_meta()
    }

    /// Renders a human-readable summary of the index's current state.
    pub fn dump(&self, full: bool) -> Result<String> {
        let inner = self.inner.read();
        let mut levels = Vec::with_capacity(inner.meta.levels.len());
        for level_segments in &inner.meta.levels {
            let mut summaries = Vec::with_capacity(level_segments.len());
            for loc in level_segments {
                let seg = Segment::open(inner.store.as_ref(), *loc)?;
                summaries.push(SegmentSummary {
                    level: seg.level(),
                    num_docs: seg.num_docs(),
                    num_terms: seg.num_terms(),
                    total_tokens: seg.total_tokens(),
                });
            }
            levels.push(summaries);
        }
        let summary = IndexSummary {
            stats: inner.meta.stats,
            levels,
            memtable_docs: inner.memtable.doc_count(),
            memtable_terms: inner.memtable.term_count(),
            recovery_tid_count: inner.recovery.tid_count(),
        };
        Ok(dump::format_summary(&summary, full))
    }

    /// Number of TIDs sitting in the recovery log, unflushed to a segment.
    /// Callers can use this to decide when to proactively `spill`.
    pub fn recovery_page_count(&self) -> usize {
        self.inner.read().recovery.tid_count()
    }
}

impl IndexInner {
    fn persist_meta(&mut self) -> Result<()> {
        let mut buf = Vec::new();
        self.meta.encode_into(&mut buf)?;
        if buf.len() > PAGE_SIZE {
            return Err(Error::corruption("metapage grew past a single page"));
        }
        let mut page = [0u8; PAGE_SIZE];
        page[..buf.len()].copy_from_slice(&buf);
        self.store.write_page(METAPAGE_BLOCK, &page)
    }

    fn push_segment(&mut self, level: u32, loc: SegmentLocation) {
        let level = level as usize;
        while self.meta.levels.len() <= level {
            self.meta.levels.push(Vec::new());
        }
        self.meta.levels[level].push(loc);
    }

    fn open_all_segments(&self) -> Result<Vec<Segment>> {
        let mut out = Vec::new();
        for level_segments in &self.meta.levels {
            for loc in level_segments {
                out.push(Segment::open(self.store.as_ref(), *loc)?);
            }
        }
        Ok(out)
    }

    fn spill_locked(&mut self) -> Result<()> {
        if self.memtable.is_empty() {
            return Ok(());
        }
        let input = self.memtable.build_input(0, 0);
        let loc = crate::segment::write_segment(self.store.as_mut(), input)?;
        self.push_segment(0, loc);
        self.memtable = Memtable::new();
        self.recovery.reset();
        self.meta.recovery_head = None;
        log::debug!("spilled memtable to a new L0 segment");
        Ok(())
    }

    fn merge_level(&mut self, level: u32) -> Result<()> {
        let level_idx = level as usize;
        if level_idx >= self.meta.levels.len() || self.meta.levels[level_idx].is_empty() {
            return Ok(());
        }
        let locs = std::mem::take(&mut self.meta.levels[level_idx]);
        let segments: Vec<Segment> = locs
            .iter()
            .map(|loc| Segment::open(self.store.as_ref(), *loc))
            .collect::<Result<_>>()?;
        let merged = merge::merge_segments(self.store.as_mut(), &segments, level + 1, 0)?;
        self.push_segment(level + 1, merged);
        log::info!("merged {} L{level} segments into L{}", segments.len(), level + 1);
        Ok(())
    }
}
