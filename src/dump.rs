//! Human-readable index dump, the data behind `tapir dump` (spec §4.10,
//! grounded on `dump.c`'s summary/full-detail split).

use crate::metapage::CorpusStats;

/// Per-segment facts shown in a dump.
#[derive(Debug, Clone)]
pub struct SegmentSummary {
    pub level: u32,
    pub num_docs: u32,
    pub num_terms: u32,
    pub total_tokens: u64,
}

/// Everything [`format_summary`] needs, gathered by the caller (usually
/// `Index::dump`) from the metapage, memtable, and recovery log.
#[derive(Debug, Clone)]
pub struct IndexSummary {
    pub stats: CorpusStats,
    pub levels: Vec<Vec<SegmentSummary>>,
    pub memtable_docs: usize,
    pub memtable_terms: usize,
    pub recovery_tid_count: usize,
}

/// Caps how many per-segment lines a summary dump prints per level before
/// collapsing the rest into a count, matching the host dump's
/// summary/full-detail distinction.
const MAX_SEGMENTS_SHOWN_PER_LEVEL: usize = 10;

pub fn format_summary(summary: &IndexSummary, full: bool) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "corpus: {} docs, {} tokens, avg_doc_len={:.2}\n",
        summary.stats.total_docs,
        summary.stats.total_tokens,
        summary.stats.avg_doc_len()
    ));
    out.push_str(&format!(
        "memtable: {} docs, {} terms\n",
        summary.memtable_docs, summary.memtable_terms
    ));
    out.push_str(&format!("recovery log: {} tids pending checkpoint\n", summary.recovery_tid_count));

    for (level, segments) in summary.levels.iter().enumerate() {
        out.push_str(&format!("L{level}: {} segments\n", segments.len()));
        let shown = if full {
            segments.len()
        } else {
            segments.len().min(MAX_SEGMENTS_SHOWN_PER_LEVEL)
        };
        for seg in &segments[..shown] {
            out.push_str(&format!(
                "  docs={} terms={} tokens={}\n",
                seg.num_docs, seg.num_terms, seg.total_tokens
            ));
        }
        if shown < segments.len() {
            out.push_str(&format!("  ... {} more\n", segments.len() - shown));
        }
    }
    out
}
