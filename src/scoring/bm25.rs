//! The BM25 ranking formula (spec §4.6).
//!
//! ```text
//! idf(t)        = ln(1 + (N - df + 0.5) / (df + 0.5))
//! len_norm(d)   = 1 - b + b * (dl / avgdl)
//! score(t, d)   = idf(t) * (tf * (k1 + 1)) / (tf + k1 * len_norm(d))
//! ```

use crate::config::Bm25Params;

/// Inverse document frequency for a term with document frequency `df`
/// out of `total_docs` documents. Always non-negative for `df <= total_docs`.
pub fn idf(total_docs: u64, df: u32) -> f32 {
    let n = total_docs as f64;
    let df = df as f64;
    (1.0 + (n - df + 0.5) / (df + 0.5)).ln() as f32
}

/// Length-normalization factor for a document of length `doc_len` against
/// a corpus average of `avg_doc_len`.
pub fn len_norm(params: Bm25Params, doc_len: u32, avg_doc_len: f64) -> f32 {
    if avg_doc_len <= 0.0 {
        return 1.0;
    }
    (1.0 - params.b as f64 + params.b as f64 * (doc_len as f64 / avg_doc_len)) as f32
}

/// The BM25 contribution of a single term occurring `tf` times in a
/// document, given that term's precomputed `idf` and the document's
/// length-normalization factor.
pub fn term_score(params: Bm25Params, idf: f32, tf: u32, len_norm: f32) -> f32 {
    idf * (tf as f32 * (params.k1 + 1.0)) / (tf as f32 + params.k1 * len_norm)
}

/// Upper bound on a term's BM25 contribution for any document whose
/// length-normalization is at least `min_len_norm` (i.e. whose document is
/// at most as long as the document `min_len_norm` was computed from):
/// `term_score` is decreasing in `len_norm`, so the bound is realized at
/// the smallest length norm appearing in a block.
pub fn max_term_score(params: Bm25Params, idf: f32, max_tf: u32, min_len_norm: f32) -> f32 {
    term_score(params, idf, max_tf, min_len_norm)
}
