use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tapir_search::block::BlockPosting;
use tapir_search::config::Bm25Params;
use tapir_search::fieldnorm;
use tapir_search::page::MemPageStore;
use tapir_search::scoring::{score_segment_topk, ScoredTerm, TopKHeap};
use tapir_search::segment::{write_segment, Segment, SegmentBuildInput};
use tapir_search::Tid;

fn build_sample_segment(num_docs: u32) -> (MemPageStore, Segment) {
    let mut store = MemPageStore::default();
    let postings: Vec<BlockPosting> = (0..num_docs)
        .map(|i| BlockPosting {
            doc_id: i,
            freq: 1 + (i % 9) as u16,
            fieldnorm: (i % 60) as u8,
        })
        .collect();
    let docs: Vec<(Tid, u32)> = (0..num_docs)
        .map(|i| (Tid::new(i + 1, 0), fieldnorm::decode((i % 60) as u8)))
        .collect();
    let loc = write_segment(
        &mut store,
        SegmentBuildInput {
            level: 0,
            created_at_unix_ms: 0,
            terms: vec![("word".to_string(), postings)],
            docs,
        },
    )
    .unwrap();
    let segment = Segment::open(&store, loc).unwrap();
    (store, segment)
}

fn bench_bmw_topk(c: &mut Criterion) {
    let (_store, segment) = build_sample_segment(20_000);
    let list = segment.posting_list("word").unwrap().unwrap();
    let lists = vec![("word".to_string(), list)];
    let query = vec![ScoredTerm { term: "word", idf: 2.0 }];
    let params = Bm25Params::default();
    let avg_doc_len = segment.avg_doc_len();

    c.bench_function("bmw_topk_20k_docs_k100", |b| {
        b.iter(|| {
            let mut heap = TopKHeap::new(100);
            score_segment_topk(
                black_box(&segment),
                black_box(&lists),
                black_box(&query),
                params,
                avg_doc_len,
                &mut heap,
            )
            .unwrap();
            black_box(heap.into_sorted_vec())
        })
    });
}

criterion_group!(benches, bench_bmw_topk);
criterion_main!(benches);
