use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mothwing::core::config::EngineConfig;
use mothwing::{RawDocument, SearchEngine};
use rand::Rng;

const VOCAB: &[&str] = &[
    "search", "engine", "tokenizer", "bitmap", "segment", "fusion", "prefix", "query",
    "document", "vocabulary", "posting", "scoring", "index", "cache", "rank", "candidate",
];

fn create_test_document(key: i64, word_count: usize) -> RawDocument {
    let mut rng = rand::thread_rng();
    let text: String = (0..word_count).map(|_| VOCAB[rng.gen_range(0..VOCAB.len())]).collect::<Vec<_>>().join(" ");
    RawDocument { document_key: key, segment_number: 0, indexed_text: text, client_information: String::new() }
}

fn build_engine(doc_count: usize) -> SearchEngine {
    let engine = SearchEngine::new(EngineConfig::default()).unwrap();
    let docs: Vec<RawDocument> = (0..doc_count).map(|i| create_test_document(i as i64, 30)).collect();
    engine.index(docs).unwrap();
    engine
}

fn bench_search_by_corpus_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("search_corpus_size");

    for doc_count in [100, 1000, 10000].iter() {
        let engine = build_engine(*doc_count);
        group.bench_with_input(BenchmarkId::from_parameter(doc_count), doc_count, |b, _| {
            b.iter(|| engine.search(black_box("search engine"), black_box(10)).unwrap());
        });
    }
    group.finish();
}

fn bench_search_query_shapes(c: &mut Criterion) {
    let engine = build_engine(5000);
    let mut group = c.benchmark_group("search_query_shapes");

    group.bench_function("single_term", |b| {
        b.iter(|| engine.search(black_box("index"), black_box(10)).unwrap());
    });
    group.bench_function("two_terms", |b| {
        b.iter(|| engine.search(black_box("search engine"), black_box(10)).unwrap());
    });
    group.bench_function("prefix", |b| {
        b.iter(|| engine.search(black_box("sea"), black_box(10)).unwrap());
    });
    group.bench_function("rare_miss", |b| {
        b.iter(|| engine.search(black_box("nonexistentterm"), black_box(10)).unwrap());
    });

    group.finish();
}

fn bench_search_top_k(c: &mut Criterion) {
    let engine = build_engine(5000);
    let mut group = c.benchmark_group("search_top_k");

    for k in [5, 25, 100].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(k), k, |b, &k| {
            b.iter(|| engine.search(black_box("search engine document"), black_box(k)).unwrap());
        });
    }
    group.finish();
}

fn bench_cached_vs_cold(c: &mut Criterion) {
    let engine = build_engine(5000);
    let mut group = c.benchmark_group("search_cache");

    group.bench_function("cold", |b| {
        b.iter(|| engine.search(black_box("fusion candidate"), black_box(10)).unwrap());
    });

    engine.search("rank prefix", 10).unwrap();
    group.bench_function("warm", |b| {
        b.iter(|| engine.search(black_box("rank prefix"), black_box(10)).unwrap());
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_search_by_corpus_size,
    bench_search_query_shapes,
    bench_search_top_k,
    bench_cached_vs_cold
);
criterion_main!(benches);
