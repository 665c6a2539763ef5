//! Write-path and query-path benchmarks.
//!
//! # Benchmarks
//!
//! - `canonicalize`: hashing a tagged item on the interactive add path
//! - `compile_filters`: validating and rendering a full filter object
//! - `import_chunked`: bulk import of raw items through the chunked pipeline
//! - `query_hybrid`: fused lexical/semantic query over a populated table
//!
//! # Running
//!
//! ```bash
//! cargo bench --bench canonical_benchmark --features lex
//! ```

use std::hint::black_box;

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use membank_core::{
    Membank, MembankConfig, NewMemory, QueryRequest, RawItem, canonicalize, compile_filters,
};
use serde_json::json;

const TOPICS: [&str; 5] = [
    "machine learning neural networks",
    "python programming development",
    "machine learning with python",
    "rust systems programming",
    "web development javascript",
];

fn raw_items(count: usize) -> Vec<RawItem> {
    (0..count)
        .map(|i| RawItem {
            id: format!("id-{i}"),
            hash: format!("hash-{i}"),
            content: format!("Document {i} about {}", TOPICS[i % TOPICS.len()]),
            project: Some("bench".into()),
            repo: None,
            rel_path: None,
            kind: Some("note".into()),
            scope: None,
            tags: Some(vec!["bench".into()]),
            pinned: false,
            created_at: None,
            updated_at: None,
            ttl_sec: None,
        })
        .collect()
}

fn bench_canonicalize(c: &mut Criterion) {
    let item = NewMemory::new("Document about rust systems programming")
        .kind("note")
        .project("bench")
        .repo("membank")
        .rel_path("docs/notes.md")
        .tags(["Rust", "storage", "hashing", "b-tree"]);

    c.bench_function("canonicalize", |b| {
        b.iter(|| canonicalize(black_box(&item)));
    });
}

fn bench_compile_filters(c: &mut Criterion) {
    let filters = json!({
        "project": "o'brien",
        "repo": "membank",
        "kind": "note",
        "pinned": true,
        "after": "2024-01-01",
        "before": "2024-12-31T23:59:59Z",
        "tags_any": ["rust", "storage", "it's"],
    });

    c.bench_function("compile_filters", |b| {
        b.iter(|| compile_filters(black_box(Some(&filters))).unwrap());
    });
}

fn bench_import(c: &mut Criterion) {
    let config = MembankConfig::default()
        .embedding_enabled(false)
        .import_chunk_size(256);

    c.bench_function("import_chunked", |b| {
        b.iter_batched(
            || (Membank::open(config.clone()).unwrap(), raw_items(2_000)),
            |(bank, items)| bank.import_raw_items(items).unwrap(),
            BatchSize::LargeInput,
        );
    });
}

fn bench_query(c: &mut Criterion) {
    let bank = Membank::open(MembankConfig::default()).unwrap();
    bank.import_raw_items(raw_items(1_000)).unwrap();

    c.bench_function("query_hybrid", |b| {
        b.iter(|| {
            bank.query(black_box(
                &QueryRequest::new("machine learning")
                    .limit(10)
                    .filters(json!({"project": "bench"})),
            ))
            .unwrap()
        });
    });
}

criterion_group!(
    benches,
    bench_canonicalize,
    bench_compile_filters,
    bench_import,
    bench_query
);
criterion_main!(benches);
