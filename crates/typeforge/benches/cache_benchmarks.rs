//! Retrieval and mining performance benchmarks.
//!
//! Measures indexing and search across corpus sizes, and mining throughput.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::io::Write;
use tempfile::NamedTempFile;
use typeforge::knowledge::{Metadata, RetrievalCache};
use typeforge::{DatasetMiner, MinerConfig};

const WORDS: &[&str] = &[
    "account", "balance", "transaction", "amount", "date", "branch", "card", "visa", "amex",
    "loan", "status", "approved", "pending", "closed", "interest", "rate", "credit", "limit",
    "header", "identifier", "currency", "posting", "value", "finite", "list",
];

/// Generate synthetic snippets with a deterministic word mix.
fn generate_snippets(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            let words: Vec<&str> = (0..12).map(|j| WORDS[(i * 7 + j * 3) % WORDS.len()]).collect();
            format!("Type{}: {}", i, words.join(" "))
        })
        .collect()
}

/// Generate a dataset in the evaluator layout.
fn generate_dataset(rows: usize) -> String {
    let headers = "txn_id,amount,card_type,status,branch_code";
    let mut data = format!("STRING,DOUBLE,STRING,STRING,STRING\n{}\n{}\n", headers, headers);
    for row in 0..rows {
        data.push_str(&format!(
            "T{:06},{:.2},{},{},BR{:02}\n",
            row,
            row as f64 * 1.5,
            ["VISA", "AMEX", "MASTERCARD"][row % 3],
            ["OPEN", "CLOSED"][row % 2],
            row % 30
        ));
    }
    data
}

/// Benchmark indexing corpora of various sizes.
fn bench_add_documents(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_documents");

    for count in [1_000, 10_000].iter() {
        let snippets = generate_snippets(*count);
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::new("docs", count), &snippets, |b, snippets| {
            b.iter(|| {
                let cache = RetrievalCache::new();
                black_box(cache.add_documents("banking", snippets, &Metadata::new()))
            })
        });
    }

    group.finish();
}

/// Benchmark search against indexed corpora.
fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");

    for count in [1_000, 10_000].iter() {
        let cache = RetrievalCache::new();
        cache.add_documents("banking", &generate_snippets(*count), &Metadata::new());

        group.bench_with_input(BenchmarkId::new("docs", count), &cache, |b, cache| {
            b.iter(|| black_box(cache.search("banking", "card type visa amex status", 5)))
        });
    }

    group.finish();
}

/// Benchmark mining datasets of various sizes.
fn bench_mine(c: &mut Criterion) {
    let mut group = c.benchmark_group("mine");

    for rows in [1_000, 5_000].iter() {
        let mut temp = NamedTempFile::with_suffix(".csv").unwrap();
        temp.write_all(generate_dataset(*rows).as_bytes()).unwrap();
        let config = MinerConfig {
            dataset_path: temp.path().to_path_buf(),
            fallback_path: temp.path().to_path_buf(),
            ..MinerConfig::default()
        };
        let miner = DatasetMiner::new(config);

        group.bench_with_input(BenchmarkId::new("rows", rows), &miner, |b, miner| {
            b.iter(|| black_box(miner.mine_knowledge_snippets()))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_add_documents, bench_search, bench_mine);
criterion_main!(benches);
