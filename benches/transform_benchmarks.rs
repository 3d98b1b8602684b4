#![allow(missing_docs)]
//! Benchmarks for rule compilation and record transformation.
//!
//! Uses the fixture rule file and translation tables under `tests/data`, and
//! synthesizes record batches from the fixture MARCXML.

use anyhow::Context;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use marcmap::{
    marcxml, transform, transform_batch_parallel, CompiledRuleSet, CompilerConfig, RawRecord,
    RuleCompiler,
};

const DATA_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data");

fn load_rules() -> anyhow::Result<(String, CompiledRuleSet)> {
    let config = CompilerConfig::default().with_translation_dir(format!("{DATA_DIR}/translations"));
    let text = std::fs::read_to_string(format!("{DATA_DIR}/catalog.rules"))
        .context("reading catalog.rules")?;
    let rules = RuleCompiler::from_config(&config)
        .compile(&text)
        .context("compiling catalog.rules")?;
    Ok((text, rules))
}

/// Repeat the fixture records until there are `count` of them.
fn load_records(count: usize) -> anyhow::Result<Vec<RawRecord>> {
    let xml = std::fs::read_to_string(format!("{DATA_DIR}/records.xml"))
        .context("reading records.xml")?;
    let fixtures = marcxml::parse_collection(&xml)?;
    Ok(fixtures.iter().cycle().take(count).cloned().collect())
}

fn benchmark_compile(c: &mut Criterion) {
    let (text, _) = load_rules().expect("fixture rules");
    let config = CompilerConfig::default().with_translation_dir(format!("{DATA_DIR}/translations"));
    let compiler = RuleCompiler::from_config(&config);

    c.bench_function("compile_catalog_rules", |b| {
        b.iter(|| compiler.compile(black_box(&text)).expect("compiles"));
    });
}

fn benchmark_transform_1k(c: &mut Criterion) {
    let (_, rules) = load_rules().expect("fixture rules");
    let records = load_records(1_000).expect("fixture records");

    c.bench_function("transform_1k_records", |b| {
        b.iter(|| {
            records
                .iter()
                .map(|record| transform(black_box(record), &rules).fields.len())
                .sum::<usize>()
        });
    });
}

fn benchmark_transform_parallel_10k(c: &mut Criterion) {
    let (_, rules) = load_rules().expect("fixture rules");
    let records = load_records(10_000).expect("fixture records");

    c.bench_function("transform_10k_records_parallel", |b| {
        b.iter(|| transform_batch_parallel(black_box(&records), &rules).len());
    });
}

criterion_group!(
    benches,
    benchmark_compile,
    benchmark_transform_1k,
    benchmark_transform_parallel_10k
);
criterion_main!(benches);
