//! Benchmarks for key hashing, partitioning and load planning.

#[path = "../src/test_support.rs"]
mod test_support;

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use partload::config::PipelineConfig;
use partload::hash::fnv1a_str;
use partload::normalize::normalize;
use partload::partition::Partitioner;
use partload::pipeline::LoadPipeline;
use partload::store::MemoryStore;
use std::hint::black_box;
use std::time::Duration;
use test_support::generate_corpus;

// =============================================================================
// KEY BENCHMARKS
// =============================================================================

fn bench_hash_and_normalize(c: &mut Criterion) {
    let keys: Vec<String> = (0..10_000)
        .map(|idx| format!("Category {idx} & Friends (Downtown)"))
        .collect();

    let mut group = c.benchmark_group("keys");
    group.throughput(Throughput::Elements(keys.len() as u64));
    group.bench_function("fnv1a", |b| {
        b.iter(|| {
            for key in &keys {
                black_box(fnv1a_str(black_box(key)));
            }
        })
    });
    group.bench_function("normalize", |b| {
        b.iter(|| {
            for key in &keys {
                black_box(normalize(black_box(key)));
            }
        })
    });
    group.finish();
}

fn bench_partition_all(c: &mut Criterion) {
    let keys: Vec<String> = (0..50_000).map(|idx| format!("key-{idx}")).collect();

    let mut group = c.benchmark_group("partition_all");
    group.throughput(Throughput::Elements(keys.len() as u64));
    for &count in &[10_usize, 64, 256] {
        let partitioner = Partitioner::new(count).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(count), &keys, |b, keys| {
            b.iter(|| black_box(partitioner.partition_all(keys)))
        });
    }
    group.finish();
}

// =============================================================================
// PIPELINE BENCHMARKS
// =============================================================================

fn bench_plan_and_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.sample_size(20);
    group.warm_up_time(Duration::from_millis(500));

    for &record_count in &[1_000_usize, 10_000] {
        let records = generate_corpus(record_count, 7);
        group.throughput(Throughput::Elements(record_count as u64));

        group.bench_with_input(BenchmarkId::new("plan", record_count), &records, |b, records| {
            let pipeline = LoadPipeline::new(PipelineConfig::default(), MemoryStore::new());
            b.iter(|| black_box(pipeline.plan(records)))
        });

        for parallel in [false, true] {
            let label = if parallel { "load_parallel" } else { "load_sequential" };
            group.bench_with_input(BenchmarkId::new(label, record_count), &records, |b, records| {
                b.iter_batched(
                    || {
                        let config = PipelineConfig::default().parallel_build(parallel);
                        LoadPipeline::new(config, MemoryStore::new())
                    },
                    |mut pipeline| black_box(pipeline.run(records).unwrap()),
                    BatchSize::SmallInput,
                )
            });
        }
    }
    group.finish();
}

criterion_group!(key_benches, bench_hash_and_normalize, bench_partition_all);

criterion_group!(pipeline_benches, bench_plan_and_load);

criterion_main!(key_benches, pipeline_benches);
