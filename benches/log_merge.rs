//! Benchmarks for the log merging hot path.
//!
//! `merge_partitions` measures merging the sorted responses of several partitions, and
//! `process_head` a full cycle over a fixture chain shared by many subscribers.

use std::sync::OnceLock;

use alloy::{
    primitives::{Address, B256},
    rpc::types::Log,
};
use anyhow::Result;
use chain_publisher::{
    ChainPublisher, ChainPublisherBuilder,
    log_filter::merge_uniq_sorted_logs,
    provider_pool::ProviderPoolBuilder,
    storage::MemoryStorage,
    subscriber::{FilterClause, SubscriberSpec},
    test_utils::{CollectingReducer, FixtureProvider, make_log},
};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

static RUNTIME: OnceLock<tokio::runtime::Runtime> = OnceLock::new();

fn get_runtime() -> &'static tokio::runtime::Runtime {
    RUNTIME.get_or_init(|| tokio::runtime::Runtime::new().expect("failed to create tokio runtime"))
}

fn event(i: u64) -> B256 {
    B256::left_padding_from(&i.to_be_bytes())
}

/// `partitions` sorted lists of `per_partition` logs each, interleaved over the same blocks
/// with every fourth log present in two lists.
fn partitions(partitions: u64, per_partition: u64) -> Vec<Vec<Log>> {
    (0..partitions)
        .map(|p| {
            (0..per_partition)
                .map(|i| {
                    let index = if i % 4 == 0 { 0 } else { p };
                    make_log(Address::ZERO, &[event(p)], i, index)
                })
                .collect()
        })
        .collect()
}

fn chain(blocks: u64, events: u64) -> Vec<Log> {
    (0..blocks)
        .flat_map(|block| {
            (0..events).map(move |e| make_log(Address::with_last_byte(1), &[event(e)], block, e))
        })
        .collect()
}

async fn setup_publisher(subscribers: u64, events: u64) -> Result<ChainPublisher> {
    let provider = FixtureProvider::new(chain(1_000, events));
    let pool = ProviderPoolBuilder::new().provider(provider).build().await?;
    let publisher = ChainPublisherBuilder::new()
        .provider_pool(pool)
        .storage(MemoryStorage::new())
        .track_heads(false)
        .build()?;
    for s in 0..subscribers {
        publisher.subscribe(
            SubscriberSpec::new(format!("subscriber-{s}"))
                .filter(FilterClause::new().address(Address::with_last_byte(1)).event(event(s % events)))
                .safe_depth(12)
                .genesis(0)
                .reducer(CollectingReducer::new(format!("subscriber-{s}"))),
        )?;
    }
    Ok(publisher)
}

fn merge_partitions_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_partitions");

    for count in [2, 8, 32] {
        let input = partitions(count, 10_000);
        group.throughput(Throughput::Elements(count * 10_000));
        group.bench_with_input(BenchmarkId::from_parameter(count), &input, |b, input| {
            b.iter(|| merge_uniq_sorted_logs(input.iter().cloned()));
        });
    }

    group.finish();
}

fn process_head_benchmark(c: &mut Criterion) {
    let rt = get_runtime();
    let mut group = c.benchmark_group("process_head");
    group.sample_size(20);

    for subscribers in [1, 10, 100] {
        group.bench_with_input(
            BenchmarkId::from_parameter(subscribers),
            &subscribers,
            |b, &subscribers| {
                b.iter_batched(
                    || {
                        rt.block_on(setup_publisher(subscribers, 4))
                            .expect("failed to set up publisher")
                    },
                    |publisher| {
                        rt.block_on(publisher.process_head(999)).expect("cycle failed");
                    },
                    criterion::BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

criterion_group!(benches, merge_partitions_benchmark, process_head_benchmark);
criterion_main!(benches);
