// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for allocation and free through the pool.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use heap_pool::{
    AllocationRequest, FixedBudget, HeapPool, HostSegmentFactory, PoolConfig, PoolCore,
};
use std::sync::Arc;

fn core(strategy: &str) -> PoolCore {
    let config = PoolConfig {
        minimum_allocator_count: 4,
        strategy: strategy.to_string(),
        ..Default::default()
    };
    PoolCore::new(
        &config,
        Arc::new(HostSegmentFactory::new()),
        Arc::new(FixedBudget::unlimited()),
    )
    .unwrap()
}

fn bench_allocate_free(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocate_free");
    for strategy in ["free-list", "linear"] {
        let mut pool = core(strategy);
        let request = AllocationRequest::new(64 * 1024, 256);
        group.bench_with_input(BenchmarkId::from_parameter(strategy), &request, |b, &request| {
            b.iter(|| {
                let region = pool.try_allocate(black_box(request)).unwrap().unwrap();
                pool.free(region).unwrap();
            })
        });
    }
    group.finish();
}

fn bench_fragmented_search(c: &mut Criterion) {
    let mut pool = core("free-list");
    // Fill the allocators with alternating live and freed regions.
    let mut keep = Vec::new();
    let mut release = Vec::new();
    for i in 0..2048 {
        let region = pool
            .try_allocate(AllocationRequest::new(64 * 1024, 256))
            .unwrap()
            .unwrap();
        if i % 2 == 0 {
            keep.push(region);
        } else {
            release.push(region);
        }
    }
    for region in release {
        pool.free(region).unwrap();
    }

    c.bench_function("fragmented_search", |b| {
        b.iter(|| {
            let region = pool
                .try_allocate(black_box(AllocationRequest::new(48 * 1024, 256)))
                .unwrap()
                .unwrap();
            pool.free(region).unwrap();
        })
    });
    for region in keep {
        pool.free(region).unwrap();
    }
}

fn bench_batch(c: &mut Criterion) {
    let mut pool = core("free-list");
    c.bench_function("allocate_many_64", |b| {
        b.iter(|| {
            let batch = pool
                .try_allocate_many(black_box(AllocationRequest::new(16 * 1024, 256)), 64)
                .unwrap()
                .unwrap();
            for region in batch {
                pool.free(region).unwrap();
            }
        })
    });
}

fn bench_locked_pool(c: &mut Criterion) {
    let pool = HeapPool::from_core(core("free-list"));
    c.bench_function("locked_allocate_free", |b| {
        b.iter(|| {
            let region = pool
                .try_allocate(black_box(AllocationRequest::new(64 * 1024, 256)))
                .unwrap()
                .unwrap();
            pool.free(region).unwrap();
        })
    });
}

criterion_group!(
    benches,
    bench_allocate_free,
    bench_fragmented_search,
    bench_batch,
    bench_locked_pool
);
criterion_main!(benches);
