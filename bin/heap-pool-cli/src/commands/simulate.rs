// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `heap-pool simulate` command: drive a pool with a random workload.
//!
//! Segments come from a [`HostSegmentFactory`], so the run needs no GPU.
//! With `--budget`, the budget oracle reports the factory's live bytes
//! against the given limit, which exercises the over-budget paths.

use anyhow::Context;
use heap_pool::{
    AllocationFlags, AllocationRequest, Budget, BudgetOracle, ByteSize, FixedBudget, HeapPool,
    HostSegmentFactory, Region,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Alignments drawn by the workload, matching common resource placements.
const ALIGNMENTS: [u64; 4] = [256, 4096, 64 * 1024, 4 * 1024 * 1024];

/// One in this many allocations asks for a dedicated allocator.
const DEDICATED_ONE_IN: u32 = 64;

pub struct SimulateArgs {
    pub config: Option<PathBuf>,
    pub operations: usize,
    pub threads: usize,
    pub seed: u64,
    pub max_region: String,
    pub budget: Option<String>,
    pub strategy: Option<String>,
}

/// Per-thread workload counters.
#[derive(Debug, Default)]
struct WorkerReport {
    allocated: u64,
    refused: u64,
    freed: u64,
    peak_live: usize,
}

pub fn execute(args: SimulateArgs) -> anyhow::Result<()> {
    let mut config = super::load_config(args.config.as_deref())?;
    if let Some(strategy) = args.strategy {
        config.strategy = strategy;
    }
    let max_region = ByteSize::parse(&args.max_region)
        .context("invalid --max-region")?
        .as_bytes();
    anyhow::ensure!(max_region > 0, "--max-region must be non-zero");
    anyhow::ensure!(args.threads > 0, "--threads must be at least 1");

    let segments = Arc::new(HostSegmentFactory::new());
    let budget: Arc<dyn BudgetOracle> = match args.budget {
        Some(limit) => {
            let limit = ByteSize::parse(&limit).context("invalid --budget")?.as_bytes();
            let tracked = Arc::clone(&segments);
            Arc::new(move || Budget::new(tracked.live_bytes(), limit))
        }
        None => Arc::new(FixedBudget::unlimited()),
    };

    let pool = HeapPool::new(&config, segments.clone(), budget)?;
    tracing::info!(
        "simulating {} operations on {} threads (seed {}, strategy {})",
        args.operations,
        args.threads,
        args.seed,
        config.strategy
    );

    let start = Instant::now();
    let reports = std::thread::scope(|scope| {
        let workers: Vec<_> = (0..args.threads)
            .map(|index| {
                let pool = &pool;
                let seed = args.seed.wrapping_add(index as u64);
                scope.spawn(move || run_worker(pool, seed, args.operations, max_region))
            })
            .collect();
        workers
            .into_iter()
            .map(|worker| {
                worker
                    .join()
                    .map_err(|_| anyhow::anyhow!("simulation worker panicked"))?
            })
            .collect::<anyhow::Result<Vec<_>>>()
    })?;
    let elapsed = start.elapsed();

    let stats = pool.stats();
    println!("Simulation finished in {:.2?}", elapsed);
    for (index, report) in reports.iter().enumerate() {
        println!(
            "  worker {index}: {} allocated, {} refused, {} freed, peak {} live",
            report.allocated, report.refused, report.freed, report.peak_live
        );
    }
    println!();
    println!("{}", pool.allocation_stats().summary());
    println!("{}", stats.summary());
    println!(
        "Segments: {} live ({:.2} MB), {} created",
        segments.live_segments(),
        segments.live_bytes() as f64 / (1024.0 * 1024.0),
        segments.created_segments()
    );
    Ok(())
}

fn run_worker(
    pool: &HeapPool,
    seed: u64,
    operations: usize,
    max_region: u64,
) -> anyhow::Result<WorkerReport> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut live: Vec<Region> = Vec::new();
    let mut report = WorkerReport::default();

    for _ in 0..operations {
        if live.is_empty() || rng.random_bool(0.55) {
            let byte_length = rng.random_range(1..=max_region);
            let byte_alignment = ALIGNMENTS[rng.random_range(0..ALIGNMENTS.len())];
            let mut request = AllocationRequest::new(byte_length, byte_alignment);
            if rng.random_ratio(1, DEDICATED_ONE_IN) {
                request = request.with_flags(AllocationFlags::DEDICATED_ALLOCATOR);
            }
            match pool.try_allocate(request)? {
                Some(region) => {
                    live.push(region);
                    report.allocated += 1;
                    report.peak_live = report.peak_live.max(live.len());
                }
                None => report.refused += 1,
            }
        } else {
            let index = rng.random_range(0..live.len());
            pool.free(live.swap_remove(index))?;
            report.freed += 1;
        }
    }

    for region in live.drain(..) {
        pool.free(region)?;
        report.freed += 1;
    }
    Ok(report)
}
