// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Property tests for pool accounting invariants.
//!
//! Arbitrary sequences of allocations, frees, floor changes and budget
//! pressure are applied to one pool; after every step the pool's counters
//! must agree with its allocators and with the segment factory.

use heap_pool::{
    AllocationFlags, AllocationRequest, ByteSize, HostSegmentFactory, ManualBudget, PoolConfig,
    PoolCore, Region,
};
use proptest::prelude::*;
use std::sync::Arc;

const MIB: u64 = 1024 * 1024;
const BUDGET_LIMIT: u64 = 1024 * MIB;

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Op {
    Allocate {
        byte_length: u64,
        alignment_shift: u32,
        flags: u8,
    },
    Free {
        index: usize,
    },
    SetMinimum {
        mib: u64,
    },
    Pressure(bool),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        5 => (1u64..=12 * MIB, 0u32..=16, 0u8..8).prop_map(|(byte_length, alignment_shift, flags)| {
            Op::Allocate { byte_length, alignment_shift, flags }
        }),
        4 => any::<usize>().prop_map(|index| Op::Free { index }),
        1 => (0u64..=96).prop_map(|mib| Op::SetMinimum { mib }),
        1 => any::<bool>().prop_map(Op::Pressure),
    ]
}

fn flags(selector: u8) -> AllocationFlags {
    match selector {
        1 => AllocationFlags::DEDICATED_ALLOCATOR,
        2 => AllocationFlags::EXISTING_ALLOCATOR_ONLY,
        3 => AllocationFlags::CAN_EXCEED_BUDGET,
        4 => AllocationFlags::DEDICATED_ALLOCATOR | AllocationFlags::CAN_EXCEED_BUDGET,
        _ => AllocationFlags::empty(),
    }
}

// ---------------------------------------------------------------------------
// Invariants
// ---------------------------------------------------------------------------

fn check(
    core: &PoolCore,
    segments: &HostSegmentFactory,
    live: &[Region],
    config: &PoolConfig,
) -> Result<(), TestCaseError> {
    let stats = core.stats();

    let total: u64 = stats.allocators.iter().map(|a| a.byte_length).sum();
    let free: u64 = stats
        .allocators
        .iter()
        .map(|a| a.total_free_region_byte_length)
        .sum();
    prop_assert_eq!(core.total_byte_length(), total);
    prop_assert_eq!(core.total_free_region_byte_length(), free);
    prop_assert!(free <= total);
    prop_assert_eq!(segments.live_bytes(), total);

    let live_bytes: u64 = live.iter().map(Region::byte_length).sum();
    if config.strategy == "linear" {
        // Alignment padding behind the cursor stays consumed until it rewinds.
        prop_assert!(stats.used_byte_length() >= live_bytes);
        if live.is_empty() {
            prop_assert_eq!(stats.used_byte_length(), 0);
        }
    } else {
        prop_assert_eq!(stats.used_byte_length(), live_bytes);
    }

    prop_assert!(stats.allocator_count() <= config.maximum_allocator_count);
    prop_assert!(stats.allocator_count() >= config.minimum_allocator_count);
    prop_assert!(core.total_byte_length() >= core.minimum_byte_length());

    let cached: Vec<_> = stats.allocators.iter().filter(|a| a.is_cached_empty).collect();
    prop_assert!(cached.len() <= 1);
    for allocator in cached {
        prop_assert_eq!(allocator.total_free_region_byte_length, allocator.byte_length);
    }

    for (i, a) in live.iter().enumerate() {
        prop_assert!(a.offset() + a.byte_length() <= a.segment().byte_length);
        for b in &live[i + 1..] {
            if a.segment() == b.segment() {
                let disjoint = a.offset() + a.byte_length() <= b.offset()
                    || b.offset() + b.byte_length() <= a.offset();
                prop_assert!(disjoint, "overlapping regions {:?} and {:?}", a, b);
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Property: accounting holds after every operation
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn pool_accounting_holds_under_arbitrary_ops(
        minimum_allocator_count in 0usize..3,
        extra_allocators in 1usize..6,
        linear in any::<bool>(),
        ops in proptest::collection::vec(op(), 1..60),
    ) {
        let config = PoolConfig {
            minimum_allocator_count,
            maximum_allocator_count: minimum_allocator_count + extra_allocators,
            maximum_shared_allocator_byte_length: ByteSize::from_mib(16),
            minimum_allocator_byte_length: ByteSize::from_mib(1),
            strategy: if linear { "linear" } else { "free-list" }.to_string(),
            ..Default::default()
        };
        let segments = Arc::new(HostSegmentFactory::new());
        let budget = Arc::new(ManualBudget::new(0, BUDGET_LIMIT));
        let mut core = PoolCore::new(&config, segments.clone(), budget.clone()).unwrap();
        let mut live: Vec<Region> = Vec::new();
        let mut operations = core.operation_count();

        check(&core, &segments, &live, &config)?;

        for op in ops {
            match op {
                Op::Allocate { byte_length, alignment_shift, flags: selector } => {
                    let alignment = 1u64 << alignment_shift;
                    let request = AllocationRequest::new(byte_length, alignment)
                        .with_flags(flags(selector));
                    if let Some(region) = core.try_allocate(request).unwrap() {
                        prop_assert_eq!(region.offset() % alignment, 0);
                        prop_assert_eq!(region.byte_length(), byte_length);
                        live.push(region);
                    }
                }
                Op::Free { index } => {
                    if !live.is_empty() {
                        let region = live.swap_remove(index % live.len());
                        core.free(region).unwrap();
                    }
                }
                Op::SetMinimum { mib } => {
                    let before = core.minimum_byte_length();
                    if !core.try_set_minimum_byte_length(mib * MIB) {
                        prop_assert_eq!(core.minimum_byte_length(), before);
                    }
                }
                Op::Pressure(over) => {
                    budget.set_usage(if over { BUDGET_LIMIT } else { 0 });
                }
            }

            prop_assert!(core.operation_count() >= operations);
            operations = core.operation_count();
            check(&core, &segments, &live, &config)?;
        }

        for region in live.drain(..) {
            core.free(region).unwrap();
        }
        prop_assert_eq!(core.total_free_region_byte_length(), core.total_byte_length());
        check(&core, &segments, &live, &config)?;

        drop(core);
        prop_assert_eq!(segments.live_segments(), 0);
    }

    #[test]
    fn failed_batch_leaves_pool_unchanged(
        preallocated in proptest::collection::vec(1u64..=4 * MIB, 0..6),
        byte_length in 1u64..=8 * MIB,
        count in 1usize..40,
    ) {
        let config = PoolConfig {
            minimum_allocator_count: 1,
            maximum_allocator_count: 3,
            maximum_shared_allocator_byte_length: ByteSize::from_mib(16),
            minimum_allocator_byte_length: ByteSize::from_mib(1),
            ..Default::default()
        };
        let segments = Arc::new(HostSegmentFactory::new());
        let budget = Arc::new(ManualBudget::new(0, BUDGET_LIMIT));
        let mut core = PoolCore::new(&config, segments.clone(), budget).unwrap();

        let mut live = Vec::new();
        for len in preallocated {
            if let Some(region) = core.try_allocate(AllocationRequest::new(len, 256)).unwrap() {
                live.push(region);
            }
        }
        let before = core.stats();
        let created = segments.created_segments();

        match core.try_allocate_many(AllocationRequest::new(byte_length, 256), count).unwrap() {
            Some(batch) => {
                prop_assert_eq!(batch.len(), count);
                prop_assert_eq!(core.operation_count(), before.operation_count + count as u64);
                live.extend(batch);
            }
            None => {
                let after = core.stats();
                prop_assert_eq!(after.total_byte_length, before.total_byte_length);
                prop_assert_eq!(
                    after.total_free_region_byte_length,
                    before.total_free_region_byte_length
                );
                prop_assert_eq!(after.operation_count, before.operation_count);
                prop_assert_eq!(after.allocator_count(), before.allocator_count());
                prop_assert_eq!(segments.live_bytes(), before.total_byte_length);
                prop_assert!(segments.created_segments() >= created);
            }
        }
        check(&core, &segments, &live, &config)?;
    }
}
