// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `heap-pool status` command: display the memory budgets a pool would see.
//!
//! Host memory comes from `/proc/meminfo`; VRAM from the amdgpu sysfs
//! counters. Machines without a supported GPU show the host section only.

use heap_pool::{BudgetOracle, SystemMemoryBudget, VramBudget};

const MB: f64 = 1024.0 * 1024.0;

pub fn execute() -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║              heap-pool · Memory Budgets              ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let snapshot = budget_monitor::snapshot()?;

    // ── Host ───────────────────────────────────────────────────
    println!("  Host (upload / readback heaps)");
    let total = snapshot.host.total_mb();
    let avail = snapshot.host.available_mb();
    let bar = usage_bar(snapshot.host.utilisation());
    println!("   Total:        {total} MB");
    println!("   Available:    {avail} MB");
    println!(
        "   Used:         {} MB ({:.1}%)  {bar}",
        total - avail,
        snapshot.host.utilisation() * 100.0
    );
    let host = SystemMemoryBudget.query_budget();
    println!(
        "   Budget:       {:.0} of {:.0} MB, {:.0} MB to grow",
        host.usage_bytes as f64 / MB,
        host.limit_bytes as f64 / MB,
        host.available_bytes() as f64 / MB,
    );
    println!();

    // ── Device ─────────────────────────────────────────────────
    println!("  Device (default heaps)");
    match &snapshot.vram {
        Some(vram) => {
            let bar = usage_bar(vram.utilisation());
            println!("   Device:       {}", vram.device.display());
            println!("   Total:        {} MB", vram.total_mb());
            println!(
                "   Used:         {} MB ({:.1}%)  {bar}",
                vram.used_mb(),
                vram.utilisation() * 100.0
            );
            let device = VramBudget::new().query_budget();
            println!(
                "   Budget:       {:.0} MB to grow",
                device.available_bytes() as f64 / MB
            );
        }
        None => println!("   No VRAM counters found; default heaps are not budget-gated"),
    }
    println!();

    println!("  Assessment");
    if snapshot.is_memory_constrained() {
        println!("   Status:       MEMORY CONSTRAINED");
        println!("   Pools may refuse to grow; existing allocators still serve requests.");
    } else {
        println!("   Status:       Room to grow");
    }
    println!();
    println!("{}", snapshot.summary());

    Ok(())
}

/// Creates a visual usage bar (0.0-1.0 scale).
fn usage_bar(ratio: f64) -> String {
    let filled = (ratio * 20.0).round() as usize;
    let filled = filled.min(20);
    let empty = 20 - filled;
    let symbol = if ratio >= 0.9 {
        "#"
    } else if ratio >= 0.7 {
        "="
    } else {
        "-"
    };
    format!("[{}{}]", symbol.repeat(filled), ".".repeat(empty))
}
