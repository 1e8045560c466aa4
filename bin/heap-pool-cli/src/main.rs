// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # heap-pool
//!
//! Command-line driver for the heap pool manager.
//!
//! ## Usage
//! ```bash
//! # Show host and VRAM budgets as a pool would see them
//! heap-pool status
//!
//! # Drive a pool with a random allocate/free workload
//! heap-pool simulate --operations 100000 --threads 4 --budget 1G
//!
//! # Print the effective pool configuration
//! heap-pool config --config ./pool.toml
//! ```

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "heap-pool",
    about = "Budget-aware GPU heap pool manager",
    version,
    author
)]
struct Cli {
    /// Path to a TOML pool configuration file.
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display host and VRAM memory budgets.
    Status,

    /// Run a random allocate/free workload against a simulated pool.
    Simulate {
        /// Allocate or free operations per thread.
        #[arg(short = 'n', long, default_value_t = 10_000)]
        operations: usize,

        /// Worker threads sharing the pool.
        #[arg(short, long, default_value_t = 1)]
        threads: usize,

        /// Seed for the workload generator.
        #[arg(short, long, default_value_t = 42)]
        seed: u64,

        /// Largest region to request (e.g., "4M").
        #[arg(long, default_value = "4M")]
        max_region: String,

        /// Budget limit for segment memory (e.g., "512M"). Unlimited if omitted.
        #[arg(short, long)]
        budget: Option<String>,

        /// Placement strategy, overriding the configuration file.
        #[arg(long)]
        strategy: Option<String>,
    },

    /// Print the effective pool configuration as TOML.
    Config,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    commands::init_tracing(cli.verbose);

    match cli.command {
        Commands::Status => commands::status::execute(),
        Commands::Simulate {
            operations,
            threads,
            seed,
            max_region,
            budget,
            strategy,
        } => commands::simulate::execute(commands::simulate::SimulateArgs {
            config: cli.config,
            operations,
            threads,
            seed,
            max_region,
            budget,
            strategy,
        }),
        Commands::Config => commands::config::execute(cli.config),
    }
}
