// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `heap-pool config` command: print the effective configuration.

use std::path::PathBuf;

pub fn execute(config: Option<PathBuf>) -> anyhow::Result<()> {
    let config = super::load_config(config.as_deref())?;
    config.create_strategy()?;
    print!("{}", config.to_toml()?);
    Ok(())
}
