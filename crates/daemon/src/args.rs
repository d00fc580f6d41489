// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command-line arguments for rulerund

use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "rulerund", version, about = "Rule engine daemon")]
pub struct Args {
    /// Read configuration from PATH instead of the default location
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    pub check_config: bool,
}
