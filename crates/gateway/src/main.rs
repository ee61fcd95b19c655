// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;

use ussdgw::config::Config;

#[tokio::main]
async fn main() {
    let config = Config::parse();

    // Logging comes up inside `run`; a failure here may predate it.
    if let Err(e) = ussdgw::run(config).await {
        eprintln!("ussdgw: fatal: {e:#}");
        std::process::exit(1);
    }
}
