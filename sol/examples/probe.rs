// SPDX-FileCopyrightText: 2025 2025 Contributors to the Shared Object Loader project.
// SPDX-License-Identifier: Apache-2.0

//! Loads a shared library and prints the address of each requested symbol.
//!
//! ```text
//! RUST_LOG=sol=debug cargo run --example probe -- libc.so.6 printf strlen
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(version, about = "Resolve symbols from a shared library")]
struct Opts {
    /// Path or platform name of the library.
    library: PathBuf,

    /// Symbols to look up.
    symbols: Vec<String>,

    /// Leave the library loaded on exit.
    #[arg(long)]
    keep: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();
    match run(&opts) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(kind = ?err.kind(), "{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(opts: &Opts) -> sol::Result<()> {
    let library = sol::load(&opts.library)?;
    info!(library = %opts.library.display(), "loaded");

    let mut result = Ok(());
    for name in &opts.symbols {
        match sol::resolve(&library, name) {
            Ok(symbol) => println!("{name}\t{:p}", symbol.as_ptr()),
            Err(err) => {
                println!("{name}\t-");
                error!(symbol = %name, "{err}");
                result = Err(err);
            }
        }
    }

    if !opts.keep {
        sol::unload(library)?;
    }
    result
}
