// SPDX-FileCopyrightText: 2026 Patchbay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Patchbay - a pluggable message bus node.
//!
//! This is the binary entry point for the Patchbay host process.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use clap::{Parser, Subcommand};

mod serve;

/// Patchbay - a pluggable message bus node.
#[derive(Parser, Debug)]
#[command(name = "patchbay", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the Patchbay node.
    Serve,
    /// Inspect Patchbay configuration.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the effective merged configuration as TOML.
    Show,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup.
    let config = match patchbay_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            patchbay_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                tracing::error!(error = %e, "patchbay serve failed");
                std::process::exit(1);
            }
        }
        Some(Commands::Config {
            command: ConfigCommands::Show,
        }) => match toml::to_string_pretty(&config) {
            Ok(rendered) => print!("{rendered}"),
            Err(e) => {
                eprintln!("error: cannot render configuration: {e}");
                std::process::exit(1);
            }
        },
        None => {
            println!("patchbay: use --help for available commands");
        }
    }
}
