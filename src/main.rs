// Copyright 2026 Unspool Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

mod cli;

use cli::CaptureFlags;

#[derive(Parser)]
#[command(
    name = "unspool",
    about = "Unspool — convergence-driven scraper for lazily-loaded comment threads",
    version,
    after_help = "Run 'unspool <command> --help' for details on each command."
)]
struct Cli {
    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture one URL's comment thread
    Scrape {
        /// URL to capture
        url: String,
        /// Output JSON path (default: unspool-<host>-<timestamp>.json)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Also flatten to row-per-comment CSV at this path
        #[arg(long)]
        csv: Option<PathBuf>,
        #[command(flatten)]
        flags: CaptureFlags,
    },
    /// Capture every URL in a list (text file or CSV with a 'url' column)
    Batch {
        /// URL list file
        file: PathBuf,
        /// Output JSON path, also used for periodic progress snapshots
        #[arg(long, default_value = "captures.json")]
        out: PathBuf,
        /// Also flatten to row-per-comment CSV at this path
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Persist progress every N URLs
        #[arg(long, default_value_t = 5)]
        snapshot_every: usize,
        /// Minimum pause between URLs, in seconds
        #[arg(long, default_value_t = 10.0)]
        pause_min: f64,
        /// Maximum pause between URLs, in seconds
        #[arg(long, default_value_t = 20.0)]
        pause_max: f64,
        #[command(flatten)]
        flags: CaptureFlags,
    },
    /// Run extraction over a saved HTML snapshot (no browser)
    Extract {
        /// Saved HTML file
        file: PathBuf,
    },
    /// Flatten a captured JSON file to CSV
    Export {
        /// Capture JSON produced by scrape/batch
        captures: PathBuf,
        /// CSV output path
        out: PathBuf,
    },
    /// Check Chromium discovery and output-path writability
    Doctor,
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default_directive = if quiet {
        "unspool=error"
    } else if verbose {
        "unspool=debug"
    } else {
        "unspool=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(default_directive.parse().expect("directive is valid")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Scrape {
            url,
            out,
            csv,
            flags,
        } => cli::scrape_cmd::run(&url, out, csv, &flags).await,
        Commands::Batch {
            file,
            out,
            csv,
            snapshot_every,
            pause_min,
            pause_max,
            flags,
        } => {
            cli::batch_cmd::run(file, out, csv, &flags, snapshot_every, pause_min, pause_max)
                .await
        }
        Commands::Extract { file } => cli::extract_cmd::run(&file).await,
        Commands::Export { captures, out } => cli::export_cmd::run(&captures, &out),
        Commands::Doctor => cli::doctor::run().await,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "unspool", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
