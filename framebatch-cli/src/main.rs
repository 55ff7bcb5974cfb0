//! Framebatch — batch staging and co-registration orchestration CLI.
//!
//! # Usage
//!
//! ```text
//! framebatch run --job <id> --queue <job.yaml> --routine <program>
//!     [--cache-dir <path>] [--temp-dir <path>] [--threads <n>]
//!     [--writeback always|on-success]
//! framebatch status --queue <job.yaml> [--json]
//! framebatch init --frame <name> --source-dir <archive>
//!     [--cache-dir <path>] [--primary YYYYMMDD] [--import-references]
//! ```

mod commands;

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{init::InitArgs, run::RunArgs, status::StatusArgs};
use framebatch_core::WritebackPolicy;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "framebatch",
    version,
    about = "Process batch co-registration jobs against a frame cache",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Process a job's pending items against the frame cache.
    Run(RunArgs),

    /// Show a job file's per-item statuses.
    Status(StatusArgs),

    /// Provision a frame cache from the long-term archive.
    Init(InitArgs),
}

// ---------------------------------------------------------------------------
// Shared WritebackPolicy argument — parsed from CLI strings
// ---------------------------------------------------------------------------

/// Thin wrapper so clap can parse `WritebackPolicy` from CLI args.
#[derive(Debug, Clone, Default)]
pub struct WritebackArg(pub WritebackPolicy);

impl FromStr for WritebackArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "always" => Ok(Self(WritebackPolicy::Always)),
            "on-success" => Ok(Self(WritebackPolicy::OnSuccess)),
            other => Err(format!(
                "unknown write-back policy '{other}'; expected: always, on-success"
            )),
        }
    }
}

impl fmt::Display for WritebackArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            WritebackPolicy::Always => write!(f, "always"),
            WritebackPolicy::OnSuccess => write!(f, "on-success"),
        }
    }
}

impl From<WritebackArg> for WritebackPolicy {
    fn from(arg: WritebackArg) -> Self {
        arg.0
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => args.run(),
        Commands::Status(args) => args.run(),
        Commands::Init(args) => args.run(),
    }
}
