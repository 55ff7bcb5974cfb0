//! `framebatch status` — job file visibility.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use framebatch_core::queue::{JobFile, YamlStore};
use framebatch_core::types::ItemStatus;

/// Arguments for `framebatch status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Path to the YAML job file.
    #[arg(long)]
    pub queue: PathBuf,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let store = YamlStore::open(&self.queue)
            .with_context(|| format!("failed to load job file {}", self.queue.display()))?;
        let report = store.snapshot();

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        print_report(&report);
        Ok(())
    }
}

#[derive(Tabled)]
struct ItemRow {
    #[tabled(rename = "item")]
    id: String,
    #[tabled(rename = "target")]
    target: String,
    #[tabled(rename = "source")]
    source: String,
    #[tabled(rename = "status")]
    status: String,
}

fn print_report(report: &JobFile) {
    println!(
        "Job {} in frame {} (primary {})",
        report.job, report.frame, report.primary_reference
    );
    match (&report.started_at, report.finished) {
        (_, Some(code)) => println!("finished with code {code}"),
        (Some(started), None) => {
            println!("started at {}", started.format("%Y-%m-%d %H:%M:%S UTC"))
        }
        (None, None) => println!("not started"),
    }

    let rows: Vec<ItemRow> = report
        .items
        .iter()
        .map(|item| ItemRow {
            id: item.id.to_string(),
            target: item.target.compact(),
            source: item
                .source
                .map(|source| source.to_string())
                .unwrap_or_else(|| "-".to_owned()),
            status: item
                .status
                .map(|status| status.to_string())
                .unwrap_or_else(|| "pending".to_owned()),
        })
        .collect();
    if rows.is_empty() {
        println!("{}", "no items".dimmed());
        return;
    }
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    let built = report
        .items
        .iter()
        .filter(|item| item.status == Some(ItemStatus::Built))
        .count();
    let pending = report
        .items
        .iter()
        .filter(|item| matches!(item.status, None | Some(ItemStatus::Building)))
        .count();
    let other = report.items.len() - built - pending;
    println!("{built} built, {pending} pending, {other} other");
}
