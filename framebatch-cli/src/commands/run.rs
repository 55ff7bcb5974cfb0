//! `framebatch run` — process a job's pending items.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use framebatch_core::config::{SCHEDULER_JOB_VAR, TEMP_ROOT_VAR};
use framebatch_core::queue::YamlStore;
use framebatch_core::types::{ItemStatus, JobId};
use framebatch_core::Settings;
use framebatch_runner::{CommandRoutine, LogReporter, Orchestrator};

use crate::WritebackArg;

/// Arguments for `framebatch run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Job id to process; must match the job file.
    #[arg(long)]
    pub job: u32,

    /// Path to the YAML job file.
    #[arg(long)]
    pub queue: PathBuf,

    /// External co-registration program invoked per item.
    #[arg(long)]
    pub routine: PathBuf,

    /// Cache root (defaults to $BATCH_CACHE_DIR).
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Staging root (defaults to $BATCH_TEMP_DIR, then the system temp dir).
    #[arg(long)]
    pub temp_dir: Option<PathBuf>,

    /// Thread budget handed to the routine.
    #[arg(long)]
    pub threads: Option<usize>,

    /// Write-back policy: always | on-success.
    #[arg(long, default_value = "always")]
    pub writeback: WritebackArg,
}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        let mut settings = match self.cache_dir {
            Some(dir) => Settings::new(dir),
            None => Settings::from_env().context("cache root not configured")?,
        };
        // Explicit --cache-dir skips from_env; the temp root and scheduler
        // id from the environment still apply.
        if let Some(temp) = self.temp_dir {
            settings.temp_root = temp;
        } else if let Some(temp) = std::env::var_os(TEMP_ROOT_VAR) {
            settings.temp_root = PathBuf::from(temp);
        }
        if let Some(threads) = self.threads {
            settings.threads = threads;
        }
        if settings.scheduler_job_id.is_none() {
            settings.scheduler_job_id = std::env::var(SCHEDULER_JOB_VAR).ok();
        }
        settings.writeback = self.writeback.into();

        let store = YamlStore::open(&self.queue)
            .with_context(|| format!("failed to load job file {}", self.queue.display()))?;
        let routine = CommandRoutine::new(&self.routine);
        let reporter = LogReporter;
        let job = JobId(self.job);

        let summary = Orchestrator::new(&store, &routine, &reporter, &settings)
            .run_job(job)
            .with_context(|| format!("job {job} did not complete"))?;

        if summary.statuses.is_empty() {
            println!("No pending items.");
            return Ok(());
        }
        for (item, status) in &summary.statuses {
            let line = format!("item {item}: {status}");
            if *status == ItemStatus::Built {
                println!("{}", line.green());
            } else {
                println!("{}", line.red());
            }
        }
        if summary.all_built() {
            let done = format!("{} item(s) built", summary.statuses.len());
            println!("{}", done.green().bold());
            Ok(())
        } else {
            anyhow::bail!(
                "{} of {} item(s) did not build",
                summary.failures(),
                summary.statuses.len()
            )
        }
    }
}
