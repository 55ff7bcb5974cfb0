//! `framebatch init` — provision a frame cache from the long-term archive.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use framebatch_core::config::CACHE_ROOT_VAR;
use framebatch_core::types::{AcqDate, FrameId};
use framebatch_env::{import_references, list_archived_references, seed_frame_cache};

/// Arguments for `framebatch init`.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Frame to provision, e.g. 021D_04972_131313.
    #[arg(long)]
    pub frame: String,

    /// Long-term archive root holding `<track>/<frame>/` trees.
    #[arg(long)]
    pub source_dir: PathBuf,

    /// Cache root (defaults to $BATCH_CACHE_DIR).
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Primary reference date (YYYYMMDD); discovered from the archive's
    /// geometry products when omitted.
    #[arg(long)]
    pub primary: Option<String>,

    /// Also link every ready archived co-registered acquisition.
    #[arg(long)]
    pub import_references: bool,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let frame = FrameId::parse(&self.frame)
            .with_context(|| format!("invalid frame name '{}'", self.frame))?;
        let primary = self
            .primary
            .as_deref()
            .map(AcqDate::parse_compact)
            .transpose()
            .context("invalid --primary date")?;
        let cache_root = match self.cache_dir {
            Some(dir) => dir,
            None => std::env::var_os(CACHE_ROOT_VAR)
                .map(PathBuf::from)
                .with_context(|| {
                    format!("cache root not configured; set {CACHE_ROOT_VAR} or pass --cache-dir")
                })?,
        };

        let summary = seed_frame_cache(&self.source_dir, &cache_root, &frame, primary)
            .with_context(|| format!("failed to seed frame {}", frame.name()))?;
        println!("Primary reference: {}", summary.primary.to_string().bold());
        println!(
            "Staged {} file(s) from the archive ({} already up to date), linked {} primary product(s)",
            summary.staged.copied, summary.staged.skipped, summary.linked
        );

        if self.import_references {
            let available = list_archived_references(&self.source_dir, &frame)?;
            let imported = import_references(&self.source_dir, &cache_root, &frame, &available)?;
            let line = format!("Imported {} co-registered reference(s)", imported.len());
            println!("{}", line.green());
        }

        let done = format!("Frame {} ready at {}", frame.name(), cache_root.display());
        println!("{}", done.green().bold());
        Ok(())
    }
}
