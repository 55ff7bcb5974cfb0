//! The staging-environment state machine.
//!
//! One instance manages one ephemeral working directory:
//!
//! ```text
//! Unacquired --acquire()--> Acquiring --> Active
//! Active --release(outcome)--> Reconciling --> Released   (terminal)
//! ```
//!
//! `acquire` populates the working directory from the frame cache through
//! the input patterns; `release` writes the output-pattern subset back and
//! deletes the working directory. An instance is single-use: `Released` is
//! reached exactly once, and out-of-order calls are lifecycle errors.
//!
//! The working directory path is returned from `acquire` and passed around
//! explicitly; nothing here mutates the process-wide current directory.

use std::fs;
use std::path::{Path, PathBuf};

use framebatch_core::config::WritebackPolicy;
use framebatch_core::layout;
use framebatch_core::types::{FrameId, JobId};
use framebatch_sync::{mirror, PatternSet};

use crate::error::{io_err, EnvError};

// ---------------------------------------------------------------------------
// Spec and supporting types
// ---------------------------------------------------------------------------

/// Everything needed to lay out one staging environment.
#[derive(Debug, Clone)]
pub struct EnvSpec {
    pub job: JobId,
    /// Cluster scheduler job id, when running under one. Part of the
    /// working-directory name so concurrent instances on the same frame
    /// never collide.
    pub scheduler_job: Option<String>,
    pub frame: FrameId,
    pub cache_root: PathBuf,
    pub temp_root: PathBuf,
    /// Cache subset staged in on acquisition; `None` starts empty.
    pub input_patterns: Option<PatternSet>,
    /// Working-tree subset written back on release; `None` mirrors the
    /// whole working tree into the cache.
    pub output_patterns: Option<PatternSet>,
    /// Empty directories the external routine expects to exist.
    pub scratch_dirs: Vec<String>,
    /// Directories purged from the working tree when the outcome is
    /// failure, before any write-back.
    pub cleanup_dirs: Vec<String>,
    pub writeback: WritebackPolicy,
}

/// Lifecycle states. `Acquiring` and `Reconciling` are observable only when
/// an operation failed partway; a healthy instance moves straight through
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvState {
    Unacquired,
    Acquiring,
    Active,
    Reconciling,
    Released,
}

/// Success/failure signal for `release`, passed explicitly so the release
/// logic is testable independently of any error-signaling mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

/// Hook invoked on failure-path release. Its own errors are logged, never
/// fatal to the release.
pub type FailureHook<'a> = Box<dyn FnMut() -> Result<(), Box<dyn std::error::Error>> + 'a>;

// ---------------------------------------------------------------------------
// StagingEnv
// ---------------------------------------------------------------------------

/// A single-use staging environment for one work item.
pub struct StagingEnv<'a> {
    frame_cache: PathBuf,
    env_root: PathBuf,
    work_dir: PathBuf,
    input_patterns: Option<PatternSet>,
    output_patterns: Option<PatternSet>,
    scratch_dirs: Vec<String>,
    cleanup_dirs: Vec<String>,
    writeback: WritebackPolicy,
    failure_hook: Option<FailureHook<'a>>,
    state: EnvState,
}

impl<'a> StagingEnv<'a> {
    pub fn new(spec: EnvSpec) -> Self {
        let frame_cache = layout::frame_dir(&spec.cache_root, &spec.frame);
        let env_root = layout::frame_env_root(&spec.temp_root, &spec.frame);
        let env_id = layout::env_id(spec.job, spec.scheduler_job.as_deref());
        let work_dir = env_root.join(env_id);
        Self {
            frame_cache,
            env_root,
            work_dir,
            input_patterns: spec.input_patterns,
            output_patterns: spec.output_patterns,
            scratch_dirs: spec.scratch_dirs,
            cleanup_dirs: spec.cleanup_dirs,
            writeback: spec.writeback,
            failure_hook: None,
            state: EnvState::Unacquired,
        }
    }

    /// Register the failure hook invoked by a failure-path release.
    pub fn on_failure<F>(&mut self, hook: F)
    where
        F: FnMut() -> Result<(), Box<dyn std::error::Error>> + 'a,
    {
        self.failure_hook = Some(Box::new(hook));
    }

    pub fn state(&self) -> EnvState {
        self.state
    }

    /// The working directory this environment owns. Only exists between a
    /// successful `acquire` and `release`.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Create and populate the working directory.
    ///
    /// Mirrors the frame cache in, restricted to the input patterns (or
    /// creates an empty directory when none are declared), then creates the
    /// declared scratch directories. Returns the working directory path;
    /// all subsequent path operations by the caller should resolve against
    /// it explicitly.
    pub fn acquire(&mut self) -> Result<&Path, EnvError> {
        if self.state != EnvState::Unacquired {
            return Err(EnvError::Lifecycle {
                operation: "acquire",
                state: self.state,
            });
        }
        self.state = EnvState::Acquiring;

        fs::create_dir_all(&self.env_root).map_err(|e| io_err(&self.env_root, e))?;
        match &self.input_patterns {
            Some(patterns) => {
                let stats = mirror(&self.frame_cache, &self.work_dir, Some(patterns))?;
                tracing::info!(
                    "staged {} file(s) into {}",
                    stats.copied,
                    self.work_dir.display()
                );
            }
            None => {
                fs::create_dir_all(&self.work_dir).map_err(|e| io_err(&self.work_dir, e))?;
            }
        }
        for dir in &self.scratch_dirs {
            let path = self.work_dir.join(dir);
            fs::create_dir_all(&path).map_err(|e| io_err(&path, e))?;
        }

        self.state = EnvState::Active;
        Ok(&self.work_dir)
    }

    /// Reconcile the working directory back into the cache and destroy it.
    ///
    /// On `Outcome::Failure` the failure hook runs first (errors logged,
    /// not fatal) and the declared cleanup directories are removed from the
    /// working tree so partially produced artifacts cannot reach the
    /// cache. Write-back then follows the configured policy. The working
    /// directory is deleted unconditionally afterwards; only a failed
    /// write-back leaves it behind, for operator recovery.
    pub fn release(&mut self, outcome: Outcome) -> Result<(), EnvError> {
        if self.state != EnvState::Active {
            return Err(EnvError::Lifecycle {
                operation: "release",
                state: self.state,
            });
        }
        self.state = EnvState::Reconciling;

        if outcome == Outcome::Failure {
            if let Some(hook) = self.failure_hook.as_mut() {
                if let Err(err) = hook() {
                    tracing::warn!("failure hook error (ignored): {err}");
                }
            }
            for dir in &self.cleanup_dirs {
                let path = self.work_dir.join(dir);
                if path.exists() {
                    fs::remove_dir_all(&path).map_err(|e| io_err(&path, e))?;
                    tracing::debug!("cleaned {}", path.display());
                }
            }
        }

        let write_back = match self.writeback {
            WritebackPolicy::Always => true,
            WritebackPolicy::OnSuccess => outcome == Outcome::Success,
        };
        if write_back {
            let stats = mirror(&self.work_dir, &self.frame_cache, self.output_patterns.as_ref())?;
            tracing::info!(
                "reconciled {} file(s) into {}",
                stats.copied,
                self.frame_cache.display()
            );
        }

        fs::remove_dir_all(&self.work_dir).map_err(|e| io_err(&self.work_dir, e))?;
        self.state = EnvState::Released;
        Ok(())
    }
}

impl std::fmt::Debug for StagingEnv<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagingEnv")
            .field("work_dir", &self.work_dir)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Drop for StagingEnv<'_> {
    fn drop(&mut self) {
        // An abandoned working directory needs administrative recovery;
        // make that visible.
        if !matches!(self.state, EnvState::Unacquired | EnvState::Released) {
            tracing::warn!(
                "staging environment {} dropped in state {:?} without release",
                self.work_dir.display(),
                self.state
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn frame() -> FrameId {
        FrameId::parse("021D_04972_131313").expect("frame")
    }

    fn spec(cache: &Path, temp: &Path) -> EnvSpec {
        EnvSpec {
            job: JobId(1),
            scheduler_job: None,
            frame: frame(),
            cache_root: cache.to_path_buf(),
            temp_root: temp.to_path_buf(),
            input_patterns: None,
            output_patterns: None,
            scratch_dirs: vec![],
            cleanup_dirs: vec![],
            writeback: WritebackPolicy::Always,
        }
    }

    #[test]
    fn work_dir_composes_job_and_scheduler_ids() {
        let cache = TempDir::new().expect("cache");
        let temp = TempDir::new().expect("temp");
        let mut s = spec(cache.path(), temp.path());
        s.job = JobId(42);
        s.scheduler_job = Some("9913007".into());
        let env = StagingEnv::new(s);
        assert!(env
            .work_dir()
            .ends_with("021D_04972_131313_envs/42_9913007"));
    }

    #[test]
    fn acquire_twice_is_a_lifecycle_error() {
        let cache = TempDir::new().expect("cache");
        let temp = TempDir::new().expect("temp");
        std::fs::create_dir_all(cache.path().join(frame().name())).expect("frame dir");
        let mut env = StagingEnv::new(spec(cache.path(), temp.path()));
        env.acquire().expect("acquire");
        let err = env.acquire().unwrap_err();
        assert!(matches!(
            err,
            EnvError::Lifecycle {
                operation: "acquire",
                state: EnvState::Active
            }
        ));
        env.release(Outcome::Success).expect("release");
    }

    #[test]
    fn release_before_acquire_is_a_lifecycle_error() {
        let cache = TempDir::new().expect("cache");
        let temp = TempDir::new().expect("temp");
        let mut env = StagingEnv::new(spec(cache.path(), temp.path()));
        let err = env.release(Outcome::Success).unwrap_err();
        assert!(matches!(err, EnvError::Lifecycle { .. }));
    }

    #[test]
    fn empty_spec_acquire_creates_empty_work_dir() {
        let cache = TempDir::new().expect("cache");
        let temp = TempDir::new().expect("temp");
        std::fs::create_dir_all(cache.path().join(frame().name())).expect("frame dir");
        let mut s = spec(cache.path(), temp.path());
        s.scratch_dirs = vec!["tab".into(), "log".into()];
        let mut env = StagingEnv::new(s);
        let work = env.acquire().expect("acquire").to_path_buf();
        assert!(work.join("tab").is_dir());
        assert!(work.join("log").is_dir());
        env.release(Outcome::Success).expect("release");
    }

    #[test]
    fn release_on_failure_runs_hook_and_cleanup_dirs() {
        let cache = TempDir::new().expect("cache");
        let temp = TempDir::new().expect("temp");
        std::fs::create_dir_all(cache.path().join(frame().name())).expect("frame dir");
        let mut s = spec(cache.path(), temp.path());
        s.cleanup_dirs = vec!["RSLC".into()];
        s.output_patterns = Some(PatternSet::compile(["log.*"]).expect("patterns"));
        let hook_calls = std::cell::Cell::new(0u32);
        let mut env = StagingEnv::new(s);
        env.on_failure(|| {
            hook_calls.set(hook_calls.get() + 1);
            Ok(())
        });

        let work = env.acquire().expect("acquire").to_path_buf();
        std::fs::create_dir_all(work.join("RSLC/20200110")).expect("mkdir");
        std::fs::write(work.join("RSLC/20200110/partial.rslc"), "junk").expect("write");

        env.release(Outcome::Failure).expect("release");
        assert_eq!(hook_calls.get(), 1);
        assert!(!work.exists());
        assert!(!cache
            .path()
            .join(frame().name())
            .join("RSLC/20200110/partial.rslc")
            .exists());
    }
}
