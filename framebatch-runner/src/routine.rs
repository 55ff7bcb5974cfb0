//! External co-registration routine abstraction.
//!
//! The routine itself is an opaque long-running computation; the
//! orchestrator only hands it a fully explicit request and observes an
//! integer result code (`0` success, anything else a failure code passed
//! through to the status store verbatim).

use std::path::{Path, PathBuf};
use std::process::Command;

use framebatch_core::types::{AcqDate, FrameId, ItemStatus, MultiLook};

/// One invocation of the external routine. Everything is explicit — the
/// working directory, the thread budget — so no process-global state is
/// involved.
#[derive(Debug)]
pub struct CoregRequest<'a> {
    pub target: AcqDate,
    pub auxiliary: Option<AcqDate>,
    pub primary: AcqDate,
    pub frame: &'a FrameId,
    /// Input subdirectory name inside the working directory (`SLC`).
    pub input_dir: &'a str,
    /// Output subdirectory name inside the working directory (`RSLC`).
    pub output_dir: &'a str,
    pub work_dir: &'a Path,
    pub looks: MultiLook,
    /// Thread budget for the routine, applied to its environment only.
    pub threads: usize,
}

/// The external co-registration computation.
pub trait CoregRoutine {
    fn run(&self, request: &CoregRequest<'_>) -> i32;
}

/// Adapter turning a closure into a routine; tests and embedders use this.
pub struct FnRoutine<F>(pub F);

impl<F> CoregRoutine for FnRoutine<F>
where
    F: Fn(&CoregRequest<'_>) -> i32,
{
    fn run(&self, request: &CoregRequest<'_>) -> i32 {
        (self.0)(request)
    }
}

/// Runs an external program as the co-registration routine.
///
/// The request is encoded as positional arguments
/// (`<target> <input_dir> <output_dir> <primary> <frame> <rlks> <azlks>`
/// plus `<auxiliary>` when present), the child's working directory is the
/// staging directory, and the thread budget is set on the child's
/// environment.
#[derive(Debug, Clone)]
pub struct CommandRoutine {
    program: PathBuf,
}

impl CommandRoutine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl CoregRoutine for CommandRoutine {
    fn run(&self, request: &CoregRequest<'_>) -> i32 {
        let mut command = Command::new(&self.program);
        command
            .arg(request.target.compact())
            .arg(request.input_dir)
            .arg(request.output_dir)
            .arg(request.primary.compact())
            .arg(request.frame.name())
            .arg(request.looks.range.to_string())
            .arg(request.looks.azimuth.to_string())
            .current_dir(request.work_dir)
            .env("OMP_NUM_THREADS", request.threads.to_string());
        if let Some(auxiliary) = request.auxiliary {
            command.arg(auxiliary.compact());
        }
        match command.status() {
            Ok(status) => status.code().unwrap_or(ItemStatus::UnknownError.code()),
            Err(err) => {
                tracing::warn!("failed to spawn {}: {err}", self.program.display());
                ItemStatus::UnknownError.code()
            }
        }
    }
}
