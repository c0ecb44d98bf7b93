// file: src/launch/mod.rs
// version: 1.0.0
// guid: 716c40b5-5861-499b-b970-94e86ea134ca

//! Launching a rendered job: submission to the scheduler or a local run

pub mod local;
pub mod sbatch;

pub use local::LocalLauncher;
pub use sbatch::SbatchLauncher;

use crate::config::JobSpec;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What happened when a job was launched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LaunchOutcome {
    /// Accepted by the scheduler
    Submitted { job_id: u64 },
    /// Ran to completion on this machine; `None` when killed by a signal
    Completed { exit_code: Option<i32> },
    /// Nothing was started
    DryRun { command: Vec<String> },
}

impl LaunchOutcome {
    /// Process exit status the CLI should finish with
    pub fn exit_status(&self) -> i32 {
        match self {
            LaunchOutcome::Completed { exit_code } => exit_code.unwrap_or(1),
            _ => 0,
        }
    }
}

/// Record printed after `submit` and `run-local`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchReport {
    pub job_name: String,
    pub launcher: String,
    pub script: PathBuf,
    pub outcome: LaunchOutcome,
    pub launched_at: DateTime<Utc>,
}

impl LaunchReport {
    pub fn new(launcher: &str, spec: &JobSpec, script: &Path, outcome: LaunchOutcome) -> Self {
        Self {
            job_name: spec.scheduler.job_name.clone(),
            launcher: launcher.to_string(),
            script: script.to_path_buf(),
            outcome,
            launched_at: Utc::now(),
        }
    }

    /// One-line human summary
    pub fn summary(&self) -> String {
        match &self.outcome {
            LaunchOutcome::Submitted { job_id } => {
                format!("Submitted {} as job {}", self.job_name, job_id)
            }
            LaunchOutcome::Completed { exit_code: Some(0) } => {
                format!("{} finished successfully", self.job_name)
            }
            LaunchOutcome::Completed { exit_code: Some(code) } => {
                format!("{} exited with status {}", self.job_name, code)
            }
            LaunchOutcome::Completed { exit_code: None } => {
                format!("{} was terminated by a signal", self.job_name)
            }
            LaunchOutcome::DryRun { command } => {
                format!("DRY RUN: would execute: {}", command.join(" "))
            }
        }
    }
}

/// Something that can start a job from its written script
#[async_trait::async_trait]
pub trait Launcher: Send + Sync {
    /// Short name used in reports
    fn name(&self) -> &'static str;

    /// Command that [`Launcher::launch`] would execute
    fn command(&self, script: &Path, spec: &JobSpec) -> Vec<String>;

    /// Fail early when the tools this launcher runs are missing
    fn preflight(&self, _spec: &JobSpec) -> Result<()> {
        Ok(())
    }

    /// Start the job
    async fn launch(&self, script: &Path, spec: &JobSpec) -> Result<LaunchOutcome>;
}
