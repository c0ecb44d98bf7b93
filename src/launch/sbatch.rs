// file: src/launch/sbatch.rs
// version: 1.0.0
// guid: 92545925-3773-4ac6-901c-5fb60a711b45

//! Submission through `sbatch`

use super::{LaunchOutcome, Launcher};
use crate::config::JobSpec;
use crate::{JobError, Result};
use regex::Regex;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, error, info};

/// Submits job scripts to the scheduler
pub struct SbatchLauncher {
    sbatch: String,
    dry_run: bool,
}

impl SbatchLauncher {
    /// Use `sbatch` from PATH
    pub fn new() -> Self {
        Self::with_binary("sbatch")
    }

    /// Use a specific submission binary
    pub fn with_binary(sbatch: impl Into<String>) -> Self {
        Self {
            sbatch: sbatch.into(),
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

impl Default for SbatchLauncher {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract the job id from `sbatch` output
///
/// Understands the default `Submitted batch job <id>` line and the
/// `--parsable` form `<id>[;cluster]`.
pub fn parse_job_id(stdout: &str) -> Result<u64> {
    let re = Regex::new(r"Submitted batch job (\d+)")
        .map_err(|e| JobError::system(format!("Invalid regex pattern: {}", e)))?;

    if let Some(caps) = re.captures(stdout) {
        return caps[1]
            .parse()
            .map_err(|_| JobError::submission(format!("Job id out of range: {}", &caps[1])));
    }

    let trimmed = stdout.trim();
    let id = trimmed.split(';').next().unwrap_or("");
    if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) {
        return id
            .parse()
            .map_err(|_| JobError::submission(format!("Job id out of range: {}", id)));
    }

    Err(JobError::submission(format!(
        "Could not find a job id in sbatch output: {:?}",
        trimmed
    )))
}

#[async_trait::async_trait]
impl Launcher for SbatchLauncher {
    fn name(&self) -> &'static str {
        "sbatch"
    }

    fn command(&self, script: &Path, _spec: &JobSpec) -> Vec<String> {
        vec![self.sbatch.clone(), script.to_string_lossy().into_owned()]
    }

    fn preflight(&self, _spec: &JobSpec) -> Result<()> {
        if which::which(&self.sbatch).is_err() {
            return Err(JobError::system(format!(
                "Command not found: {} (is this a Slurm login node?)",
                self.sbatch
            )));
        }
        Ok(())
    }

    async fn launch(&self, script: &Path, spec: &JobSpec) -> Result<LaunchOutcome> {
        let command = self.command(script, spec);

        if self.dry_run {
            info!("DRY RUN: Would execute: {}", command.join(" "));
            return Ok(LaunchOutcome::DryRun { command });
        }

        self.preflight(spec)?;

        debug!("Executing: {}", command.join(" "));
        let output = Command::new(&self.sbatch)
            .arg(script)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| JobError::Process {
                command: command.join(" "),
                exit_code: None,
                stderr: format!("Failed to execute command: {}", e),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            error!("sbatch failed: {}", output.status);
            return Err(JobError::Process {
                command: command.join(" "),
                exit_code: output.status.code(),
                stderr: if stderr.trim().is_empty() {
                    stdout.trim().to_string()
                } else {
                    stderr.trim().to_string()
                },
            });
        }

        let job_id = parse_job_id(&stdout)?;
        info!("Job {} submitted with id {}", spec.scheduler.job_name, job_id);
        Ok(LaunchOutcome::Submitted { job_id })
    }
}
