// file: src/launch/local.rs
// version: 1.0.0
// guid: 4df46aea-be9c-4b94-8bd9-46162b9ee0ed

//! Running the job on the current machine
//!
//! Useful on an interactive GPU node or a workstation. The job's own exit
//! status is reported unchanged; the launcher adds no retries.

use super::{LaunchOutcome, Launcher};
use crate::config::JobSpec;
use crate::{JobError, Result};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Runs a job script (or just its program) as a child process
pub struct LocalLauncher {
    shell: String,
    skip_modules: bool,
    dry_run: bool,
    enforce_time_limit: bool,
    time_limit: Option<Duration>,
}

impl LocalLauncher {
    pub fn new() -> Self {
        Self {
            shell: "bash".to_string(),
            skip_modules: false,
            dry_run: false,
            enforce_time_limit: true,
            time_limit: None,
        }
    }

    /// Shell used to execute the whole script
    pub fn shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Start the program directly instead of executing the script, so no
    /// `module` commands run
    pub fn skip_modules(mut self, skip: bool) -> Self {
        self.skip_modules = skip;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Kill the run once the job's wall-clock limit has passed
    pub fn enforce_time_limit(mut self, enforce: bool) -> Self {
        self.enforce_time_limit = enforce;
        self
    }

    /// Replace the job's wall-clock limit
    pub fn time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    fn effective_limit(&self, spec: &JobSpec) -> Option<Duration> {
        if !self.enforce_time_limit {
            return None;
        }
        Some(
            self.time_limit
                .unwrap_or_else(|| Duration::from_secs(spec.scheduler.time.as_seconds())),
        )
    }
}

impl Default for LocalLauncher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Launcher for LocalLauncher {
    fn name(&self) -> &'static str {
        "local"
    }

    fn command(&self, script: &Path, spec: &JobSpec) -> Vec<String> {
        if self.skip_modules {
            spec.program.command_line()
        } else {
            vec![self.shell.clone(), script.to_string_lossy().into_owned()]
        }
    }

    fn preflight(&self, spec: &JobSpec) -> Result<()> {
        let program = if self.skip_modules {
            &spec.program.interpreter
        } else {
            &self.shell
        };
        if which::which(program).is_err() {
            return Err(JobError::system(format!("Command not found: {}", program)));
        }
        Ok(())
    }

    async fn launch(&self, script: &Path, spec: &JobSpec) -> Result<LaunchOutcome> {
        let command = self.command(script, spec);

        if self.dry_run {
            info!("DRY RUN: Would execute: {}", command.join(" "));
            return Ok(LaunchOutcome::DryRun { command });
        }

        let (program, args) = command
            .split_first()
            .ok_or_else(|| JobError::validation("Nothing to execute"))?;

        debug!("Executing local command: {}", command.join(" "));
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| JobError::Process {
                command: command.join(" "),
                exit_code: None,
                stderr: format!("Failed to execute command: {}", e),
            })?;

        let status = match self.effective_limit(spec) {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => status?,
                Err(_) => {
                    warn!("Time limit of {:?} reached, stopping the run", limit);
                    if let Err(e) = child.kill().await {
                        warn!("Failed to kill training process: {}", e);
                    }
                    return Err(JobError::timeout(format!(
                        "{} exceeded its time limit of {}",
                        spec.scheduler.job_name, spec.scheduler.time
                    )));
                }
            },
            None => child.wait().await?,
        };

        info!("Local run finished: {}", status);
        Ok(LaunchOutcome::Completed {
            exit_code: status.code(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_runs_script_through_shell() {
        let launcher = LocalLauncher::new();
        assert_eq!(
            launcher.command(Path::new("/jobs/lab5.sh"), &JobSpec::canonical()),
            vec!["bash", "/jobs/lab5.sh"]
        );
    }

    #[test]
    fn test_command_skipping_modules_is_invocation() {
        let spec = JobSpec::canonical();
        let launcher = LocalLauncher::new().skip_modules(true);
        assert_eq!(
            launcher.command(Path::new("lab5.sh"), &spec),
            spec.program.command_line()
        );
    }

    #[test]
    fn test_effective_limit() {
        let spec = JobSpec::canonical();
        assert_eq!(
            LocalLauncher::new().effective_limit(&spec),
            Some(Duration::from_secs(1_800))
        );
        assert_eq!(
            LocalLauncher::new().enforce_time_limit(false).effective_limit(&spec),
            None
        );
    }

    #[test]
    fn test_preflight_checks_what_would_run() {
        let mut spec = JobSpec::canonical();
        spec.program.interpreter = "definitely-not-python-xyz".to_string();

        let err = LocalLauncher::new()
            .skip_modules(true)
            .preflight(&spec)
            .unwrap_err();
        assert!(err.to_string().contains("definitely-not-python-xyz"));

        let err = LocalLauncher::new()
            .shell("definitely-not-a-shell-xyz")
            .preflight(&spec)
            .unwrap_err();
        assert!(err.to_string().contains("definitely-not-a-shell-xyz"));
    }

    #[cfg(unix)]
    #[test]
    fn test_preflight_finds_shell() {
        assert!(LocalLauncher::new()
            .shell("sh")
            .preflight(&JobSpec::canonical())
            .is_ok());
    }

    #[cfg(unix)]
    mod processes {
        use super::*;
        use crate::config::JobSpec;
        use tempfile::TempDir;

        /// Job whose "interpreter" is `sh` running a throwaway script
        fn sh_job(dir: &TempDir, body: &str) -> JobSpec {
            let program = dir.path().join("train.sh");
            std::fs::write(&program, body).unwrap();

            let mut spec = JobSpec::canonical();
            spec.program.interpreter = "sh".to_string();
            spec.program.script = program;
            spec
        }

        #[tokio::test]
        async fn test_exit_status_propagates() -> Result<()> {
            let dir = TempDir::new()?;
            let spec = sh_job(&dir, "exit 3\n");

            let outcome = LocalLauncher::new()
                .skip_modules(true)
                .launch(Path::new("unused.sh"), &spec)
                .await?;

            assert_eq!(outcome, LaunchOutcome::Completed { exit_code: Some(3) });
            Ok(())
        }

        #[tokio::test]
        async fn test_arguments_reach_program() -> Result<()> {
            let dir = TempDir::new()?;
            let spec = sh_job(
                &dir,
                "[ \"$1\" = --learning-rate ] && [ \"$2\" = 0.01 ] && [ \"$6\" = 0.1 ] || exit 9\n",
            );

            let outcome = LocalLauncher::new()
                .skip_modules(true)
                .launch(Path::new("unused.sh"), &spec)
                .await?;

            assert_eq!(outcome, LaunchOutcome::Completed { exit_code: Some(0) });
            Ok(())
        }

        #[tokio::test]
        async fn test_whole_script_through_shell() -> Result<()> {
            let dir = TempDir::new()?;
            let script = dir.path().join("job.sh");
            std::fs::write(&script, "#SBATCH --job-name=x\nexit 0\n")?;

            let outcome = LocalLauncher::new()
                .shell("sh")
                .launch(&script, &JobSpec::canonical())
                .await?;

            assert_eq!(outcome, LaunchOutcome::Completed { exit_code: Some(0) });
            Ok(())
        }

        #[tokio::test]
        async fn test_time_limit_stops_run() -> Result<()> {
            let dir = TempDir::new()?;
            let spec = sh_job(&dir, "sleep 5\n");

            let err = LocalLauncher::new()
                .skip_modules(true)
                .time_limit(Duration::from_millis(100))
                .launch(Path::new("unused.sh"), &spec)
                .await
                .unwrap_err();

            assert!(matches!(err, JobError::Timeout(_)));
            Ok(())
        }

        #[tokio::test]
        async fn test_missing_program() {
            let mut spec = JobSpec::canonical();
            spec.program.interpreter = "definitely-not-a-python-xyz".to_string();

            let err = LocalLauncher::new()
                .skip_modules(true)
                .launch(Path::new("unused.sh"), &spec)
                .await
                .unwrap_err();

            assert!(matches!(err, JobError::Process { exit_code: None, .. }));
        }
    }
}
