// file: src/config/job.rs
// version: 1.0.0
// guid: bc01253e-b9e4-4559-afa2-90d8a8be1c48

//! Job model: scheduler directives, module environment and the
//! training program invocation

use super::resources::{MemoryLimit, WallTime};
use super::training::TrainingArgs;
use crate::{JobError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Directive keys modelled by [`SchedulerDirectives`]; extras may not reuse them.
pub const MODELLED_DIRECTIVES: &[&str] = &[
    "job-name",
    "partition",
    "nodes",
    "output",
    "error",
    "account",
    "gres",
    "gpus",
    "time",
    "mem",
];

/// Declarative resource request consumed by the scheduler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerDirectives {
    /// Job name shown in the queue
    pub job_name: String,
    /// Partition (queue) to submit to
    pub partition: String,
    /// Number of compute nodes
    #[serde(default = "default_nodes")]
    pub nodes: u32,
    /// Standard output log path, may contain `%j`
    pub output: String,
    /// Standard error log path, may contain `%j`
    pub error: String,
    /// Accounting identifier charged for the job
    pub account: String,
    /// Accelerator count, rendered as a `gpu` generic resource
    #[serde(default = "default_gpus")]
    pub gpus: u32,
    /// Wall-clock limit
    pub time: WallTime,
    /// Memory ceiling
    pub mem: MemoryLimit,
    /// Further `--key=value` directives, rendered sorted by key
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

fn default_nodes() -> u32 {
    1
}

fn default_gpus() -> u32 {
    1
}

/// Environment module commands run before the training program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleEnvironment {
    /// Run `module purge` first
    #[serde(default = "default_purge")]
    pub purge: bool,
    /// Modules loaded in order
    #[serde(default)]
    pub modules: Vec<String>,
}

fn default_purge() -> bool {
    true
}

/// The single program launched by the job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    /// Interpreter or executable, e.g. `python`
    pub interpreter: String,
    /// Training script passed to the interpreter
    pub script: PathBuf,
    /// Additional words appended after the training arguments
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_args: Vec<String>,
    /// Training program arguments
    pub args: TrainingArgs,
}

impl Invocation {
    /// Full argument list after the interpreter
    pub fn argv(&self) -> Vec<String> {
        let mut argv = vec![self.script.to_string_lossy().into_owned()];
        argv.extend(self.args.to_cli_args());
        argv.extend(self.extra_args.iter().cloned());
        argv
    }

    /// Interpreter followed by [`Invocation::argv`]
    pub fn command_line(&self) -> Vec<String> {
        let mut words = vec![self.interpreter.clone()];
        words.extend(self.argv());
        words
    }
}

/// A complete training job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    pub scheduler: SchedulerDirectives,
    #[serde(default = "ModuleEnvironment::canonical")]
    pub environment: ModuleEnvironment,
    pub program: Invocation,
}

/// Command-line replacements applied on top of a loaded job
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub learning_rate: Option<f64>,
    pub batch_size: Option<u32>,
    pub data_aug_brightness: Option<f64>,
    pub job_name: Option<String>,
    pub partition: Option<String>,
    pub time: Option<WallTime>,
    pub mem: Option<MemoryLimit>,
}

impl Overrides {
    /// True when no override was supplied
    pub fn is_empty(&self) -> bool {
        self.learning_rate.is_none()
            && self.batch_size.is_none()
            && self.data_aug_brightness.is_none()
            && self.job_name.is_none()
            && self.partition.is_none()
            && self.time.is_none()
            && self.mem.is_none()
    }
}

impl ModuleEnvironment {
    /// Purge, then load the Python runtime with PyTorch
    pub fn canonical() -> Self {
        Self {
            purge: true,
            modules: vec!["languages/anaconda3/2021-3.8.8-cuda-11.1-pytorch".to_string()],
        }
    }
}

impl JobSpec {
    /// The CIFAR-10 lab job: one GPU node, 30 minutes, 64GB, three hyperparameters
    pub fn canonical() -> Self {
        Self {
            scheduler: SchedulerDirectives {
                job_name: "lab5".to_string(),
                partition: "teach_gpu".to_string(),
                nodes: 1,
                output: "train_%j.out".to_string(),
                error: "train_%j.err".to_string(),
                account: "COMS030144".to_string(),
                gpus: 1,
                time: WallTime::from_dhm(0, 0, 30),
                mem: MemoryLimit::gigabytes(64),
                extra: BTreeMap::new(),
            },
            environment: ModuleEnvironment::canonical(),
            program: Invocation {
                interpreter: "python".to_string(),
                script: PathBuf::from("train_cifar.py"),
                extra_args: Vec::new(),
                args: TrainingArgs {
                    learning_rate: 0.01,
                    batch_size: 128,
                    data_aug_brightness: 0.1,
                    ..Default::default()
                },
            },
        }
    }

    /// Validate the whole job
    pub fn validate(&self) -> Result<()> {
        let s = &self.scheduler;

        if s.job_name.trim().is_empty() {
            return Err(JobError::validation("Job name cannot be empty"));
        }
        if s.job_name.chars().any(char::is_whitespace) {
            return Err(JobError::validation(format!(
                "Job name cannot contain whitespace: {:?}",
                s.job_name
            )));
        }
        if s.partition.trim().is_empty() {
            return Err(JobError::validation("Partition cannot be empty"));
        }
        if s.account.trim().is_empty() {
            return Err(JobError::validation("Account cannot be empty"));
        }
        if s.output.trim().is_empty() || s.error.trim().is_empty() {
            return Err(JobError::validation("Output and error log paths cannot be empty"));
        }
        if s.nodes == 0 {
            return Err(JobError::validation("Job must request at least one node"));
        }
        if s.gpus == 0 {
            return Err(JobError::validation("Job must request at least one GPU"));
        }

        for (key, value) in &s.extra {
            validate_extra_key(key)?;
            if value.is_empty() {
                return Err(JobError::validation(format!("Directive --{} needs a value", key)));
            }
            validate_directive_value(key, value)?;
        }

        let directive_values = [
            ("job-name", &s.job_name),
            ("partition", &s.partition),
            ("output", &s.output),
            ("error", &s.error),
            ("account", &s.account),
        ];
        for (name, value) in directive_values {
            validate_directive_value(name, value)?;
        }

        for module in &self.environment.modules {
            if module.trim().is_empty() || module.chars().any(char::is_whitespace) {
                return Err(JobError::validation(format!("Invalid module name: {:?}", module)));
            }
        }

        if self.program.interpreter.trim().is_empty() {
            return Err(JobError::validation("Interpreter cannot be empty"));
        }
        if self.program.script.as_os_str().is_empty() {
            return Err(JobError::validation("Training script path cannot be empty"));
        }

        self.program.args.validate()
    }

    /// Apply command-line replacements
    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        let args = &mut self.program.args;
        if let Some(lr) = overrides.learning_rate {
            args.learning_rate = lr;
        }
        if let Some(bs) = overrides.batch_size {
            args.batch_size = bs;
        }
        if let Some(b) = overrides.data_aug_brightness {
            args.data_aug_brightness = b;
        }

        let s = &mut self.scheduler;
        if let Some(ref name) = overrides.job_name {
            s.job_name = name.clone();
        }
        if let Some(ref partition) = overrides.partition {
            s.partition = partition.clone();
        }
        if let Some(ref time) = overrides.time {
            s.time = time.clone();
        }
        if let Some(ref mem) = overrides.mem {
            s.mem = mem.clone();
        }
    }
}

/// `#SBATCH` values are written unquoted, so they must read back as one word
fn validate_directive_value(name: &str, value: &str) -> Result<()> {
    if let Some(c) = value
        .chars()
        .find(|c| c.is_whitespace() || matches!(*c, '\'' | '"' | '\\'))
    {
        return Err(JobError::validation(format!(
            "--{} cannot contain {:?}: {:?}",
            name, c, value
        )));
    }
    Ok(())
}

fn validate_extra_key(key: &str) -> Result<()> {
    let mut chars = key.chars();
    let well_formed = chars.next().is_some_and(|c| c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');

    if !well_formed {
        return Err(JobError::validation(format!(
            "Invalid directive name: {:?}",
            key
        )));
    }

    if MODELLED_DIRECTIVES.contains(&key) {
        return Err(JobError::validation(format!(
            "Directive --{} is already modelled, set it in the scheduler section",
            key
        )));
    }

    Ok(())
}
