// file: src/cli/args.rs
// version: 1.0.0
// guid: 5af4f247-53e7-43e7-a051-975a8cd56c6d

//! Command line argument definitions

use crate::config::{MemoryLimit, Overrides, WallTime};
use crate::VERSION;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cifar-train-job")]
#[command(about = "Render, check and launch the CIFAR-10 training job on a Slurm cluster")]
#[command(version = VERSION)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[arg(long, global = true, help = "Emit logs as JSON lines")]
    pub json_logs: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write the default job configuration
    Init {
        #[arg(short, long, default_value = "cifar-job.yaml")]
        output: PathBuf,

        #[arg(long, help = "Overwrite an existing file")]
        force: bool,
    },

    /// Print or write the job script
    Render {
        #[arg(short, long, env = "CIFAR_JOB_CONFIG", help = "Job file (.yaml, .yml or .toml)")]
        config: Option<PathBuf>,

        #[arg(short, long, help = "Write the script here instead of stdout")]
        output: Option<PathBuf>,

        #[command(flatten)]
        overrides: OverrideArgs,
    },

    /// Load and validate the job configuration
    Validate {
        #[arg(short, long, env = "CIFAR_JOB_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Parse an existing job script and print it as configuration
    Inspect {
        /// Job script to read
        script: PathBuf,

        #[arg(long, help = "Print JSON instead of YAML")]
        json: bool,
    },

    /// Write the job script and submit it with sbatch
    Submit {
        #[arg(short, long, env = "CIFAR_JOB_CONFIG")]
        config: Option<PathBuf>,

        #[arg(long, default_value = ".", help = "Directory or file for the generated script")]
        script_dir: PathBuf,

        #[arg(long, default_value = "sbatch")]
        sbatch: String,

        #[arg(long, help = "Show what would be done without actually doing it")]
        dry_run: bool,

        #[arg(long, help = "Print the launch report as JSON")]
        json: bool,

        #[command(flatten)]
        overrides: OverrideArgs,
    },

    /// Run the job on this machine, outside the scheduler
    RunLocal {
        #[arg(short, long, env = "CIFAR_JOB_CONFIG")]
        config: Option<PathBuf>,

        #[arg(long, default_value = ".", help = "Directory or file for the generated script")]
        script_dir: PathBuf,

        #[arg(long, default_value = "bash", help = "Shell that executes the script")]
        shell: String,

        #[arg(long, help = "Start the training program directly, without module commands")]
        skip_modules: bool,

        #[arg(long, help = "Do not stop the run at the job's time limit")]
        no_time_limit: bool,

        #[arg(long, help = "Show what would be done without actually doing it")]
        dry_run: bool,

        #[arg(long, help = "Print the launch report as JSON")]
        json: bool,

        #[command(flatten)]
        overrides: OverrideArgs,
    },

    /// Check what this machine needs to submit or run the job
    CheckPrereqs {
        #[arg(short, long, env = "CIFAR_JOB_CONFIG")]
        config: Option<PathBuf>,
    },
}

/// Per-invocation replacements for configured values
#[derive(Args, Clone, Debug, Default)]
pub struct OverrideArgs {
    #[arg(long, help = "Learning rate passed to the training program")]
    pub learning_rate: Option<f64>,

    #[arg(long, help = "Mini-batch size passed to the training program")]
    pub batch_size: Option<u32>,

    #[arg(long, help = "Brightness augmentation factor passed to the training program")]
    pub data_aug_brightness: Option<f64>,

    #[arg(long)]
    pub job_name: Option<String>,

    #[arg(long)]
    pub partition: Option<String>,

    #[arg(long, help = "Time limit, e.g. 0-00:30 or 90")]
    pub time: Option<WallTime>,

    #[arg(long, help = "Memory limit, e.g. 64GB")]
    pub mem: Option<MemoryLimit>,
}

impl From<OverrideArgs> for Overrides {
    fn from(args: OverrideArgs) -> Self {
        Overrides {
            learning_rate: args.learning_rate,
            batch_size: args.batch_size,
            data_aug_brightness: args.data_aug_brightness,
            job_name: args.job_name,
            partition: args.partition,
            time: args.time,
            mem: args.mem,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_version_is_crate_version() {
        assert_eq!(Cli::command().get_version(), Some(VERSION));
    }

    #[test]
    fn test_submit_overrides_parse() {
        let cli = Cli::try_parse_from([
            "cifar-train-job",
            "submit",
            "--learning-rate",
            "0.001",
            "--time",
            "0-01:00",
            "--mem",
            "32G",
            "--dry-run",
        ])
        .unwrap();

        match cli.command {
            Commands::Submit {
                overrides, dry_run, ..
            } => {
                assert!(dry_run);
                let overrides = Overrides::from(overrides);
                assert_eq!(overrides.learning_rate, Some(0.001));
                assert_eq!(overrides.time.unwrap().as_seconds(), 3_600);
                assert_eq!(overrides.mem.unwrap().as_megabytes(), 32_768);
            }
            _ => panic!("expected submit"),
        }
    }

    #[test]
    fn test_bad_time_rejected_by_parser() {
        let result = Cli::try_parse_from(["cifar-train-job", "render", "--time", "soon"]);
        assert!(result.is_err());
    }
}
