// file: src/cli/commands.rs
// version: 1.0.0
// guid: d545269e-031b-47d6-940f-d2b519ca2bae

//! Command implementations for the CLI

use crate::{
    cli::args::OverrideArgs,
    config::{loader::save_job_spec, ConfigLoader, JobSource, JobSpec, Overrides},
    launch::{LaunchReport, Launcher, LocalLauncher, SbatchLauncher},
    script::{parse_script, render_script, write_script},
    logging::{with_async_operation_span, with_operation_span},
    utils::SystemUtils,
    JobError, Result,
};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Resolve the job configuration and apply command-line overrides
pub fn load_job(config: Option<&Path>, overrides: OverrideArgs) -> Result<JobSpec> {
    let loader = ConfigLoader::new();
    let (mut spec, source) = loader.resolve(config)?;

    match source {
        JobSource::File(path) => info!("Using job configuration {}", path.display()),
        JobSource::Canonical => info!("Using the built-in CIFAR-10 job"),
    }

    let overrides = Overrides::from(overrides);
    if !overrides.is_empty() {
        spec.apply_overrides(&overrides);
        spec.validate()?;
    }

    Ok(spec)
}

/// Write the default job configuration
pub async fn init_command(output: &Path, force: bool) -> Result<()> {
    save_job_spec(output, &JobSpec::canonical(), force)?;
    println!("Wrote {}", output.display());
    Ok(())
}

/// Print or write the job script
pub async fn render_command(
    config: Option<PathBuf>,
    output: Option<PathBuf>,
    overrides: OverrideArgs,
) -> Result<()> {
    let spec = load_job(config.as_deref(), overrides)?;

    match output {
        Some(path) => {
            let written = write_script(&path, &spec).await?;
            info!("Job script written to {}", written.display());
        }
        None => print!("{}", with_operation_span("render", || render_script(&spec))?),
    }

    Ok(())
}

/// Load and validate the job configuration
pub async fn validate_command(config: Option<PathBuf>) -> Result<()> {
    let spec = load_job(config.as_deref(), OverrideArgs::default())?;
    let s = &spec.scheduler;

    println!("{} job {} is valid", "✓".green(), s.job_name);
    println!(
        "  partition {}, {} node(s), {} GPU(s), {} ({} s), {} ({} MB)",
        s.partition,
        s.nodes,
        s.gpus,
        s.time,
        s.time.as_seconds(),
        s.mem,
        s.mem.as_megabytes()
    );
    println!("  runs: {}", spec.program.command_line().join(" "));
    Ok(())
}

/// Parse an existing job script and print it as configuration
pub async fn inspect_command(script: &Path, json: bool) -> Result<()> {
    let text = tokio::fs::read_to_string(script).await.map_err(|e| {
        JobError::config(format!("Failed to read job script {}: {}", script.display(), e))
    })?;

    let spec = with_operation_span("inspect", || parse_script(&text))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&spec)?);
    } else {
        print!("{}", serde_yaml::to_string(&spec)?);
    }
    Ok(())
}

fn print_report(report: &LaunchReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!("{}", report.summary());
    }
    Ok(())
}

async fn launch(
    launcher: &dyn Launcher,
    spec: &JobSpec,
    script_target: &Path,
    dry_run: bool,
) -> Result<LaunchReport> {
    // nothing touches the disk on a dry run
    let script = if dry_run {
        if script_target.is_dir() {
            script_target.join(format!("{}.sh", spec.scheduler.job_name))
        } else {
            script_target.to_path_buf()
        }
    } else {
        launcher.preflight(spec)?;
        write_script(script_target, spec).await?
    };

    let outcome = launcher.launch(&script, spec).await?;
    Ok(LaunchReport::new(launcher.name(), spec, &script, outcome))
}

/// Write the job script and submit it with sbatch
pub async fn submit_command(
    config: Option<PathBuf>,
    script_dir: &Path,
    sbatch: &str,
    dry_run: bool,
    json: bool,
    overrides: OverrideArgs,
) -> Result<()> {
    let spec = load_job(config.as_deref(), overrides)?;
    info!(
        "Submitting {} to partition {}",
        spec.scheduler.job_name, spec.scheduler.partition
    );

    let launcher = SbatchLauncher::with_binary(sbatch).dry_run(dry_run);
    let report = with_async_operation_span("submit", || {
        launch(&launcher, &spec, script_dir, dry_run)
    })
    .await?;
    print_report(&report, json)
}

/// Options for [`run_local_command`]
#[derive(Debug, Clone)]
pub struct RunLocalOptions {
    pub script_dir: PathBuf,
    pub shell: String,
    pub skip_modules: bool,
    pub enforce_time_limit: bool,
    pub dry_run: bool,
    pub json: bool,
}

/// Run the job on this machine; returns the exit status to finish with
pub async fn run_local_command(
    config: Option<PathBuf>,
    options: RunLocalOptions,
    overrides: OverrideArgs,
) -> Result<i32> {
    let spec = load_job(config.as_deref(), overrides)?;

    if !options.skip_modules && SystemUtils::module_system(&std::env::vars().collect()).is_none() {
        warn!("No module system detected, `module` commands in the script will fail");
    }

    let launcher = LocalLauncher::new()
        .shell(options.shell.clone())
        .skip_modules(options.skip_modules)
        .enforce_time_limit(options.enforce_time_limit)
        .dry_run(options.dry_run);

    let report = with_async_operation_span("run-local", || {
        launch(&launcher, &spec, &options.script_dir, options.dry_run)
    })
    .await?;
    print_report(&report, options.json)?;
    Ok(report.outcome.exit_status())
}

/// Check what this machine needs to submit or run the job
pub async fn check_prerequisites_command(config: Option<PathBuf>) -> Result<()> {
    let spec = load_job(config.as_deref(), OverrideArgs::default())?;
    info!("Checking prerequisites for job {}", spec.scheduler.job_name);

    let checks = SystemUtils::check_prerequisites(&spec);
    let mut missing = Vec::new();

    for check in &checks {
        let mark = if check.available {
            "✓".green()
        } else if check.optional {
            "⚠".yellow()
        } else {
            "✗".red()
        };
        println!("{} {}: {}", mark, check.name, check.detail);

        if !check.available && !check.optional {
            missing.push(check.name.clone());
        }
    }

    if missing.is_empty() {
        info!("All required prerequisites are available");
        Ok(())
    } else {
        error!("Missing prerequisites: {}", missing.join(", "));
        Err(JobError::system(format!(
            "Missing prerequisites: {}",
            missing.join(", ")
        )))
    }
}
