// file: src/config/loader.rs
// version: 1.0.0
// guid: 93edd02e-17e8-4e60-b1fd-502d3030170e

//! Job configuration loading with environment variable substitution

use super::JobSpec;
use crate::{JobError, Result};
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Project-local job file picked up when no `--config` is given
pub const PROJECT_CONFIG: &str = "cifar-job.yaml";

/// Serialization format of a job file, chosen by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
}

impl ConfigFormat {
    /// Detect the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            Some("toml") => Ok(Self::Toml),
            other => Err(JobError::config(format!(
                "Unsupported config extension {:?} for {}, expected .yaml, .yml or .toml",
                other.unwrap_or(""),
                path.display()
            ))),
        }
    }
}

/// Where a resolved job came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobSource {
    File(PathBuf),
    Canonical,
}

/// Configuration loader with environment variable substitution
pub struct ConfigLoader {
    env_vars: HashMap<String, String>,
}

impl ConfigLoader {
    /// Create a new config loader
    pub fn new() -> Self {
        Self {
            env_vars: std::env::vars().collect(),
        }
    }

    /// Create a loader that sees only the given variables
    pub fn with_env(env_vars: HashMap<String, String>) -> Self {
        Self { env_vars }
    }

    /// Set environment variable for substitution
    pub fn set_env_var(&mut self, key: String, value: String) {
        self.env_vars.insert(key, value);
    }

    /// Load and validate a job from a YAML or TOML file
    pub fn load_job_spec<P: AsRef<Path>>(&self, path: P) -> Result<JobSpec> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;

        let content = fs::read_to_string(path).map_err(|e| {
            JobError::config(format!(
                "Failed to read job config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let expanded = self.expand_env_vars(&content)?;
        let mut spec: JobSpec = match format {
            ConfigFormat::Yaml => serde_yaml::from_str(&expanded)?,
            ConfigFormat::Toml => toml::from_str(&expanded)?,
        };

        self.apply_env_overrides(&mut spec);
        spec.validate()?;

        debug!("Loaded job {} from {}", spec.scheduler.job_name, path.display());
        Ok(spec)
    }

    /// Resolve the job to use: an explicit file, the project file, the user
    /// file, or the canonical job, in that order
    pub fn resolve(&self, explicit: Option<&Path>) -> Result<(JobSpec, JobSource)> {
        if let Some(path) = explicit {
            let spec = self.load_job_spec(path)?;
            return Ok((spec, JobSource::File(path.to_path_buf())));
        }

        let mut candidates = vec![PathBuf::from(PROJECT_CONFIG)];
        if let Some(user) = user_config_path() {
            candidates.push(user);
        }

        for candidate in candidates {
            if candidate.exists() {
                info!("Loading job configuration from: {}", candidate.display());
                let spec = self.load_job_spec(&candidate)?;
                return Ok((spec, JobSource::File(candidate)));
            }
        }

        debug!("No job configuration found, using the canonical job");
        let mut spec = JobSpec::canonical();
        self.apply_env_overrides(&mut spec);
        spec.validate()?;
        Ok((spec, JobSource::Canonical))
    }

    /// Expand environment variables in configuration content
    fn expand_env_vars(&self, content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| JobError::config(format!("Invalid regex pattern: {}", e)))?;

        let mut result = content.to_string();
        let mut missing_vars = Vec::new();

        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let placeholder = &cap[0];

            if let Some(value) = self.env_vars.get(var_name) {
                result = result.replace(placeholder, value);
            } else if !missing_vars.iter().any(|v| v == var_name) {
                missing_vars.push(var_name.to_string());
            }
        }

        if !missing_vars.is_empty() {
            return Err(JobError::config(format!(
                "Missing environment variables: {}",
                missing_vars.join(", ")
            )));
        }

        Ok(result)
    }

    /// Apply `CIFAR_JOB_*` environment overrides
    fn apply_env_overrides(&self, spec: &mut JobSpec) {
        if let Some(partition) = self.env_vars.get("CIFAR_JOB_PARTITION") {
            debug!("Partition overridden from environment: {}", partition);
            spec.scheduler.partition = partition.clone();
        }

        if let Some(account) = self.env_vars.get("CIFAR_JOB_ACCOUNT") {
            debug!("Account overridden from environment: {}", account);
            spec.scheduler.account = account.clone();
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-user job file location
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("cifar-train-job").join("job.yaml"))
}

/// Write a job to YAML or TOML, chosen by extension
pub fn save_job_spec<P: AsRef<Path>>(path: P, spec: &JobSpec, force: bool) -> Result<()> {
    let path = path.as_ref();
    let format = ConfigFormat::from_path(path)?;

    if path.exists() && !force {
        return Err(JobError::config(format!(
            "{} already exists, pass --force to overwrite",
            path.display()
        )));
    }

    let content = match format {
        ConfigFormat::Yaml => serde_yaml::to_string(spec)?,
        ConfigFormat::Toml => toml::to_string_pretty(spec)?,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, content)?;

    info!("Wrote job configuration to {}", path.display());
    Ok(())
}
