// file: src/utils/system.rs
// version: 1.0.0
// guid: 24ad5357-2fe5-4916-a598-95cf91fce196

//! System utility functions

use crate::config::JobSpec;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// One prerequisite and whether it was found
#[derive(Debug, Clone, Serialize)]
pub struct PrereqCheck {
    pub name: String,
    pub available: bool,
    pub detail: String,
    /// Submission still works without it
    pub optional: bool,
}

/// System utility functions
pub struct SystemUtils;

impl SystemUtils {
    /// Check if a command exists in PATH
    pub fn command_exists(command: &str) -> bool {
        which::which(command).is_ok()
    }

    /// Detect an environment module system
    ///
    /// `module` is a shell function, so look for the variables Lmod and
    /// Environment Modules export, then for `modulecmd` itself.
    pub fn module_system(env: &HashMap<String, String>) -> Option<String> {
        if let Some(cmd) = env.get("LMOD_CMD") {
            return Some(format!("Lmod ({})", cmd));
        }
        if let Some(home) = env.get("MODULESHOME") {
            return Some(format!("Environment Modules ({})", home));
        }
        if Self::command_exists("modulecmd") {
            return Some("modulecmd".to_string());
        }
        None
    }

    /// Check what submitting and running `spec` needs from this machine
    pub fn check_prerequisites(spec: &JobSpec) -> Vec<PrereqCheck> {
        let env: HashMap<String, String> = std::env::vars().collect();
        Self::check_prerequisites_with_env(spec, &env)
    }

    pub fn check_prerequisites_with_env(
        spec: &JobSpec,
        env: &HashMap<String, String>,
    ) -> Vec<PrereqCheck> {
        let mut checks = Vec::new();

        let sbatch = which::which("sbatch");
        checks.push(PrereqCheck {
            name: "sbatch".to_string(),
            available: sbatch.is_ok(),
            detail: match sbatch {
                Ok(path) => path.display().to_string(),
                Err(_) => "not on PATH, submit is unavailable".to_string(),
            },
            optional: false,
        });

        let modules = Self::module_system(env);
        checks.push(PrereqCheck {
            name: "module system".to_string(),
            available: modules.is_some(),
            detail: modules.unwrap_or_else(|| "not detected, module commands will fail".to_string()),
            optional: spec.environment.modules.is_empty() && !spec.environment.purge,
        });

        let interpreter = &spec.program.interpreter;
        let found = which::which(interpreter);
        checks.push(PrereqCheck {
            name: format!("interpreter `{}`", interpreter),
            available: found.is_ok(),
            detail: match found {
                Ok(path) => path.display().to_string(),
                Err(_) => "not on PATH before modules load".to_string(),
            },
            // usually provided by a module
            optional: !spec.environment.modules.is_empty(),
        });

        let script = expand(&spec.program.script);
        let exists = Path::new(&script).exists();
        checks.push(PrereqCheck {
            name: "training script".to_string(),
            available: exists,
            detail: if exists {
                script
            } else {
                format!("{} not found in {}", script, current_dir())
            },
            optional: false,
        });

        debug!("Prerequisite checks: {:?}", checks);
        checks
    }
}

fn expand(path: &Path) -> String {
    shellexpand::tilde(&path.to_string_lossy()).into_owned()
}

fn current_dir() -> String {
    std::env::current_dir()
        .map(|d| d.display().to_string())
        .unwrap_or_else(|_| ".".to_string())
}
