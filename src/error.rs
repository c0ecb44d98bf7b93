// file: src/error.rs
// version: 1.0.0
// guid: 5a9f65d5-575e-40e7-9cee-d44dc2af7258

use thiserror::Error;

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, JobError>;

/// Error types for job script handling
#[derive(Error, Debug)]
pub enum JobError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Script parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Process `{command}` failed with exit code {}: {stderr}", exit_code_text(.exit_code))]
    Process {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Submission error: {0}")]
    Submission(String),

    #[error("System error: {0}")]
    System(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

fn exit_code_text(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "none".to_string(),
    }
}

impl JobError {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new script parse error
    pub fn parse(line: usize, msg: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: msg.into(),
        }
    }

    /// Create a new timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a new submission error
    pub fn submission(msg: impl Into<String>) -> Self {
        Self::Submission(msg.into())
    }

    /// Create a new system error
    pub fn system(msg: impl Into<String>) -> Self {
        Self::System(msg.into())
    }
}
