// file: src/config/training.rs
// version: 1.0.0
// guid: d62b1600-d070-4ab9-8b95-48be52601584

//! Argument contract of the external CIFAR-10 training program
//!
//! The training program owns the meaning of every flag. This module only knows
//! how to carry the values, check the obvious bounds and turn them into an
//! argument list.

use crate::{JobError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Hyperparameters and options passed to `train_cifar.py`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingArgs {
    /// `--learning-rate`
    pub learning_rate: f64,
    /// `--batch-size`, images per mini-batch
    pub batch_size: u32,
    /// `--data-aug-brightness`, colour jitter brightness factor (0 disables)
    pub data_aug_brightness: f64,
    /// `--dataset-root`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_root: Option<PathBuf>,
    /// `--log-dir`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
    /// `--epochs`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epochs: Option<u32>,
    /// `--val-frequency`, in epochs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub val_frequency: Option<u32>,
    /// `--log-frequency`, in steps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_frequency: Option<u32>,
    /// `--print-frequency`, in steps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub print_frequency: Option<u32>,
    /// `--worker-count`, data loader processes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_count: Option<u32>,
    /// `--data-aug-hflip`
    #[serde(default, skip_serializing_if = "is_false")]
    pub data_aug_hflip: bool,
    /// `--data-aug-reflection`, reflection padding in pixels
    #[serde(default, skip_serializing_if = "is_zero")]
    pub data_aug_reflection: u32,
    /// `--dropout`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dropout: Option<f64>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

/// Defaults of the training program itself, used when a flag is absent.
impl Default for TrainingArgs {
    fn default() -> Self {
        Self {
            learning_rate: 1e-2,
            batch_size: 128,
            data_aug_brightness: 0.0,
            dataset_root: None,
            log_dir: None,
            epochs: None,
            val_frequency: None,
            log_frequency: None,
            print_frequency: None,
            worker_count: None,
            data_aug_hflip: false,
            data_aug_reflection: 0,
            dropout: None,
        }
    }
}

/// Format a float the way it should appear on the command line.
///
/// Rust's `Display` for `f64` is the shortest string that parses back to the
/// same value, so the training program receives exactly the configured number.
pub fn format_number(value: f64) -> String {
    format!("{}", value)
}

impl TrainingArgs {
    /// Validate argument bounds
    pub fn validate(&self) -> Result<()> {
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(JobError::validation(format!(
                "Learning rate must be a positive number, got {}",
                self.learning_rate
            )));
        }

        if self.batch_size == 0 {
            return Err(JobError::validation("Batch size must be at least 1"));
        }

        if !self.data_aug_brightness.is_finite() || self.data_aug_brightness < 0.0 {
            return Err(JobError::validation(format!(
                "Brightness augmentation factor must be non-negative, got {}",
                self.data_aug_brightness
            )));
        }

        let counters = [
            ("epochs", self.epochs),
            ("val_frequency", self.val_frequency),
            ("log_frequency", self.log_frequency),
            ("print_frequency", self.print_frequency),
            ("worker_count", self.worker_count),
        ];
        for (name, value) in counters {
            if value == Some(0) {
                return Err(JobError::validation(format!("{} must be at least 1", name)));
            }
        }

        if let Some(p) = self.dropout {
            if !(0.0..1.0).contains(&p) {
                return Err(JobError::validation(format!(
                    "Dropout probability must be in [0, 1), got {}",
                    p
                )));
            }
        }

        Ok(())
    }

    /// Build the argument list for the training program.
    ///
    /// The three hyperparameters always come first and in a fixed order;
    /// optional flags follow only when they are set.
    pub fn to_cli_args(&self) -> Vec<String> {
        let mut args = vec![
            "--learning-rate".to_string(),
            format_number(self.learning_rate),
            "--batch-size".to_string(),
            self.batch_size.to_string(),
            "--data-aug-brightness".to_string(),
            format_number(self.data_aug_brightness),
        ];

        if let Some(ref root) = self.dataset_root {
            args.extend(["--dataset-root".to_string(), expand_path(root)]);
        }
        if let Some(ref dir) = self.log_dir {
            args.extend(["--log-dir".to_string(), expand_path(dir)]);
        }

        let counters = [
            ("--epochs", self.epochs),
            ("--val-frequency", self.val_frequency),
            ("--log-frequency", self.log_frequency),
            ("--print-frequency", self.print_frequency),
            ("--worker-count", self.worker_count),
        ];
        for (flag, value) in counters {
            if let Some(v) = value {
                args.extend([flag.to_string(), v.to_string()]);
            }
        }

        if self.data_aug_hflip {
            args.push("--data-aug-hflip".to_string());
        }
        if self.data_aug_reflection > 0 {
            args.extend([
                "--data-aug-reflection".to_string(),
                self.data_aug_reflection.to_string(),
            ]);
        }
        if let Some(p) = self.dropout {
            args.extend(["--dropout".to_string(), format_number(p)]);
        }

        args
    }

    /// Parse an argument list produced by [`TrainingArgs::to_cli_args`] or
    /// written by hand.
    ///
    /// Returns the recognised arguments plus every word that is not a known
    /// flag, in order. Absent hyperparameters take the training program's
    /// defaults.
    pub fn from_cli_args(words: &[String]) -> Result<(Self, Vec<String>)> {
        let mut args = Self::default();
        let mut extra = Vec::new();
        let mut iter = words.iter();

        while let Some(word) = iter.next() {
            let (flag, inline) = match word.split_once('=') {
                Some((flag, value)) if flag.starts_with("--") => (flag, Some(value.to_string())),
                _ => (word.as_str(), None),
            };

            if flag == "--data-aug-hflip" {
                args.data_aug_hflip = true;
                continue;
            }

            if !is_value_flag(flag) {
                extra.push(word.clone());
                continue;
            }

            let value = match inline {
                Some(value) => value,
                None => iter
                    .next()
                    .cloned()
                    .ok_or_else(|| JobError::validation(format!("Flag {} requires a value", flag)))?,
            };

            match flag {
                "--learning-rate" => args.learning_rate = parse_value(flag, &value)?,
                "--batch-size" => args.batch_size = parse_value(flag, &value)?,
                "--data-aug-brightness" => args.data_aug_brightness = parse_value(flag, &value)?,
                "--dataset-root" => args.dataset_root = Some(PathBuf::from(value)),
                "--log-dir" => args.log_dir = Some(PathBuf::from(value)),
                "--epochs" => args.epochs = Some(parse_value(flag, &value)?),
                "--val-frequency" => args.val_frequency = Some(parse_value(flag, &value)?),
                "--log-frequency" => args.log_frequency = Some(parse_value(flag, &value)?),
                "--print-frequency" => args.print_frequency = Some(parse_value(flag, &value)?),
                "-j" | "--worker-count" => args.worker_count = Some(parse_value(flag, &value)?),
                "--data-aug-reflection" => args.data_aug_reflection = parse_value(flag, &value)?,
                "--dropout" => args.dropout = Some(parse_value(flag, &value)?),
                _ => unreachable!("is_value_flag covers every arm"),
            }
        }

        Ok((args, extra))
    }
}

fn is_value_flag(flag: &str) -> bool {
    matches!(
        flag,
        "--learning-rate"
            | "--batch-size"
            | "--data-aug-brightness"
            | "--dataset-root"
            | "--log-dir"
            | "--epochs"
            | "--val-frequency"
            | "--log-frequency"
            | "--print-frequency"
            | "-j"
            | "--worker-count"
            | "--data-aug-reflection"
            | "--dropout"
    )
}

fn parse_value<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T> {
    value
        .parse::<T>()
        .map_err(|_| JobError::validation(format!("Invalid value for {}: {}", flag, value)))
}

fn expand_path(path: &std::path::Path) -> String {
    let raw = path.to_string_lossy();
    shellexpand::tilde(&raw).into_owned()
}
