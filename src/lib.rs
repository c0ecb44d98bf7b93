// file: src/lib.rs
// version: 1.0.0
// guid: cc1e54dd-d631-44e4-8ccd-6ec1637bbf56

//! # CIFAR-10 training job
//!
//! Models the Slurm job that trains a small CNN on CIFAR-10: the scheduler
//! directive block, the environment modules it loads and the single training
//! program it launches. The crate renders that job as an `sbatch` script,
//! reads existing scripts back, submits them and runs them locally.
//!
//! The training program is external; this crate only builds its argument
//! list and passes it through unchanged.

pub mod cli;
pub mod config;
pub mod error;
pub mod launch;
pub mod logging;
pub mod script;
pub mod utils;

pub use error::{JobError, Result};

/// Version information for the utility
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
