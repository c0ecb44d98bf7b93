// file: src/config/mod.rs
// version: 1.0.0
// guid: 80ef36f3-3856-41c9-b005-d2dbbdc7c486

//! Configuration module for the CIFAR training job
//!
//! Handles the job model, its typed resource values, the training program's
//! argument contract, and loading jobs from YAML or TOML files.

pub mod job;
pub mod loader;
pub mod resources;
pub mod training;

pub use job::{Invocation, JobSpec, ModuleEnvironment, Overrides, SchedulerDirectives};
pub use loader::{ConfigLoader, JobSource};
pub use resources::{MemoryLimit, WallTime};
pub use training::TrainingArgs;
