// file: src/utils/mod.rs
// version: 1.0.0
// guid: 52a474e5-bc1b-4aff-b121-7fd5ab0f0315

//! Utility modules for system checks

pub mod system;

pub use system::{PrereqCheck, SystemUtils};
