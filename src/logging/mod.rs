// file: src/logging/mod.rs
// version: 1.0.0
// guid: 558f6844-bc13-496d-885c-1f6cc8d177c7

//! Logging system for the CIFAR training job tool

pub mod logger;

pub use logger::{init_logger, with_async_operation_span, with_operation_span};
