// file: src/cli/mod.rs
// version: 1.0.0
// guid: 300c2afb-de44-43c2-b61e-7ded6c563c89

//! Command line interface for the CIFAR training job tool

pub mod args;
pub mod commands;

pub use args::Cli;
pub use commands::*;
