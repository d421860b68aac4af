//! CLI module for the DevOps Commander.
//!
//! This module provides the command-line interface for registering
//! projects, reviewing and approving plans, and running the worker.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat, ProjectCommands};
pub use output::OutputFormatter;
