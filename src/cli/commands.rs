//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Commander - turn plain-language deploy instructions into approvable plans.
#[derive(Parser, Debug)]
#[command(name = "commander")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the settings file.
    #[arg(short, long, global = true, env = "COMMANDER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a starter settings file and `.env.example`.
    Init {
        /// Directory to initialize (defaults to current directory).
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Force overwrite existing files.
        #[arg(short, long)]
        force: bool,
    },

    /// Manage projects.
    Project {
        /// Project subcommand.
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Classify an instruction into a plan awaiting approval.
    Parse {
        /// Project the instruction applies to.
        #[arg(short, long)]
        project: String,

        /// The instruction, e.g. "deploy v1.6 to staging and run tests".
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Show a plan.
    Plan {
        /// Plan id.
        id: String,
    },

    /// Approve a plan and queue its execution.
    Approve {
        /// Plan id.
        id: String,
    },

    /// Show an execution and its log.
    Execution {
        /// Execution id.
        id: String,
    },

    /// Run queued executions.
    Worker {
        /// Process the queue until empty, then exit.
        #[arg(long)]
        drain: bool,
    },

    /// Show the provider-side status of a deployment.
    Status {
        /// Provider deployment id.
        deployment_id: String,
    },

    /// Roll an execution back through the configured provider.
    Rollback {
        /// Execution id.
        execution_id: String,

        /// Provider deployment id to roll back to.
        deployment_id: String,
    },

    /// Show the effective settings with secrets masked.
    Config,
}

/// Project management subcommands.
#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// Register a project.
    Add {
        /// Project name.
        name: String,

        /// Local checkout used by the local build pipeline.
        #[arg(long)]
        repo_path: Option<String>,

        /// Remote repository URL.
        #[arg(long)]
        repo_url: Option<String>,
    },

    /// List projects.
    List,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_joins_words() {
        let cli = Cli::parse_from([
            "commander",
            "parse",
            "--project",
            "abc",
            "deploy",
            "v1.6",
            "to",
            "staging",
        ]);
        match cli.command {
            Commands::Parse { project, text } => {
                assert_eq!(project, "abc");
                assert_eq!(text.join(" "), "deploy v1.6 to staging");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["commander", "worker", "--drain", "--output", "json", "-v"]);
        assert!(cli.verbose);
        assert!(matches!(cli.output, OutputFormat::Json));
        assert!(matches!(cli.command, Commands::Worker { drain: true }));
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
