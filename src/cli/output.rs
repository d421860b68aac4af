//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::deployer::DeploymentResult;
use crate::store::{Execution, ExecutionStatus, Plan, PlanStatus, Project};
use crate::workflow::ApprovalReceipt;

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Project row for table display.
#[derive(Tabled)]
struct ProjectRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Repository")]
    repo: String,
    #[tabled(rename = "Created")]
    created: String,
}

/// Settings row for table display.
#[derive(Tabled)]
struct SettingRow {
    #[tabled(rename = "Setting")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    fn json<T: Serialize + ?Sized>(value: &T) -> String {
        serde_json::to_string_pretty(value).unwrap_or_default()
    }

    /// Formats a single project.
    #[must_use]
    pub fn format_project(&self, project: &Project) -> String {
        match self.format {
            OutputFormat::Json => Self::json(project),
            OutputFormat::Text => format!(
                "{} Project {} created\n   ID: {}\n   Repository: {}\n",
                "✓".green(),
                project.name.bold(),
                project.id,
                Self::repo_of(project)
            ),
        }
    }

    /// Formats a list of projects.
    #[must_use]
    pub fn format_projects(&self, projects: &[Project]) -> String {
        match self.format {
            OutputFormat::Json => Self::json(projects),
            OutputFormat::Text => {
                if projects.is_empty() {
                    return String::from("No projects registered.\n");
                }
                let rows: Vec<ProjectRow> = projects
                    .iter()
                    .map(|p| ProjectRow {
                        id: p.id.to_string(),
                        name: p.name.clone(),
                        repo: Self::truncate(&Self::repo_of(p), 50),
                        created: p.created_at.format("%Y-%m-%d %H:%M").to_string(),
                    })
                    .collect();
                format!("{}\n", Table::new(rows))
            }
        }
    }

    /// Formats a plan for review.
    #[must_use]
    pub fn format_plan(&self, plan: &Plan) -> String {
        match self.format {
            OutputFormat::Json => Self::json(plan),
            OutputFormat::Text => Self::format_plan_text(plan),
        }
    }

    fn format_plan_text(plan: &Plan) -> String {
        let mut output = String::new();

        let _ = writeln!(output, "\nPlan {}", plan.id.to_string().bold());
        let _ = writeln!(output, "   Command: {}", plan.raw_command);
        let _ = writeln!(output, "   Status: {}", Self::plan_status(plan.status));
        let _ = writeln!(output, "   Action: {}", plan.action);
        let _ = writeln!(
            output,
            "   Version: {}",
            plan.version.as_deref().unwrap_or("latest")
        );
        let _ = writeln!(
            output,
            "   Environments: {}",
            join(&plan.environments)
        );
        let post_steps = if plan.post_steps.is_empty() {
            String::from("none")
        } else {
            join(&plan.post_steps)
        };
        let _ = writeln!(output, "   Post steps: {post_steps}");

        if !plan.warnings.is_empty() {
            output.push('\n');
            for warning in &plan.warnings {
                let _ = writeln!(output, "{} {warning}", "⚠".yellow());
            }
        }

        if plan.status == PlanStatus::PendingApproval {
            let _ = write!(
                output,
                "\nApprove with: commander approve {}\n",
                plan.id
            );
        }

        output
    }

    /// Formats an approval receipt.
    #[must_use]
    pub fn format_receipt(&self, receipt: &ApprovalReceipt) -> String {
        match self.format {
            OutputFormat::Json => Self::json(receipt),
            OutputFormat::Text => format!(
                "{} Plan approved\n   Execution: {}\n   Job: {}\n\nFollow with: commander execution {}\n",
                "✓".green(),
                receipt.execution_id,
                receipt.job_id,
                receipt.execution_id
            ),
        }
    }

    /// Formats an execution and its log.
    #[must_use]
    pub fn format_execution(&self, execution: &Execution) -> String {
        match self.format {
            OutputFormat::Json => Self::json(execution),
            OutputFormat::Text => {
                let mut output = String::new();
                let _ = writeln!(output, "\nExecution {}", execution.id.to_string().bold());
                let _ = writeln!(output, "   Plan: {}", execution.plan_id);
                let _ = writeln!(
                    output,
                    "   Status: {}",
                    Self::execution_status(execution.status)
                );
                if let Some(started) = execution.started_at {
                    let _ = writeln!(output, "   Started: {}", started.format("%Y-%m-%d %H:%M:%S"));
                }
                if let Some(finished) = execution.finished_at {
                    let _ = writeln!(
                        output,
                        "   Finished: {}",
                        finished.format("%Y-%m-%d %H:%M:%S")
                    );
                }

                if execution.logs.is_empty() {
                    output.push_str("\n   (no log lines yet)\n");
                } else {
                    output.push('\n');
                    for line in &execution.logs {
                        let _ = writeln!(output, "   {}", Self::log_line(line));
                    }
                }
                output
            }
        }
    }

    /// Formats a deployer result.
    #[must_use]
    pub fn format_deployment(&self, result: &DeploymentResult) -> String {
        match self.format {
            OutputFormat::Json => Self::json(result),
            OutputFormat::Text => {
                let marker = if result.success {
                    "✓".green()
                } else {
                    "✗".red()
                };
                let mut output = format!("{marker} {}\n", result.message);
                if let Some(id) = &result.deployment_id {
                    let _ = writeln!(output, "   Deployment: {id}");
                }
                if let Some(url) = &result.deployment_url {
                    let _ = writeln!(output, "   URL: {url}");
                }
                for (key, value) in &result.metadata {
                    let _ = writeln!(output, "   {key}: {value}");
                }
                for line in &result.logs {
                    let _ = writeln!(output, "   {}", line.dimmed());
                }
                output
            }
        }
    }

    /// Formats the effective settings.
    #[must_use]
    pub fn format_settings(&self, entries: &[(String, String)], warnings: &[String]) -> String {
        match self.format {
            OutputFormat::Json => {
                let settings: serde_json::Map<String, serde_json::Value> = entries
                    .iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                    .collect();
                Self::json(&serde_json::json!({ "settings": settings, "warnings": warnings }))
            }
            OutputFormat::Text => {
                let rows: Vec<SettingRow> = entries
                    .iter()
                    .map(|(key, value)| SettingRow {
                        key: key.clone(),
                        value: value.clone(),
                    })
                    .collect();
                let mut output = format!("{}\n", Table::new(rows));
                for warning in warnings {
                    let _ = writeln!(output, "{} {warning}", "⚠".yellow());
                }
                output
            }
        }
    }

    /// Formats the outcome of draining the queue.
    #[must_use]
    pub fn format_drain(&self, processed: usize) -> String {
        match self.format {
            OutputFormat::Json => Self::json(&serde_json::json!({ "processed": processed })),
            OutputFormat::Text => format!("{} Processed {processed} job(s)\n", "✓".green()),
        }
    }

    fn plan_status(status: PlanStatus) -> String {
        match status {
            PlanStatus::PendingApproval => status.as_str().yellow().to_string(),
            PlanStatus::Approved | PlanStatus::Running => status.as_str().cyan().to_string(),
            PlanStatus::Succeeded => status.as_str().green().to_string(),
            PlanStatus::Failed => status.as_str().red().to_string(),
            PlanStatus::RolledBack => status.as_str().dimmed().to_string(),
        }
    }

    fn execution_status(status: ExecutionStatus) -> String {
        match status {
            ExecutionStatus::Queued => status.as_str().yellow().to_string(),
            ExecutionStatus::Running => status.as_str().cyan().to_string(),
            ExecutionStatus::Succeeded => status.as_str().green().to_string(),
            ExecutionStatus::Failed => status.as_str().red().to_string(),
            ExecutionStatus::RolledBack => status.as_str().dimmed().to_string(),
        }
    }

    fn log_line(line: &str) -> String {
        if line.starts_with("ERROR:") {
            line.red().to_string()
        } else if line.starts_with('✓') {
            line.green().to_string()
        } else if line.starts_with("$ ") || line.starts_with("[DRY RUN]") {
            line.bold().to_string()
        } else {
            line.to_string()
        }
    }

    fn repo_of(project: &Project) -> String {
        project
            .repo_url
            .as_deref()
            .or(project.repo_path.as_deref())
            .unwrap_or("-")
            .to_string()
    }

    /// Truncates a string to a maximum number of characters.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{head}...")
        }
    }
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::{Action, Environment};
    use crate::store::{NewPlan, ProjectId};

    fn plan() -> Plan {
        Plan::create(NewPlan {
            project_id: ProjectId::new(),
            raw_command: String::from("ship it to prod"),
            action: Action::Unknown,
            version: None,
            environments: vec![Environment::Production],
            post_steps: Vec::new(),
            warnings: vec![String::from("Production environment selected")],
        })
    }

    #[test]
    fn test_plan_text_mentions_approval() {
        colored::control::set_override(false);
        let text = OutputFormatter::new(OutputFormat::Text).format_plan(&plan());
        assert!(text.contains("Environments: production"));
        assert!(text.contains("Post steps: none"));
        assert!(text.contains("⚠ Production environment selected"));
        assert!(text.contains("commander approve"));
    }

    #[test]
    fn test_plan_json_is_machine_readable() {
        let json = OutputFormatter::new(OutputFormat::Json).format_plan(&plan());
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["status"], "pending_approval");
        assert_eq!(value["environments"][0], "production");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(OutputFormatter::truncate("short", 10), "short");
        assert_eq!(OutputFormatter::truncate("ééééééééééé", 6), "ééé...");
    }
}
