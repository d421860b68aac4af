//! Request-boundary operations.
//!
//! Everything here runs synchronously from the caller's point of view and
//! rejects bad input (validation, not-found, conflict) before touching any
//! state. Approval only enqueues work; it never waits for a deployment.

use serde::Serialize;
use tracing::{info, warn};

use crate::config::Settings;
use crate::deployer::{Deploy, Deployer, DeploymentResult};
use crate::error::{CommanderError, Result};
use crate::intent::{advise, classify};
use crate::queue::{EXECUTE_PLAN_JOB, JobQueue};
use crate::store::{
    Execution, ExecutionId, ExecutionStatus, NewPlan, NewProject, Plan, PlanId, PlanStatus,
    Project, ProjectId, Store,
};

/// Maximum project name length, in characters.
pub const MAX_PROJECT_NAME_LEN: usize = 200;

/// Maximum instruction length, in characters.
pub const MAX_COMMAND_LEN: usize = 5000;

/// Result of approving a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApprovalReceipt {
    /// Execution created by the approval.
    pub execution_id: ExecutionId,
    /// Queue job carrying the execution.
    pub job_id: uuid::Uuid,
}

/// Entry point for user-facing operations.
pub struct Workflow<'a> {
    store: &'a dyn Store,
    queue: &'a dyn JobQueue,
    settings: &'a Settings,
}

impl<'a> Workflow<'a> {
    /// Creates a workflow over a store and a queue.
    #[must_use]
    pub fn new(store: &'a dyn Store, queue: &'a dyn JobQueue, settings: &'a Settings) -> Self {
        Self {
            store,
            queue,
            settings,
        }
    }

    /// Registers a project.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the name is empty or too long, or if neither a
    /// repo path nor a repo URL is given.
    pub async fn create_project(&self, input: NewProject) -> Result<Project> {
        let name = input.name.trim().to_string();
        check_length("name", &name, MAX_PROJECT_NAME_LEN)?;

        let repo_path = non_empty(input.repo_path);
        let repo_url = non_empty(input.repo_url);
        if repo_path.is_none() && repo_url.is_none() {
            return Err(CommanderError::validation(
                "repo_path",
                "Provide repo_path or repo_url",
            ));
        }

        let project = self
            .store
            .create_project(NewProject {
                name,
                repo_path,
                repo_url,
            })
            .await?;
        info!(project_id = %project.id, name = %project.name, "Project created");
        Ok(project)
    }

    /// Lists all projects.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn list_projects(&self) -> Result<Vec<Project>> {
        self.store.list_projects().await
    }

    /// Classifies an instruction and stores it as a plan awaiting approval.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for empty or oversized text and `NotFound` for an
    /// unknown project.
    pub async fn parse_command(&self, project_id: ProjectId, text: &str) -> Result<Plan> {
        check_length("text", text.trim(), MAX_COMMAND_LEN)?;
        if self.store.get_project(project_id).await?.is_none() {
            return Err(CommanderError::not_found("Project", project_id));
        }

        let intent = classify(text);
        let warnings = advise(intent.action, &intent.environments, &intent.post_steps);

        let plan = self
            .store
            .create_plan(NewPlan {
                project_id,
                raw_command: text.to_string(),
                action: intent.action,
                version: intent.version,
                environments: intent.environments,
                post_steps: intent.post_steps,
                warnings,
            })
            .await?;
        info!(plan_id = %plan.id, action = %plan.action, "Plan created");
        Ok(plan)
    }

    /// Loads a plan.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown plan.
    pub async fn get_plan(&self, plan_id: PlanId) -> Result<Plan> {
        self.store
            .get_plan(plan_id)
            .await?
            .ok_or_else(|| CommanderError::not_found("Plan", plan_id))
    }

    /// Approves a plan, creates its execution and enqueues it.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown plan and `Conflict` if the plan is not
    /// awaiting approval; in both cases nothing is created. If the queue
    /// rejects the job, the execution and plan are marked failed and the
    /// queue error is returned.
    pub async fn approve_plan(&self, plan_id: PlanId) -> Result<ApprovalReceipt> {
        let plan = self.get_plan(plan_id).await?;
        if plan.status != PlanStatus::PendingApproval {
            return Err(CommanderError::conflict(format!(
                "Plan status is {}",
                plan.status
            )));
        }

        self.store
            .update_plan_status(plan_id, PlanStatus::Approved)
            .await?;
        let execution = self.store.create_execution(plan_id).await?;
        let job = match self.queue.enqueue(EXECUTE_PLAN_JOB, execution.id).await {
            Ok(job) => job,
            Err(e) => {
                warn!(plan_id = %plan_id, execution_id = %execution.id, error = %e, "Enqueue failed");
                self.store
                    .append_execution_log(execution.id, &format!("Enqueue failed: {e}"))
                    .await?;
                self.store
                    .set_execution_status(execution.id, ExecutionStatus::Failed)
                    .await?;
                self.store
                    .update_plan_status(plan_id, PlanStatus::Failed)
                    .await?;
                return Err(e);
            }
        };

        info!(
            plan_id = %plan_id,
            execution_id = %execution.id,
            job_id = %job.id,
            queue = %job.queue,
            "Plan approved"
        );
        Ok(ApprovalReceipt {
            execution_id: execution.id,
            job_id: job.id,
        })
    }

    /// Loads an execution with its log.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown execution.
    pub async fn get_execution(&self, execution_id: ExecutionId) -> Result<Execution> {
        self.store
            .get_execution(execution_id)
            .await?
            .ok_or_else(|| CommanderError::not_found("Execution", execution_id))
    }

    /// Reads the provider-side status of a deployment.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured provider is unknown.
    pub async fn deployment_status(&self, deployment_id: &str) -> Result<DeploymentResult> {
        let deployer = Deployer::from_settings(self.settings)?;
        Ok(deployer.deployment_status(deployment_id).await)
    }

    /// Rolls an execution back through the configured provider.
    ///
    /// Only running or failed executions can be rolled back. In dry-run mode
    /// the intent is logged and nothing changes. On success the rollback's log
    /// lines are appended and both the execution and its plan move to
    /// `rolled_back`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown execution or plan, `Conflict` if the
    /// execution cannot be rolled back, or an error for an unknown provider.
    pub async fn rollback(
        &self,
        execution_id: ExecutionId,
        deployment_id: &str,
    ) -> Result<DeploymentResult> {
        let execution = self.get_execution(execution_id).await?;
        let plan = self.get_plan(execution.plan_id).await?;
        if !execution
            .status
            .can_transition_to(ExecutionStatus::RolledBack)
            || !plan.status.can_transition_to(PlanStatus::RolledBack)
        {
            return Err(CommanderError::conflict(format!(
                "Execution status is {}",
                execution.status
            )));
        }

        let provider = &self.settings.deploy.provider;
        if self.settings.safety.dry_run {
            let line = format!("[DRY RUN] Would roll back {deployment_id} via {provider}");
            self.store
                .append_execution_log(execution_id, &line)
                .await?;
            return Ok(DeploymentResult::ok(line));
        }

        let deployer = Deployer::from_settings(self.settings)?;
        let result = deployer.rollback(deployment_id).await;
        for line in &result.logs {
            self.store.append_execution_log(execution_id, line).await?;
        }
        self.store
            .append_execution_log(execution_id, &format!("Rollback: {}", result.message))
            .await?;

        if result.success {
            self.store
                .set_execution_status(execution_id, ExecutionStatus::RolledBack)
                .await?;
            self.store
                .update_plan_status(plan.id, PlanStatus::RolledBack)
                .await?;
            info!(execution_id = %execution_id, deployment_id, "Execution rolled back");
        }
        Ok(result)
    }
}

fn check_length(field: &str, value: &str, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len == 0 {
        return Err(CommanderError::validation(field, "cannot be empty"));
    }
    if len > max {
        return Err(CommanderError::validation(
            field,
            format!("must be at most {max} characters"),
        ));
    }
    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
