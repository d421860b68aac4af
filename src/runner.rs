//! Execution runner.
//!
//! The single place where an orchestrator outcome becomes a terminal status.
//! Orchestrator errors are recorded in the execution log and never escape;
//! only store failures are returned to the caller.

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::Settings;
use crate::error::Result;
use crate::orchestrator::Orchestrator;
use crate::store::{ExecutionId, ExecutionStatus, PlanStatus, Store};

/// What happened to a job handed to the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The execution does not exist; nothing was touched.
    Skipped,
    /// The execution reached this terminal status.
    Finished(ExecutionStatus),
}

/// Runs executions to a terminal status.
#[derive(Clone)]
pub struct ExecutionRunner {
    store: Arc<dyn Store>,
    settings: Arc<Settings>,
}

impl ExecutionRunner {
    /// Creates a runner.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, settings: Arc<Settings>) -> Self {
        Self { store, settings }
    }

    /// Executes one execution.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store fails or the execution is not in a
    /// state that can start running.
    pub async fn execute(&self, execution_id: ExecutionId) -> Result<RunOutcome> {
        let store = self.store.as_ref();

        let Some(execution) = store.get_execution(execution_id).await? else {
            error!(execution_id = %execution_id, "Execution not found");
            return Ok(RunOutcome::Skipped);
        };

        let Some(plan) = store.get_plan(execution.plan_id).await? else {
            store.append_execution_log(execution_id, "Plan not found").await?;
            store
                .set_execution_status(execution_id, ExecutionStatus::Failed)
                .await?;
            error!(execution_id = %execution_id, plan_id = %execution.plan_id, "Plan not found");
            return Ok(RunOutcome::Finished(ExecutionStatus::Failed));
        };

        let Some(project) = store.get_project(plan.project_id).await? else {
            store
                .append_execution_log(execution_id, "Project not found")
                .await?;
            store
                .set_execution_status(execution_id, ExecutionStatus::Failed)
                .await?;
            store
                .update_plan_status(plan.id, PlanStatus::Failed)
                .await?;
            error!(execution_id = %execution_id, project_id = %plan.project_id, "Project not found");
            return Ok(RunOutcome::Finished(ExecutionStatus::Failed));
        };

        let execution = store
            .set_execution_status(execution_id, ExecutionStatus::Running)
            .await?;
        let plan = store.update_plan_status(plan.id, PlanStatus::Running).await?;
        info!(execution_id = %execution_id, project = %project.name, "Execution started");

        let orchestrator = Orchestrator::new(&self.settings, store);
        let (execution_status, plan_status) =
            match orchestrator.run(&project, &plan, &execution).await {
                Ok(()) => (ExecutionStatus::Succeeded, PlanStatus::Succeeded),
                Err(e) => {
                    warn!(execution_id = %execution_id, error = %e, "Execution failed");
                    store
                        .append_execution_log(execution_id, &format!("ERROR: {e}"))
                        .await?;
                    (ExecutionStatus::Failed, PlanStatus::Failed)
                }
            };

        store
            .set_execution_status(execution_id, execution_status)
            .await?;
        store.update_plan_status(plan.id, plan_status).await?;
        info!(execution_id = %execution_id, status = %execution_status, "Execution finished");

        Ok(RunOutcome::Finished(execution_status))
    }
}
