//! Store trait definition.
//!
//! This module defines the common interface for record storage backends.

use async_trait::async_trait;

use super::types::{
    Execution, ExecutionId, ExecutionStatus, NewPlan, NewProject, Plan, PlanId, PlanStatus,
    Project, ProjectId,
};
use crate::error::Result;

/// Trait for record storage backends.
///
/// Every mutating call is a single atomic operation: once it returns `Ok`, the
/// change is visible to every other reader of the same store.
#[async_trait]
pub trait Store: Send + Sync {
    /// Persists a new project.
    async fn create_project(&self, project: NewProject) -> Result<Project>;

    /// Loads a project. Returns `None` if it does not exist.
    async fn get_project(&self, id: ProjectId) -> Result<Option<Project>>;

    /// Lists all projects, oldest first.
    async fn list_projects(&self) -> Result<Vec<Project>>;

    /// Persists a new plan in `pending_approval`.
    async fn create_plan(&self, plan: NewPlan) -> Result<Plan>;

    /// Loads a plan. Returns `None` if it does not exist.
    async fn get_plan(&self, id: PlanId) -> Result<Option<Plan>>;

    /// Moves a plan to a new status.
    ///
    /// Fails with `NotFound` for an unknown plan and `Conflict` for an
    /// illegal transition.
    async fn update_plan_status(&self, id: PlanId, status: PlanStatus) -> Result<Plan>;

    /// Persists a new queued execution for a plan.
    async fn create_execution(&self, plan_id: PlanId) -> Result<Execution>;

    /// Loads an execution. Returns `None` if it does not exist.
    async fn get_execution(&self, id: ExecutionId) -> Result<Option<Execution>>;

    /// Lists the executions of a plan, oldest first.
    async fn list_executions_for_plan(&self, plan_id: PlanId) -> Result<Vec<Execution>>;

    /// Appends one line to an execution's log.
    async fn append_execution_log(&self, id: ExecutionId, line: &str) -> Result<()>;

    /// Moves an execution to a new status.
    ///
    /// Fails with `NotFound` for an unknown execution and `Conflict` for an
    /// illegal transition.
    async fn set_execution_status(
        &self,
        id: ExecutionId,
        status: ExecutionStatus,
    ) -> Result<Execution>;

    /// Gets the backend type name.
    fn backend_type(&self) -> &'static str;
}

/// Behaviour every backend must share.
#[cfg(test)]
pub(crate) mod conformance {
    use super::*;
    use crate::error::CommanderError;
    use crate::intent::{Action, Environment};

    pub async fn project_and_plan(store: &dyn Store) -> (Project, Plan) {
        let project = store
            .create_project(NewProject {
                name: String::from("shop"),
                repo_path: Some(String::from("/srv/shop")),
                repo_url: None,
            })
            .await
            .unwrap();
        let plan = store
            .create_plan(NewPlan {
                project_id: project.id,
                raw_command: String::from("deploy to prod"),
                action: Action::Deploy,
                version: None,
                environments: vec![Environment::Production],
                post_steps: Vec::new(),
                warnings: Vec::new(),
            })
            .await
            .unwrap();
        (project, plan)
    }

    pub async fn round_trips_records(store: &dyn Store) {
        let (project, plan) = project_and_plan(store).await;

        assert_eq!(store.get_project(project.id).await.unwrap(), Some(project.clone()));
        assert_eq!(store.get_plan(plan.id).await.unwrap(), Some(plan.clone()));
        assert_eq!(store.list_projects().await.unwrap(), vec![project]);
        assert!(store.get_plan(PlanId::new()).await.unwrap().is_none());
        assert!(store.get_execution(ExecutionId::new()).await.unwrap().is_none());
    }

    pub async fn enforces_transitions(store: &dyn Store) {
        let (_, plan) = project_and_plan(store).await;

        let err = store
            .update_plan_status(plan.id, PlanStatus::Running)
            .await
            .unwrap_err();
        assert!(matches!(err, CommanderError::Conflict { .. }));

        let approved = store
            .update_plan_status(plan.id, PlanStatus::Approved)
            .await
            .unwrap();
        assert_eq!(approved.status, PlanStatus::Approved);

        let err = store
            .update_plan_status(PlanId::new(), PlanStatus::Approved)
            .await
            .unwrap_err();
        assert!(matches!(err, CommanderError::NotFound { .. }));
    }

    pub async fn appends_logs_in_order(store: &dyn Store) {
        let (_, plan) = project_and_plan(store).await;
        let execution = store.create_execution(plan.id).await.unwrap();
        assert_eq!(execution.status, ExecutionStatus::Queued);

        for line in ["one", "two", "three"] {
            store.append_execution_log(execution.id, line).await.unwrap();
        }
        let running = store
            .set_execution_status(execution.id, ExecutionStatus::Running)
            .await
            .unwrap();
        assert!(running.started_at.is_some());

        let loaded = store.get_execution(execution.id).await.unwrap().unwrap();
        assert_eq!(loaded.logs, vec!["one", "two", "three"]);
        assert_eq!(loaded.status, ExecutionStatus::Running);

        let listed = store.list_executions_for_plan(plan.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, execution.id);

        let err = store
            .append_execution_log(ExecutionId::new(), "lost")
            .await
            .unwrap_err();
        assert!(matches!(err, CommanderError::NotFound { .. }));
    }
}
