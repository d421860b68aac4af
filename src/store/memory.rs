//! In-memory store.
//!
//! Used in tests and when embedding the workflow without a data directory.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::{CommanderError, Result};

use super::store::Store;
use super::types::{
    Execution, ExecutionId, ExecutionStatus, NewPlan, NewProject, Plan, PlanId, PlanStatus,
    Project, ProjectId,
};

/// Store that keeps every record in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    projects: RwLock<HashMap<ProjectId, Project>>,
    plans: RwLock<HashMap<PlanId, Plan>>,
    executions: RwLock<HashMap<ExecutionId, Execution>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_project(&self, project: NewProject) -> Result<Project> {
        let project = Project::create(project);
        self.projects
            .write()
            .await
            .insert(project.id, project.clone());
        Ok(project)
    }

    async fn get_project(&self, id: ProjectId) -> Result<Option<Project>> {
        Ok(self.projects.read().await.get(&id).cloned())
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        let mut projects: Vec<Project> = self.projects.read().await.values().cloned().collect();
        projects.sort_by_key(|project| project.created_at);
        Ok(projects)
    }

    async fn create_plan(&self, plan: NewPlan) -> Result<Plan> {
        let plan = Plan::create(plan);
        self.plans.write().await.insert(plan.id, plan.clone());
        Ok(plan)
    }

    async fn get_plan(&self, id: PlanId) -> Result<Option<Plan>> {
        Ok(self.plans.read().await.get(&id).cloned())
    }

    async fn update_plan_status(&self, id: PlanId, status: PlanStatus) -> Result<Plan> {
        let mut plans = self.plans.write().await;
        let plan = plans
            .get_mut(&id)
            .ok_or_else(|| CommanderError::not_found("Plan", id))?;
        plan.transition(status)?;
        Ok(plan.clone())
    }

    async fn create_execution(&self, plan_id: PlanId) -> Result<Execution> {
        let execution = Execution::create(plan_id);
        self.executions
            .write()
            .await
            .insert(execution.id, execution.clone());
        Ok(execution)
    }

    async fn get_execution(&self, id: ExecutionId) -> Result<Option<Execution>> {
        Ok(self.executions.read().await.get(&id).cloned())
    }

    async fn list_executions_for_plan(&self, plan_id: PlanId) -> Result<Vec<Execution>> {
        let mut executions: Vec<Execution> = self
            .executions
            .read()
            .await
            .values()
            .filter(|execution| execution.plan_id == plan_id)
            .cloned()
            .collect();
        executions.sort_by_key(|execution| execution.created_at);
        Ok(executions)
    }

    async fn append_execution_log(&self, id: ExecutionId, line: &str) -> Result<()> {
        let mut executions = self.executions.write().await;
        let execution = executions
            .get_mut(&id)
            .ok_or_else(|| CommanderError::not_found("Execution", id))?;
        execution.logs.push(line.to_string());
        Ok(())
    }

    async fn set_execution_status(
        &self,
        id: ExecutionId,
        status: ExecutionStatus,
    ) -> Result<Execution> {
        let mut executions = self.executions.write().await;
        let execution = executions
            .get_mut(&id)
            .ok_or_else(|| CommanderError::not_found("Execution", id))?;
        execution.transition(status)?;
        Ok(execution.clone())
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::store::conformance;

    #[tokio::test]
    async fn test_round_trips_records() {
        conformance::round_trips_records(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_enforces_transitions() {
        conformance::enforces_transitions(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_appends_logs_in_order() {
        conformance::appends_logs_in_order(&MemoryStore::new()).await;
    }

    #[test]
    fn test_backend_type() {
        assert_eq!(MemoryStore::new().backend_type(), "memory");
    }
}
