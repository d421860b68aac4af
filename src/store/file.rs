//! File-based store.
//!
//! Each record is one JSON document under the data directory:
//!
//! ```text
//! <data_dir>/projects/<id>.json
//! <data_dir>/plans/<id>.json
//! <data_dir>/executions/<id>.json
//! ```
//!
//! Documents are replaced atomically (temp file, `sync_all`, rename), so a
//! reader never observes a half-written record.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::error::{CommanderError, Result, StoreError};

use super::store::Store;
use super::types::{
    Execution, ExecutionId, ExecutionStatus, NewPlan, NewProject, Plan, PlanId, PlanStatus,
    Project, ProjectId,
};

const PROJECTS_DIR: &str = "projects";
const PLANS_DIR: &str = "plans";
const EXECUTIONS_DIR: &str = "executions";

/// Store that keeps one JSON file per record.
#[derive(Debug)]
pub struct FileStore {
    base_dir: PathBuf,
    /// Serialises read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Creates a store rooted at `base_dir`. Directories are created lazily.
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the root directory of the store.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn record_path(&self, kind: &str, id: impl Display) -> PathBuf {
        self.base_dir.join(kind).join(format!("{id}.json"))
    }

    async fn read_record<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StoreError::corrupted(format!(
                    "Failed to read {}: {e}",
                    path.display()
                ))
                .into());
            }
        };

        trace!(path = %path.display(), "Read record");
        serde_json::from_str(&content).map(Some).map_err(|e| {
            StoreError::corrupted(format!("Failed to parse {}: {e}", path.display())).into()
        })
    }

    async fn write_record<T: Serialize + Sync>(&self, path: &Path, record: &T) -> Result<()> {
        let dir = path
            .parent()
            .ok_or_else(|| CommanderError::internal("Record path has no parent directory"))?;
        fs::create_dir_all(dir)
            .await
            .map_err(|e| StoreError::write(format!("Failed to create {}: {e}", dir.display())))?;

        let content = serde_json::to_string_pretty(record)
            .map_err(|e| StoreError::serialization(format!("Failed to serialize record: {e}")))?;

        let temp_path = path.with_extension("json.tmp");
        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| StoreError::write(format!("Failed to create temp file: {e}")))?;
        file.write_all(content.as_bytes())
            .await
            .map_err(|e| StoreError::write(format!("Failed to write temp file: {e}")))?;
        file.sync_all()
            .await
            .map_err(|e| StoreError::write(format!("Failed to sync temp file: {e}")))?;
        drop(file);

        fs::rename(&temp_path, path)
            .await
            .map_err(|e| StoreError::write(format!("Failed to rename temp file: {e}")))?;

        debug!(path = %path.display(), "Record saved");
        Ok(())
    }

    async fn read_all<T: DeserializeOwned>(&self, kind: &str) -> Result<Vec<T>> {
        let dir = self.base_dir.join(kind);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::corrupted(format!(
                    "Failed to list {}: {e}",
                    dir.display()
                ))
                .into());
            }
        };

        let mut records = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::corrupted(format!("Failed to list {}: {e}", dir.display())))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(record) = self.read_record(&path).await? {
                    records.push(record);
                }
            }
        }
        Ok(records)
    }

    async fn load_plan(&self, id: PlanId) -> Result<Plan> {
        self.read_record(&self.record_path(PLANS_DIR, id))
            .await?
            .ok_or_else(|| CommanderError::not_found("Plan", id))
    }

    async fn load_execution(&self, id: ExecutionId) -> Result<Execution> {
        self.read_record(&self.record_path(EXECUTIONS_DIR, id))
            .await?
            .ok_or_else(|| CommanderError::not_found("Execution", id))
    }
}

#[async_trait]
impl Store for FileStore {
    async fn create_project(&self, project: NewProject) -> Result<Project> {
        let project = Project::create(project);
        self.write_record(&self.record_path(PROJECTS_DIR, project.id), &project)
            .await?;
        Ok(project)
    }

    async fn get_project(&self, id: ProjectId) -> Result<Option<Project>> {
        self.read_record(&self.record_path(PROJECTS_DIR, id)).await
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        let mut projects: Vec<Project> = self.read_all(PROJECTS_DIR).await?;
        projects.sort_by_key(|project| project.created_at);
        Ok(projects)
    }

    async fn create_plan(&self, plan: NewPlan) -> Result<Plan> {
        let plan = Plan::create(plan);
        self.write_record(&self.record_path(PLANS_DIR, plan.id), &plan)
            .await?;
        Ok(plan)
    }

    async fn get_plan(&self, id: PlanId) -> Result<Option<Plan>> {
        self.read_record(&self.record_path(PLANS_DIR, id)).await
    }

    async fn update_plan_status(&self, id: PlanId, status: PlanStatus) -> Result<Plan> {
        let _guard = self.write_lock.lock().await;
        let mut plan = self.load_plan(id).await?;
        plan.transition(status)?;
        self.write_record(&self.record_path(PLANS_DIR, id), &plan)
            .await?;
        Ok(plan)
    }

    async fn create_execution(&self, plan_id: PlanId) -> Result<Execution> {
        let execution = Execution::create(plan_id);
        self.write_record(&self.record_path(EXECUTIONS_DIR, execution.id), &execution)
            .await?;
        Ok(execution)
    }

    async fn get_execution(&self, id: ExecutionId) -> Result<Option<Execution>> {
        self.read_record(&self.record_path(EXECUTIONS_DIR, id))
            .await
    }

    async fn list_executions_for_plan(&self, plan_id: PlanId) -> Result<Vec<Execution>> {
        let mut executions: Vec<Execution> = self
            .read_all::<Execution>(EXECUTIONS_DIR)
            .await?
            .into_iter()
            .filter(|execution| execution.plan_id == plan_id)
            .collect();
        executions.sort_by_key(|execution| execution.created_at);
        Ok(executions)
    }

    async fn append_execution_log(&self, id: ExecutionId, line: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut execution = self.load_execution(id).await?;
        execution.logs.push(line.to_string());
        self.write_record(&self.record_path(EXECUTIONS_DIR, id), &execution)
            .await
    }

    async fn set_execution_status(
        &self,
        id: ExecutionId,
        status: ExecutionStatus,
    ) -> Result<Execution> {
        let _guard = self.write_lock.lock().await;
        let mut execution = self.load_execution(id).await?;
        execution.transition(status)?;
        self.write_record(&self.record_path(EXECUTIONS_DIR, id), &execution)
            .await?;
        Ok(execution)
    }

    fn backend_type(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::store::conformance;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_round_trips_records() {
        let dir = TempDir::new().unwrap();
        conformance::round_trips_records(&FileStore::new(dir.path())).await;
    }

    #[tokio::test]
    async fn test_enforces_transitions() {
        let dir = TempDir::new().unwrap();
        conformance::enforces_transitions(&FileStore::new(dir.path())).await;
    }

    #[tokio::test]
    async fn test_appends_logs_in_order() {
        let dir = TempDir::new().unwrap();
        conformance::appends_logs_in_order(&FileStore::new(dir.path())).await;
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let (project, plan) = {
            let store = FileStore::new(dir.path());
            conformance::project_and_plan(&store).await
        };

        let reopened = FileStore::new(dir.path());
        assert_eq!(reopened.get_project(project.id).await.unwrap(), Some(project));
        assert_eq!(reopened.get_plan(plan.id).await.unwrap(), Some(plan.clone()));
        assert!(dir.path().join("plans").join(format!("{}.json", plan.id)).exists());
        assert!(!dir.path().join("plans").join(format!("{}.json.tmp", plan.id)).exists());
    }

    #[tokio::test]
    async fn test_corrupted_record_is_reported() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        let id = PlanId::new();
        std::fs::create_dir_all(dir.path().join("plans")).unwrap();
        std::fs::write(dir.path().join("plans").join(format!("{id}.json")), "{not json").unwrap();

        let err = store.get_plan(id).await.unwrap_err();
        assert!(matches!(err, CommanderError::Store(StoreError::Corrupted { .. })));
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_not_lost() {
        let dir = TempDir::new().unwrap();
        let store = std::sync::Arc::new(FileStore::new(dir.path()));
        let (_, plan) = conformance::project_and_plan(store.as_ref()).await;
        let execution = store.create_execution(plan.id).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .append_execution_log(execution.id, &format!("line {i}"))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let loaded = store.get_execution(execution.id).await.unwrap().unwrap();
        assert_eq!(loaded.logs.len(), 8);
    }
}
