//! Durable queue backed by a spool directory.
//!
//! Jobs are JSON files under `<data_dir>/queue/<name>/`, named so that a
//! lexical sort yields submission order. A consumer claims a job by renaming
//! it to `*.claimed`; rename is atomic, so two workers never claim the same
//! file. A claimed job is removed once decoded, which makes delivery
//! at-most-once after the claim.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::{QueueError, Result};
use crate::store::ExecutionId;

use super::{Job, JobHandle, JobQueue};

const JOB_EXTENSION: &str = "json";
const CLAIMED_EXTENSION: &str = "claimed";

/// Queue persisted as one file per job.
#[derive(Debug, Clone)]
pub struct SpoolQueue {
    name: String,
    dir: PathBuf,
}

impl SpoolQueue {
    /// Creates a queue named `name` under `<data_dir>/queue/`.
    #[must_use]
    pub fn new(data_dir: &Path, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            dir: data_dir.join("queue").join(&name),
            name,
        }
    }

    /// Returns the queue name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the spool directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Counts the jobs waiting to be claimed.
    ///
    /// # Errors
    ///
    /// Returns an error if the spool directory cannot be read.
    pub async fn pending(&self) -> Result<usize> {
        Ok(self.pending_files().await?.len())
    }

    async fn pending_files(&self) -> Result<Vec<PathBuf>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(dequeue_error(format!("Failed to read spool: {e}"))),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| dequeue_error(format!("Failed to read spool: {e}")))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == JOB_EXTENSION) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    async fn write_job(&self, job: &Job) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir).await?;

        let stem = format!(
            "{:020}-{}",
            job.enqueued_at.timestamp_nanos_opt().unwrap_or_default(),
            job.id
        );
        let temp_path = self.dir.join(format!("{stem}.tmp"));
        let final_path = self.dir.join(format!("{stem}.{JOB_EXTENSION}"));

        let content = serde_json::to_vec(job)?;
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(&content).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &final_path).await
    }

    async fn claim(&self, path: &Path) -> Result<Option<Job>> {
        let claimed = path.with_extension(CLAIMED_EXTENSION);
        match fs::rename(path, &claimed).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(dequeue_error(format!("Failed to claim job: {e}"))),
        }

        let content = fs::read(&claimed)
            .await
            .map_err(|e| dequeue_error(format!("Failed to read claimed job: {e}")))?;
        let job: Job = serde_json::from_slice(&content).map_err(|e| {
            dequeue_error(format!(
                "Failed to decode job {}: {e}",
                claimed.display()
            ))
        })?;

        if let Err(e) = fs::remove_file(&claimed).await {
            warn!(path = %claimed.display(), error = %e, "Failed to remove claimed job");
        }
        Ok(Some(job))
    }
}

fn dequeue_error(message: String) -> crate::error::CommanderError {
    QueueError::DequeueFailed { message }.into()
}

#[async_trait]
impl JobQueue for SpoolQueue {
    async fn enqueue(&self, job_name: &str, execution_id: ExecutionId) -> Result<JobHandle> {
        let job = Job::new(job_name, execution_id);
        self.write_job(&job)
            .await
            .map_err(|e| QueueError::EnqueueFailed {
                message: format!("Failed to write job to {}: {e}", self.dir.display()),
            })?;

        debug!(queue = %self.name, job_id = %job.id, execution_id = %execution_id, "Job spooled");
        Ok(JobHandle {
            id: job.id,
            queue: self.name.clone(),
        })
    }

    async fn dequeue(&self) -> Result<Option<Job>> {
        for path in self.pending_files().await? {
            if let Some(job) = self.claim(&path).await? {
                debug!(queue = %self.name, job_id = %job.id, "Job claimed");
                return Ok(Some(job));
            }
        }
        Ok(None)
    }
}
