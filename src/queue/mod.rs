//! Work queue between approval and execution.
//!
//! Approval enqueues one job per execution and returns immediately. A worker
//! dequeues jobs and hands them to the execution runner.

mod channel;
mod spool;

pub use channel::ChannelQueue;
pub use spool::SpoolQueue;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::store::ExecutionId;

/// Name of the job that runs an approved plan.
pub const EXECUTE_PLAN_JOB: &str = "execute_plan";

/// A unit of work carried by the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Job id, unique per enqueue.
    pub id: Uuid,
    /// Job name; the worker only knows [`EXECUTE_PLAN_JOB`].
    pub name: String,
    /// Execution the job refers to.
    pub execution_id: ExecutionId,
    /// When the job was submitted.
    pub enqueued_at: DateTime<Utc>,
}

impl Job {
    /// Creates a new job.
    #[must_use]
    pub fn new(name: &str, execution_id: ExecutionId) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            execution_id,
            enqueued_at: Utc::now(),
        }
    }
}

/// Receipt for a submitted job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobHandle {
    /// Job id.
    pub id: Uuid,
    /// Queue the job was submitted to.
    pub queue: String,
}

/// Trait for work queue backends.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Submits a job for an execution.
    async fn enqueue(&self, job_name: &str, execution_id: ExecutionId) -> Result<JobHandle>;

    /// Claims the oldest pending job, if any.
    async fn dequeue(&self) -> Result<Option<Job>>;
}
