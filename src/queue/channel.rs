//! In-process queue backed by a tokio channel.

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, error::TryRecvError};
use tracing::debug;

use crate::error::{QueueError, Result};
use crate::store::ExecutionId;

use super::{Job, JobHandle, JobQueue};

/// Queue that only lives as long as the process.
#[derive(Debug)]
pub struct ChannelQueue {
    name: String,
    sender: UnboundedSender<Job>,
    receiver: Mutex<UnboundedReceiver<Job>>,
}

impl ChannelQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            name: name.into(),
            sender,
            receiver: Mutex::new(receiver),
        }
    }

    /// Returns the queue name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl JobQueue for ChannelQueue {
    async fn enqueue(&self, job_name: &str, execution_id: ExecutionId) -> Result<JobHandle> {
        let job = Job::new(job_name, execution_id);
        let handle = JobHandle {
            id: job.id,
            queue: self.name.clone(),
        };
        self.sender
            .send(job)
            .map_err(|e| QueueError::EnqueueFailed {
                message: e.to_string(),
            })?;
        debug!(queue = %self.name, job_id = %handle.id, "Job enqueued");
        Ok(handle)
    }

    async fn dequeue(&self) -> Result<Option<Job>> {
        match self.receiver.lock().await.try_recv() {
            Ok(job) => Ok(Some(job)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(QueueError::DequeueFailed {
                message: String::from("Queue channel closed"),
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::EXECUTE_PLAN_JOB;

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = ChannelQueue::new("test");
        let first = ExecutionId::new();
        let second = ExecutionId::new();

        queue.enqueue(EXECUTE_PLAN_JOB, first).await.unwrap();
        queue.enqueue(EXECUTE_PLAN_JOB, second).await.unwrap();

        assert_eq!(queue.dequeue().await.unwrap().unwrap().execution_id, first);
        assert_eq!(queue.dequeue().await.unwrap().unwrap().execution_id, second);
        assert!(queue.dequeue().await.unwrap().is_none());
    }
}
