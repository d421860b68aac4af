//! Queue worker.
//!
//! Pulls one job at a time and hands it to the execution runner. A failing
//! job is logged and the worker moves on.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::queue::{EXECUTE_PLAN_JOB, JobQueue};
use crate::runner::{ExecutionRunner, RunOutcome};

/// Long-running consumer of the work queue.
pub struct Worker {
    queue: Arc<dyn JobQueue>,
    runner: ExecutionRunner,
    poll_interval: Duration,
}

impl Worker {
    /// Creates a worker.
    #[must_use]
    pub fn new(queue: Arc<dyn JobQueue>, runner: ExecutionRunner, poll_interval: Duration) -> Self {
        Self {
            queue,
            runner,
            poll_interval,
        }
    }

    /// Processes the next job, if any. Returns `false` when the queue was
    /// empty.
    ///
    /// # Errors
    ///
    /// Returns an error only if the queue itself fails.
    pub async fn process_next(&self) -> Result<bool> {
        let Some(job) = self.queue.dequeue().await? else {
            return Ok(false);
        };

        if job.name != EXECUTE_PLAN_JOB {
            warn!(job_id = %job.id, name = %job.name, "Skipping unknown job");
            return Ok(true);
        }

        match self.runner.execute(job.execution_id).await {
            Ok(RunOutcome::Finished(status)) => {
                info!(job_id = %job.id, execution_id = %job.execution_id, status = %status, "Job done");
            }
            Ok(RunOutcome::Skipped) => {
                warn!(job_id = %job.id, execution_id = %job.execution_id, "Job skipped");
            }
            Err(e) => {
                error!(job_id = %job.id, execution_id = %job.execution_id, error = %e, "Job failed");
            }
        }
        Ok(true)
    }

    /// Processes jobs until the queue is empty. Returns the number of jobs
    /// taken off the queue.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue fails.
    pub async fn drain(&self) -> Result<usize> {
        let mut processed = 0;
        while self.process_next().await? {
            processed += 1;
        }
        Ok(processed)
    }

    /// Polls the queue until `shutdown` resolves.
    ///
    /// A job in progress always runs to completion; shutdown is checked
    /// between jobs and while idle.
    ///
    /// # Errors
    ///
    /// Currently never fails; queue errors are logged and retried after the
    /// poll interval.
    pub async fn run<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(poll_interval_ms = self.poll_interval.as_millis(), "Worker started");

        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => break,
                () = std::future::ready(()) => {}
            }

            let idle = match self.process_next().await {
                Ok(processed) => !processed,
                Err(e) => {
                    error!(error = %e, "Queue error");
                    true
                }
            };

            if idle {
                tokio::select! {
                    () = &mut shutdown => break,
                    () = tokio::time::sleep(self.poll_interval) => {}
                }
            }
        }

        info!("Worker stopped");
        Ok(())
    }
}
