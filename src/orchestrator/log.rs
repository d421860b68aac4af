//! Execution log sink.

use async_trait::async_trait;

use crate::deployer::LogSink;
use crate::error::Result;
use crate::store::{ExecutionId, Store};

/// Writes each line straight to an execution's durable log.
pub struct ExecutionLog<'a> {
    store: &'a dyn Store,
    execution_id: ExecutionId,
}

impl<'a> ExecutionLog<'a> {
    /// Creates a sink for one execution.
    #[must_use]
    pub fn new(store: &'a dyn Store, execution_id: ExecutionId) -> Self {
        Self {
            store,
            execution_id,
        }
    }
}

#[async_trait]
impl LogSink for ExecutionLog<'_> {
    async fn record(&mut self, line: String) -> Result<()> {
        self.store
            .append_execution_log(self.execution_id, &line)
            .await
    }
}
