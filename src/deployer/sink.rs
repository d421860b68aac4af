//! Destination for log lines produced while deploying.

use async_trait::async_trait;

use crate::error::Result;

/// Receives log lines one at a time.
///
/// The orchestrator's sink writes each line durably to the execution log;
/// deployers called directly collect into a `Vec<String>`.
#[async_trait]
pub trait LogSink: Send {
    /// Records a single line.
    async fn record(&mut self, line: String) -> Result<()>;
}

#[async_trait]
impl LogSink for Vec<String> {
    async fn record(&mut self, line: String) -> Result<()> {
        self.push(line);
        Ok(())
    }
}
