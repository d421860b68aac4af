//! Deployment request and result types shared by every backend.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::intent::Environment;

/// Parameters for a single deployment to one environment.
#[derive(Debug, Clone, Copy)]
pub struct DeployRequest<'a> {
    /// Project display name.
    pub project_name: &'a str,
    /// Local checkout of the project, if any.
    pub repo_path: Option<&'a str>,
    /// Remote repository URL, if any.
    pub repo_url: Option<&'a str>,
    /// Target environment.
    pub environment: Environment,
    /// Version or git ref to deploy.
    pub version: Option<&'a str>,
}

/// Outcome of a deployer operation.
///
/// Expected failures are reported through `success = false` rather than
/// through an error, so callers always get the collected log lines.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeploymentResult {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Human-readable summary.
    pub message: String,
    /// Public URL of the deployment.
    pub deployment_url: Option<String>,
    /// Provider-side deployment id.
    pub deployment_id: Option<String>,
    /// Log lines collected during the operation.
    pub logs: Vec<String>,
    /// Provider-specific details.
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl DeploymentResult {
    /// Creates a successful result.
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            deployment_url: None,
            deployment_id: None,
            logs: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Creates a failed result.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            ..Self::ok(message)
        }
    }

    /// Attaches collected log lines.
    #[must_use]
    pub fn with_logs(mut self, logs: Vec<String>) -> Self {
        self.logs = logs;
        self
    }

    /// Attaches a deployment URL.
    #[must_use]
    pub fn with_url(mut self, url: Option<String>) -> Self {
        self.deployment_url = url;
        self
    }

    /// Attaches a deployment id.
    #[must_use]
    pub fn with_id(mut self, id: Option<String>) -> Self {
        self.deployment_id = id;
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

impl std::fmt::Display for DeploymentResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let outcome = if self.success { "succeeded" } else { "failed" };
        write!(f, "{outcome}: {}", self.message)?;
        if let Some(url) = &self.deployment_url {
            write!(f, " ({url})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let result = DeploymentResult::ok("done")
            .with_url(Some(String::from("https://app.example.com")))
            .with_id(Some(String::from("dep-1")))
            .with_metadata("status", "live");

        assert!(result.success);
        assert_eq!(result.metadata["status"], "live");
        assert_eq!(result.to_string(), "succeeded: done (https://app.example.com)");
    }

    #[test]
    fn test_failed_keeps_message() {
        let result = DeploymentResult::failed("nope").with_logs(vec![String::from("line")]);
        assert!(!result.success);
        assert_eq!(result.message, "nope");
        assert_eq!(result.logs.len(), 1);
    }
}
