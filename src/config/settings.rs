//! Settings types for the DevOps Commander.
//!
//! These structs map to `commander.yaml`. Every field has a default, so an
//! empty file (or no file at all) yields the safest configuration: dry-run on,
//! local execution off.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default Vercel API base URL.
pub const DEFAULT_VERCEL_API_BASE: &str = "https://api.vercel.com";

/// Default Render API base URL.
pub const DEFAULT_RENDER_API_BASE: &str = "https://api.render.com/v1";

/// Root settings, constructed once at process start.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Settings {
    /// Safety switches.
    pub safety: SafetySettings,
    /// Deployment provider selection and credentials.
    pub deploy: DeploySettings,
    /// Storage location.
    pub storage: StorageSettings,
    /// Work queue settings.
    pub queue: QueueSettings,
}

/// Global safety switches consulted before any side effect.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SafetySettings {
    /// Log intended actions only.
    pub dry_run: bool,
    /// Allow the local build pipeline to run.
    pub enable_local_execution: bool,
}

/// Deployment provider settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DeploySettings {
    /// Selected provider (`local`, `vercel` or `render`).
    pub provider: String,
    /// Vercel credentials.
    pub vercel: VercelSettings,
    /// Render credentials.
    pub render: RenderSettings,
    /// Local build pipeline settings.
    pub local: LocalSettings,
}

/// Vercel credentials and identifiers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct VercelSettings {
    /// API token.
    pub token: Option<String>,
    /// Team (organisation) id.
    pub org_id: Option<String>,
    /// Project id used for API redeploys.
    pub project_id: Option<String>,
    /// API base URL.
    pub api_base: String,
}

/// Render credentials and identifiers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RenderSettings {
    /// API key.
    pub api_key: Option<String>,
    /// Service to deploy.
    pub service_id: Option<String>,
    /// API base URL.
    pub api_base: String,
}

/// Local build pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LocalSettings {
    /// Build tool executable name.
    pub build_tool: String,
    /// Env file overlaid on the inherited environment, relative to the repo.
    pub env_file: String,
}

/// Storage settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory holding records and the queue spool.
    pub data_dir: PathBuf,
}

/// Work queue settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct QueueSettings {
    /// Queue name.
    pub name: String,
    /// Worker poll interval when the queue is idle.
    pub poll_interval_ms: u64,
}

impl Default for SafetySettings {
    fn default() -> Self {
        Self {
            dry_run: true,
            enable_local_execution: false,
        }
    }
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self {
            provider: String::from("local"),
            vercel: VercelSettings::default(),
            render: RenderSettings::default(),
            local: LocalSettings::default(),
        }
    }
}

impl Default for VercelSettings {
    fn default() -> Self {
        Self {
            token: None,
            org_id: None,
            project_id: None,
            api_base: DEFAULT_VERCEL_API_BASE.to_string(),
        }
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            service_id: None,
            api_base: DEFAULT_RENDER_API_BASE.to_string(),
        }
    }
}

impl Default for LocalSettings {
    fn default() -> Self {
        Self {
            build_tool: String::from("npm"),
            env_file: String::from(".env.production"),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
        }
    }
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            name: String::from("ai-devops"),
            poll_interval_ms: 1000,
        }
    }
}

impl Settings {
    /// Renders the settings for display with credentials masked.
    #[must_use]
    pub fn redacted_summary(&self) -> Vec<(String, String)> {
        vec![
            (String::from("dry_run"), self.safety.dry_run.to_string()),
            (
                String::from("enable_local_execution"),
                self.safety.enable_local_execution.to_string(),
            ),
            (String::from("deploy_provider"), self.deploy.provider.clone()),
            (String::from("vercel_token"), mask(self.deploy.vercel.token.as_deref())),
            (String::from("vercel_org_id"), show(self.deploy.vercel.org_id.as_deref())),
            (
                String::from("vercel_project_id"),
                show(self.deploy.vercel.project_id.as_deref()),
            ),
            (String::from("render_api_key"), mask(self.deploy.render.api_key.as_deref())),
            (
                String::from("render_service_id"),
                show(self.deploy.render.service_id.as_deref()),
            ),
            (String::from("build_tool"), self.deploy.local.build_tool.clone()),
            (
                String::from("data_dir"),
                self.storage.data_dir.display().to_string(),
            ),
            (String::from("queue"), self.queue.name.clone()),
        ]
    }
}

fn mask(secret: Option<&str>) -> String {
    match secret {
        Some(s) if !s.is_empty() => String::from("********"),
        _ => String::from("(unset)"),
    }
}

fn show(value: Option<&str>) -> String {
    value.map_or_else(|| String::from("(unset)"), ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_safe() {
        let settings = Settings::default();
        assert!(settings.safety.dry_run);
        assert!(!settings.safety.enable_local_execution);
        assert_eq!(settings.deploy.provider, "local");
        assert_eq!(settings.deploy.render.api_base, DEFAULT_RENDER_API_BASE);
    }

    #[test]
    fn test_summary_masks_secrets() {
        let mut settings = Settings::default();
        settings.deploy.render.api_key = Some(String::from("rnd_secret"));
        let summary = settings.redacted_summary();
        let key = summary
            .iter()
            .find(|(k, _)| k == "render_api_key")
            .map(|(_, v)| v.as_str());
        assert_eq!(key, Some("********"));
        assert!(!summary.iter().any(|(_, v)| v.contains("rnd_secret")));
    }
}
