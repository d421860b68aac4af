//! Render deployer.
//!
//! Triggers deploys on a single Render service. Rollback is approximated by
//! triggering a fresh deploy of the service's current configuration; Render's
//! API offers no redeploy of an arbitrary historical commit through this path.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::RenderSettings;
use crate::error::{DeployError, Result};

use super::Deploy;
use super::http::{STATUS_TIMEOUT_SECS, authorized, build_client, endpoint};
use super::result::{DeployRequest, DeploymentResult};

/// Deploy statuses that count as healthy or still progressing.
const HEALTHY_STATUSES: [&str; 5] = [
    "created",
    "build_in_progress",
    "update_in_progress",
    "live",
    "pre_deploy_in_progress",
];

/// Deployer backed by the Render API.
#[derive(Debug, Clone)]
pub struct RenderDeployer {
    client: Client,
    api_key: Option<String>,
    service_id: Option<String>,
    api_base: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeployRecord {
    id: Option<String>,
    status: Option<String>,
    created_at: Option<serde_json::Value>,
    finished_at: Option<serde_json::Value>,
    commit: Option<CommitRef>,
}

#[derive(Debug, Deserialize)]
struct CommitRef {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceEnvelope {
    service: Option<ServiceBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceBody {
    service_details: Option<ServiceDetails>,
}

#[derive(Debug, Deserialize)]
struct ServiceDetails {
    url: Option<String>,
}

/// Credentials that passed validation.
struct Credentials<'a> {
    api_key: &'a str,
    service_id: &'a str,
}

impl RenderDeployer {
    /// Creates a deployer from the Render settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(settings: &RenderSettings) -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            api_key: settings.api_key.clone(),
            service_id: settings.service_id.clone(),
            api_base: settings.api_base.clone(),
        })
    }

    fn credentials(&self) -> Result<Credentials<'_>> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                DeployError::configuration("RENDER_API_KEY is required for Render deployments")
            })?;
        let service_id = self
            .service_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                DeployError::configuration("RENDER_SERVICE_ID is required for Render deployments")
            })?;

        Ok(Credentials {
            api_key,
            service_id,
        })
    }

    fn deploys_url(&self, service_id: &str) -> String {
        endpoint(&self.api_base, &format!("services/{service_id}/deploys"))
    }

    async fn trigger(
        &self,
        creds: &Credentials<'_>,
        body: serde_json::Value,
        logs: &mut Vec<String>,
    ) -> std::result::Result<DeploymentResult, reqwest::Error> {
        logs.push(String::from("Triggering deploy via Render API..."));

        let response = authorized(self.client.post(self.deploys_url(creds.service_id)), creds.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::CREATED {
            let text = response.text().await.unwrap_or_default();
            logs.push(format!("Deploy failed: {text}"));
            return Ok(DeploymentResult::failed(format!(
                "Render deploy failed: {} - {text}",
                status.as_u16()
            )));
        }

        let record: DeployRecord = response.json().await?;
        let deploy_status = record.status.unwrap_or_else(|| String::from("created"));
        logs.push(String::from("Deploy triggered successfully!"));
        logs.push(format!(
            "Deploy ID: {}",
            record.id.as_deref().unwrap_or("unknown")
        ));
        logs.push(format!("Status: {deploy_status}"));

        let service_url = self.service_url(creds).await;
        if let Some(url) = &service_url {
            logs.push(format!("Service URL: {url}"));
        }

        info!(service_id = creds.service_id, "Render deploy triggered");
        Ok(DeploymentResult::ok("Render deployment triggered successfully")
            .with_url(service_url)
            .with_id(record.id)
            .with_metadata("status", deploy_status))
    }

    /// Best-effort lookup of the service's public URL.
    async fn service_url(&self, creds: &Credentials<'_>) -> Option<String> {
        let url = endpoint(&self.api_base, &format!("services/{}", creds.service_id));
        let response = authorized(self.client.get(url), creds.api_key)
            .send()
            .await
            .ok()?;
        if response.status() != StatusCode::OK {
            debug!(status = %response.status(), "Render service lookup skipped");
            return None;
        }

        let envelope: ServiceEnvelope = response.json().await.ok()?;
        envelope.service?.service_details?.url
    }

    async fn fetch_deploy(
        &self,
        creds: &Credentials<'_>,
        deployment_id: &str,
    ) -> std::result::Result<DeployRecord, reqwest::Error> {
        authorized(
            self.client
                .get(format!("{}/{deployment_id}", self.deploys_url(creds.service_id))),
            creds.api_key,
        )
        .timeout(Duration::from_secs(STATUS_TIMEOUT_SECS))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await
    }
}

#[async_trait]
impl Deploy for RenderDeployer {
    fn name(&self) -> &'static str {
        "Render"
    }

    fn validate_config(&self) -> Result<()> {
        self.credentials().map(|_| ())
    }

    async fn deploy(&self, request: &DeployRequest<'_>) -> DeploymentResult {
        let creds = match self.credentials() {
            Ok(creds) => creds,
            Err(e) => return DeploymentResult::failed(e.to_string()),
        };

        let mut logs = vec![
            format!("Triggering Render deployment for {}", request.project_name),
            format!("Service ID: {}", creds.service_id),
            format!(
                "Environment: {}, Version: {}",
                request.environment,
                request.version.unwrap_or("latest")
            ),
        ];

        let body = if request.version.is_some() {
            json!({ "clearCache": "do_not_clear" })
        } else {
            json!({})
        };

        match self.trigger(&creds, body, &mut logs).await {
            Ok(result) => result.with_logs(logs),
            Err(e) => {
                warn!(error = %e, "Render deploy failed");
                logs.push(format!("HTTP Error: {e}"));
                DeploymentResult::failed(e.to_string()).with_logs(logs)
            }
        }
    }

    async fn deployment_status(&self, deployment_id: &str) -> DeploymentResult {
        let creds = match self.credentials() {
            Ok(creds) => creds,
            Err(e) => return DeploymentResult::failed(e.to_string()),
        };

        match self.fetch_deploy(&creds, deployment_id).await {
            Ok(record) => {
                let status = record.status.unwrap_or_else(|| String::from("unknown"));
                let message = format!("Deployment status: {status}");
                let result = if HEALTHY_STATUSES.contains(&status.as_str()) {
                    DeploymentResult::ok(message)
                } else {
                    DeploymentResult::failed(message)
                };
                result
                    .with_id(Some(deployment_id.to_string()))
                    .with_metadata("status", status)
                    .with_metadata("created_at", record.created_at.unwrap_or_default())
                    .with_metadata("finished_at", record.finished_at.unwrap_or_default())
            }
            Err(e) => DeploymentResult::failed(e.to_string()),
        }
    }

    async fn rollback(&self, deployment_id: &str) -> DeploymentResult {
        let creds = match self.credentials() {
            Ok(creds) => creds,
            Err(e) => return DeploymentResult::failed(e.to_string()),
        };

        let commit = match self.fetch_deploy(&creds, deployment_id).await {
            Ok(record) => record.commit.and_then(|commit| commit.id),
            Err(e) => {
                warn!(error = %e, deployment_id, "Could not read deploy commit");
                None
            }
        };
        let mut logs = vec![format!(
            "Rolling back to commit: {}",
            commit.as_deref().unwrap_or("unknown")
        )];

        match self
            .trigger(&creds, json!({ "clearCache": "do_not_clear" }), &mut logs)
            .await
        {
            Ok(result) if result.success => {
                logs.push(format!(
                    "Rollback deploy triggered: {}",
                    result.deployment_id.as_deref().unwrap_or("unknown")
                ));
                DeploymentResult::ok("Rollback deployment triggered")
                    .with_id(result.deployment_id)
                    .with_logs(logs)
            }
            Ok(result) => {
                DeploymentResult::failed(format!("Rollback failed: {}", result.message))
                    .with_logs(logs)
            }
            Err(e) => {
                logs.push(format!("Error: {e}"));
                DeploymentResult::failed(e.to_string()).with_logs(logs)
            }
        }
    }
}
