//! Vercel deployer.
//!
//! Redeploys the latest deployment of the configured project through the
//! Vercel REST API. Without a project id the deployer falls back to Git push
//! auto-deploy and only reports what will happen.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::VercelSettings;
use crate::error::{DeployError, Result};
use crate::intent::Environment;

use super::Deploy;
use super::http::{STATUS_TIMEOUT_SECS, authorized, build_client, endpoint};
use super::result::{DeployRequest, DeploymentResult};

/// Ready states that count as a healthy deployment.
const HEALTHY_STATES: [&str; 3] = ["READY", "QUEUED", "BUILDING"];

/// Deployer backed by the Vercel API.
#[derive(Debug, Clone)]
pub struct VercelDeployer {
    client: Client,
    token: Option<String>,
    org_id: Option<String>,
    project_id: Option<String>,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct DeploymentList {
    #[serde(default)]
    deployments: Vec<DeploymentSummary>,
}

#[derive(Debug, Deserialize)]
struct DeploymentSummary {
    uid: String,
    url: Option<String>,
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeploymentDetails {
    id: Option<String>,
    url: Option<String>,
    ready_state: Option<String>,
    created: Option<serde_json::Value>,
}

/// Maps an environment onto a Vercel deployment target.
#[must_use]
pub const fn target_for(environment: Environment) -> &'static str {
    if environment.is_production() {
        "production"
    } else {
        "preview"
    }
}

impl VercelDeployer {
    /// Creates a deployer from the Vercel settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(settings: &VercelSettings) -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            token: settings.token.clone(),
            org_id: settings.org_id.clone(),
            project_id: settings.project_id.clone(),
            api_base: settings.api_base.clone(),
        })
    }

    fn token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                DeployError::configuration("VERCEL_TOKEN is required for Vercel deployments")
                    .into()
            })
    }

    fn team_query(&self) -> Vec<(&'static str, String)> {
        self.org_id
            .iter()
            .map(|team| ("teamId", team.clone()))
            .collect()
    }

    async fn deploy_via_api(
        &self,
        token: &str,
        project_id: &str,
        request: &DeployRequest<'_>,
        logs: &mut Vec<String>,
    ) -> std::result::Result<DeploymentResult, reqwest::Error> {
        let target = target_for(request.environment);
        logs.push(String::from("Creating deployment via Vercel API..."));

        let mut query = self.team_query();
        query.push(("projectId", project_id.to_string()));
        query.push(("limit", String::from("1")));

        let listing: DeploymentList = authorized(
            self.client.get(endpoint(&self.api_base, "v6/deployments")),
            token,
        )
        .query(&query)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

        let Some(latest) = listing.deployments.into_iter().next() else {
            logs.push(String::from(
                "No existing deployments found. Connect your Git repo to Vercel first.",
            ));
            return Ok(DeploymentResult::failed(
                "No deployments found. Please connect your Git repository to Vercel.",
            ));
        };

        logs.push(format!(
            "Latest deployment: https://{}",
            latest.url.as_deref().unwrap_or_default()
        ));
        logs.push(format!(
            "State: {}",
            latest.state.as_deref().unwrap_or("unknown")
        ));

        let mut body = json!({
            "name": request.project_name,
            "target": target,
            "deploymentId": latest.uid,
        });
        if let Some(version) = request.version {
            body["gitSource"] = json!({ "ref": version, "type": "github" });
        }

        debug!(project_id, target, "Triggering Vercel redeploy");
        let response = authorized(
            self.client.post(endpoint(&self.api_base, "v13/deployments")),
            token,
        )
        .query(&self.team_query())
        .json(&body)
        .send()
        .await?;

        let status = response.status();
        if status == StatusCode::OK || status == StatusCode::CREATED {
            let created: DeploymentDetails = response.json().await?;
            let url = format!("https://{}", created.url.unwrap_or_default());
            logs.push(format!("New deployment triggered: {url}"));
            info!(url = %url, "Vercel deployment triggered");

            return Ok(DeploymentResult::ok("Deployment triggered successfully")
                .with_url(Some(url))
                .with_id(created.id)
                .with_metadata(
                    "state",
                    created
                        .ready_state
                        .unwrap_or_else(|| String::from("BUILDING")),
                ));
        }

        let text = response.text().await.unwrap_or_default();
        logs.push(format!("Redeploy failed: {text}"));
        Ok(DeploymentResult::failed(format!(
            "Vercel redeploy failed: {} - {text}",
            status.as_u16()
        )))
    }

    async fn fetch_status(
        &self,
        token: &str,
        deployment_id: &str,
    ) -> std::result::Result<DeploymentResult, reqwest::Error> {
        let details: DeploymentDetails = authorized(
            self.client.get(endpoint(
                &self.api_base,
                &format!("v13/deployments/{deployment_id}"),
            )),
            token,
        )
        .query(&self.team_query())
        .timeout(Duration::from_secs(STATUS_TIMEOUT_SECS))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

        let state = details
            .ready_state
            .unwrap_or_else(|| String::from("UNKNOWN"));
        let healthy = HEALTHY_STATES.contains(&state.as_str());
        let message = format!("Deployment state: {state}");
        let result = if healthy {
            DeploymentResult::ok(message)
        } else {
            DeploymentResult::failed(message)
        };

        Ok(result
            .with_url(Some(format!("https://{}", details.url.unwrap_or_default())))
            .with_id(Some(deployment_id.to_string()))
            .with_metadata("state", state)
            .with_metadata("created", details.created.unwrap_or_default()))
    }
}

#[async_trait]
impl Deploy for VercelDeployer {
    fn name(&self) -> &'static str {
        "Vercel"
    }

    fn validate_config(&self) -> Result<()> {
        self.token().map(|_| ())
    }

    async fn deploy(&self, request: &DeployRequest<'_>) -> DeploymentResult {
        let token = match self.token() {
            Ok(token) => token,
            Err(e) => return DeploymentResult::failed(e.to_string()),
        };

        let target = target_for(request.environment);
        let mut logs = vec![
            format!("Triggering Vercel deployment for {}", request.project_name),
            format!(
                "Target: {target}, Version: {}",
                request.version.unwrap_or("latest")
            ),
        ];

        if let Some(project_id) = self.project_id.as_deref() {
            return match self
                .deploy_via_api(token, project_id, request, &mut logs)
                .await
            {
                Ok(result) => result.with_logs(logs),
                Err(e) => {
                    warn!(error = %e, "Vercel deploy failed");
                    logs.push(format!("HTTP Error: {e}"));
                    DeploymentResult::failed(e.to_string()).with_logs(logs)
                }
            };
        }

        if let Some(repo_url) = request.repo_url {
            logs.push(String::from(
                "Git-based deployment: Push to your repo to trigger Vercel deployment",
            ));
            logs.push(format!("Repo: {repo_url}"));
            logs.push(String::from(
                "Vercel will auto-deploy on push to main/master branch",
            ));
            return DeploymentResult::ok(
                "Git-connected projects deploy automatically on push. Check Vercel dashboard.",
            )
            .with_logs(logs)
            .with_metadata("deploy_method", "git_push");
        }

        DeploymentResult::failed("No VERCEL_PROJECT_ID or repo_url configured for deployment")
            .with_logs(logs)
    }

    async fn deployment_status(&self, deployment_id: &str) -> DeploymentResult {
        let token = match self.token() {
            Ok(token) => token,
            Err(e) => return DeploymentResult::failed(e.to_string()),
        };

        self.fetch_status(token, deployment_id)
            .await
            .unwrap_or_else(|e| DeploymentResult::failed(e.to_string()))
    }

    async fn rollback(&self, deployment_id: &str) -> DeploymentResult {
        let token = match self.token() {
            Ok(token) => token,
            Err(e) => return DeploymentResult::failed(e.to_string()),
        };
        let Some(project_id) = self.project_id.as_deref() else {
            return DeploymentResult::failed("VERCEL_PROJECT_ID is required for Vercel rollback");
        };

        let url = endpoint(
            &self.api_base,
            &format!("v10/projects/{project_id}/promote/{deployment_id}"),
        );
        let response = match authorized(self.client.post(url), token)
            .query(&self.team_query())
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return DeploymentResult::failed(e.to_string()),
        };

        let status = response.status();
        if status == StatusCode::OK || status == StatusCode::CREATED {
            info!(deployment_id, "Vercel deployment promoted");
            return DeploymentResult::ok(format!("Rolled back to deployment {deployment_id}"))
                .with_id(Some(deployment_id.to_string()));
        }

        let text = response.text().await.unwrap_or_default();
        DeploymentResult::failed(format!("Rollback failed: {text}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(server: &MockServer, project_id: Option<&str>) -> VercelSettings {
        VercelSettings {
            token: Some(String::from("vercel-token")),
            org_id: None,
            project_id: project_id.map(String::from),
            api_base: server.uri(),
        }
    }

    fn request(environment: Environment, version: Option<&'static str>) -> DeployRequest<'static> {
        DeployRequest {
            project_name: "shop",
            repo_path: None,
            repo_url: Some("https://github.com/acme/shop"),
            environment,
            version,
        }
    }

    #[test]
    fn test_target_mapping() {
        assert_eq!(target_for(Environment::Production), "production");
        assert_eq!(target_for(Environment::Staging), "preview");
        assert_eq!(target_for(Environment::Dev), "preview");
    }

    #[tokio::test]
    async fn test_missing_token_fails_validation() {
        let server = MockServer::start().await;
        let mut config = settings(&server, Some("prj_1"));
        config.token = None;
        let deployer = VercelDeployer::new(&config).unwrap();

        let err = deployer.validate_config().unwrap_err();
        assert_eq!(
            err.to_string(),
            "VERCEL_TOKEN is required for Vercel deployments"
        );

        let result = deployer.deploy(&request(Environment::Staging, None)).await;
        assert!(!result.success);
    }

    #[tokio::test]
    async fn test_redeploys_latest_deployment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v6/deployments"))
            .and(query_param("projectId", "prj_1"))
            .and(query_param("limit", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "deployments": [{"uid": "dpl_old", "url": "shop-old.vercel.app", "state": "READY"}]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v13/deployments"))
            .and(body_partial_json(json!({
                "name": "shop",
                "target": "production",
                "deploymentId": "dpl_old",
                "gitSource": {"ref": "1.4.2", "type": "github"}
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "dpl_new",
                "url": "shop-new.vercel.app",
                "readyState": "QUEUED"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let deployer = VercelDeployer::new(&settings(&server, Some("prj_1"))).unwrap();
        let result = deployer
            .deploy(&request(Environment::Production, Some("1.4.2")))
            .await;

        assert!(result.success, "{result}");
        assert_eq!(
            result.deployment_url.as_deref(),
            Some("https://shop-new.vercel.app")
        );
        assert_eq!(result.deployment_id.as_deref(), Some("dpl_new"));
        assert_eq!(result.metadata["state"], "QUEUED");
        assert!(
            result
                .logs
                .contains(&String::from("Latest deployment: https://shop-old.vercel.app"))
        );
    }

    #[tokio::test]
    async fn test_no_existing_deployments() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v6/deployments"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"deployments": []})))
            .mount(&server)
            .await;

        let deployer = VercelDeployer::new(&settings(&server, Some("prj_1"))).unwrap();
        let result = deployer.deploy(&request(Environment::Staging, None)).await;

        assert!(!result.success);
        assert_eq!(
            result.message,
            "No deployments found. Please connect your Git repository to Vercel."
        );
    }

    #[tokio::test]
    async fn test_redeploy_rejection_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v6/deployments"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "deployments": [{"uid": "dpl_old"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v13/deployments"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let deployer = VercelDeployer::new(&settings(&server, Some("prj_1"))).unwrap();
        let result = deployer.deploy(&request(Environment::Staging, None)).await;

        assert!(!result.success);
        assert_eq!(result.message, "Vercel redeploy failed: 403 - forbidden");
    }

    #[tokio::test]
    async fn test_git_push_fallback_without_project_id() {
        let server = MockServer::start().await;
        let deployer = VercelDeployer::new(&settings(&server, None)).unwrap();

        let result = deployer.deploy(&request(Environment::Dev, None)).await;
        assert!(result.success);
        assert_eq!(result.metadata["deploy_method"], "git_push");
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn test_nothing_to_deploy() {
        let server = MockServer::start().await;
        let deployer = VercelDeployer::new(&settings(&server, None)).unwrap();
        let mut req = request(Environment::Dev, None);
        req.repo_url = None;

        let result = deployer.deploy(&req).await;
        assert!(!result.success);
        assert_eq!(
            result.message,
            "No VERCEL_PROJECT_ID or repo_url configured for deployment"
        );
    }

    #[tokio::test]
    async fn test_status_maps_ready_state() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v13/deployments/dpl_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "url": "shop.vercel.app",
                "readyState": "ERROR"
            })))
            .mount(&server)
            .await;

        let deployer = VercelDeployer::new(&settings(&server, Some("prj_1"))).unwrap();
        let result = deployer.deployment_status("dpl_1").await;

        assert!(!result.success);
        assert_eq!(result.message, "Deployment state: ERROR");
    }

    #[tokio::test]
    async fn test_rollback_promotes_deployment() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v10/projects/prj_1/promote/dpl_prev"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let deployer = VercelDeployer::new(&settings(&server, Some("prj_1"))).unwrap();
        let result = deployer.rollback("dpl_prev").await;

        assert!(result.success);
        assert_eq!(result.message, "Rolled back to deployment dpl_prev");
    }
}
