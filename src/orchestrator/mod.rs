//! Plan orchestration.
//!
//! The orchestrator turns an approved plan into deployer calls. It writes the
//! audit trail as it goes and returns an error for anything that should fail
//! the run; it never touches execution or plan status itself.

mod log;

pub use log::ExecutionLog;

use tracing::{info, instrument};

use crate::config::Settings;
use crate::deployer::{Deploy, DeployRequest, Deployer, LogSink};
use crate::error::{DeployError, Result};
use crate::store::{Execution, Plan, Project, Store};

/// Drives one execution of a plan.
pub struct Orchestrator<'a> {
    settings: &'a Settings,
    store: &'a dyn Store,
}

impl<'a> Orchestrator<'a> {
    /// Creates an orchestrator.
    #[must_use]
    pub fn new(settings: &'a Settings, store: &'a dyn Store) -> Self {
        Self { settings, store }
    }

    /// Runs the plan.
    ///
    /// Diagnostic lines are logged before any side effect. In dry-run mode
    /// only the intended action is logged and no deployer is created.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider is unknown, its configuration is
    /// incomplete, the policy gate refuses, or a deploy fails. Environments
    /// after a failed one are not attempted.
    #[instrument(skip_all, fields(execution_id = %execution.id, plan_id = %plan.id))]
    pub async fn run(&self, project: &Project, plan: &Plan, execution: &Execution) -> Result<()> {
        let mut log = ExecutionLog::new(self.store, execution.id);
        let provider = &self.settings.deploy.provider;

        log.record(format!("DRY_RUN={}", self.settings.safety.dry_run))
            .await?;
        log.record(format!("DEPLOY_PROVIDER={provider}")).await?;
        log.record(format!(
            "Action={} Version={} Env=[{}]",
            plan.action,
            plan.version.as_deref().unwrap_or("None"),
            join(&plan.environments)
        ))
        .await?;
        log.record(format!("PostSteps=[{}]", join(&plan.post_steps)))
            .await?;

        if self.settings.safety.dry_run {
            info!(provider = %provider, "Dry run, no deployer invoked");
            return log
                .record(format!(
                    "[DRY RUN] Would deploy via {provider}: git checkout, build, deploy"
                ))
                .await;
        }

        match Deployer::from_settings(self.settings)? {
            Deployer::Local(local) => {
                local
                    .execute(project.repo_path.as_deref(), &mut log)
                    .await
            }
            cloud => Self::deploy_to_cloud(&cloud, project, plan, &mut log).await,
        }
    }

    async fn deploy_to_cloud(
        deployer: &Deployer,
        project: &Project,
        plan: &Plan,
        log: &mut ExecutionLog<'_>,
    ) -> Result<()> {
        deployer.validate_config()?;
        log.record(format!("Deploying to {}...", deployer.name()))
            .await?;

        for environment in &plan.environments {
            log.record(format!("Deploying to {environment}...")).await?;

            let result = deployer
                .deploy(&DeployRequest {
                    project_name: &project.name,
                    repo_path: project.repo_path.as_deref(),
                    repo_url: project.repo_url.as_deref(),
                    environment: *environment,
                    version: plan.version.as_deref(),
                })
                .await;

            for line in result.logs {
                log.record(line).await?;
            }
            if let Some(url) = &result.deployment_url {
                log.record(format!("Deployment URL: {url}")).await?;
            }
            if !result.success {
                return Err(DeployError::external(result.message).into());
            }

            info!(environment = %environment, provider = deployer.name(), "Environment deployed");
            log.record(format!("✓ {environment} deployment: {}", result.message))
                .await?;
        }

        Ok(())
    }
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
