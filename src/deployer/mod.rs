//! Deployment backends.
//!
//! Every backend implements [`Deploy`]. The set of backends is closed, so the
//! orchestrator works with the [`Deployer`] enum built by
//! [`Deployer::from_settings`].

mod http;
mod local;
mod render;
mod result;
mod sink;
mod vercel;

pub use local::{BuildPipeline, LocalDeployer, parse_env_file, strip_wrapping_quotes};
pub use render::RenderDeployer;
pub use result::{DeployRequest, DeploymentResult};
pub use sink::LogSink;
pub use vercel::{VercelDeployer, target_for};

use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::config::Settings;
use crate::error::{CommanderError, DeployError, Result};
use crate::policy::PolicyGate;

/// Capability shared by all deployment backends.
///
/// `deploy`, `deployment_status` and `rollback` never return errors: expected
/// failures come back as a [`DeploymentResult`] with `success = false`.
#[async_trait]
pub trait Deploy: Send + Sync {
    /// Display name of the backend.
    fn name(&self) -> &'static str;

    /// Checks that the backend has the credentials and switches it needs.
    ///
    /// # Errors
    ///
    /// Returns a configuration or permission error describing what is missing.
    fn validate_config(&self) -> Result<()>;

    /// Deploys one environment.
    async fn deploy(&self, request: &DeployRequest<'_>) -> DeploymentResult;

    /// Reads the provider-side status of a deployment.
    async fn deployment_status(&self, deployment_id: &str) -> DeploymentResult;

    /// Best-effort rollback to a previous deployment.
    async fn rollback(&self, deployment_id: &str) -> DeploymentResult;
}

/// Supported deployment providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployProvider {
    /// Build on this host.
    Local,
    /// Vercel REST API.
    Vercel,
    /// Render REST API.
    Render,
}

impl DeployProvider {
    /// Returns the configuration name of the provider.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Vercel => "vercel",
            Self::Render => "render",
        }
    }

    /// Returns true for the hosted providers.
    #[must_use]
    pub const fn is_cloud(self) -> bool {
        matches!(self, Self::Vercel | Self::Render)
    }
}

impl fmt::Display for DeployProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeployProvider {
    type Err = DeployError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "vercel" => Ok(Self::Vercel),
            "render" => Ok(Self::Render),
            _ => Err(DeployError::UnknownProvider {
                provider: s.to_string(),
            }),
        }
    }
}

/// The configured deployment backend.
#[derive(Debug, Clone)]
pub enum Deployer {
    /// Vercel backend.
    Vercel(VercelDeployer),
    /// Render backend.
    Render(RenderDeployer),
    /// Local build backend.
    Local(LocalDeployer),
}

impl Deployer {
    /// Builds the backend selected by `deploy.provider`.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider name is unknown or the HTTP client
    /// cannot be created.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let provider: DeployProvider = settings
            .deploy
            .provider
            .parse()
            .map_err(CommanderError::from)?;
        debug!(provider = %provider, "Creating deployer");

        Ok(match provider {
            DeployProvider::Vercel => Self::Vercel(VercelDeployer::new(&settings.deploy.vercel)?),
            DeployProvider::Render => Self::Render(RenderDeployer::new(&settings.deploy.render)?),
            DeployProvider::Local => Self::Local(LocalDeployer::new(
                PolicyGate::from_settings(&settings.safety),
                &settings.deploy.local,
            )),
        })
    }

    /// Returns the provider this backend implements.
    #[must_use]
    pub const fn provider(&self) -> DeployProvider {
        match self {
            Self::Vercel(_) => DeployProvider::Vercel,
            Self::Render(_) => DeployProvider::Render,
            Self::Local(_) => DeployProvider::Local,
        }
    }

    fn inner(&self) -> &dyn Deploy {
        match self {
            Self::Vercel(deployer) => deployer,
            Self::Render(deployer) => deployer,
            Self::Local(deployer) => deployer,
        }
    }
}

#[async_trait]
impl Deploy for Deployer {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn validate_config(&self) -> Result<()> {
        self.inner().validate_config()
    }

    async fn deploy(&self, request: &DeployRequest<'_>) -> DeploymentResult {
        self.inner().deploy(request).await
    }

    async fn deployment_status(&self, deployment_id: &str) -> DeploymentResult {
        self.inner().deployment_status(deployment_id).await
    }

    async fn rollback(&self, deployment_id: &str) -> DeploymentResult {
        self.inner().rollback(deployment_id).await
    }
}
