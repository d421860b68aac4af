//! Settings validation.
//!
//! Structural problems (unknown provider, empty queue name) are errors.
//! Missing provider credentials are only warnings here: each deployer checks
//! its own credentials before every deploy.

use crate::deployer::DeployProvider;
use crate::error::{CommanderError, ConfigError, Result};
use tracing::debug;

use super::settings::Settings;

/// Validator for process settings.
#[derive(Debug, Default)]
pub struct SettingsValidator;

/// Validation result containing all findings.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl SettingsValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates the settings.
    ///
    /// # Errors
    ///
    /// Returns the first error found, if any.
    pub fn validate(&self, settings: &Settings) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        Self::validate_deploy(settings, &mut result);
        Self::validate_queue(settings, &mut result);
        Self::validate_safety(settings, &mut result);

        if result.errors.is_empty() {
            debug!("Settings validation passed");
            Ok(result)
        } else {
            let first_error = &result.errors[0];
            Err(CommanderError::Config(ConfigError::ValidationError {
                message: first_error.message.clone(),
                field: Some(first_error.field.clone()),
            }))
        }
    }

    fn validate_deploy(settings: &Settings, result: &mut ValidationResult) {
        let provider = match settings.deploy.provider.parse::<DeployProvider>() {
            Ok(provider) => provider,
            Err(e) => {
                result.errors.push(ValidationError {
                    field: String::from("deploy.provider"),
                    message: e.to_string(),
                });
                return;
            }
        };

        let vercel = &settings.deploy.vercel;
        let render = &settings.deploy.render;

        match provider {
            DeployProvider::Vercel => {
                if vercel.token.is_none() {
                    result
                        .warnings
                        .push(String::from("VERCEL_TOKEN is not set; deployments will fail"));
                }
                if vercel.project_id.is_none() {
                    result.warnings.push(String::from(
                        "VERCEL_PROJECT_ID is not set; deployments rely on Git push auto-deploy",
                    ));
                }
            }
            DeployProvider::Render => {
                if render.api_key.is_none() || render.service_id.is_none() {
                    result.warnings.push(String::from(
                        "RENDER_API_KEY and RENDER_SERVICE_ID are required for Render deployments",
                    ));
                }
            }
            DeployProvider::Local => {
                if settings.deploy.local.build_tool.trim().is_empty() {
                    result.errors.push(ValidationError {
                        field: String::from("deploy.local.build_tool"),
                        message: String::from("Build tool cannot be empty"),
                    });
                }
            }
        }
    }

    fn validate_queue(settings: &Settings, result: &mut ValidationResult) {
        if settings.queue.name.trim().is_empty() {
            result.errors.push(ValidationError {
                field: String::from("queue.name"),
                message: String::from("Queue name cannot be empty"),
            });
        } else if settings.queue.name.contains(['/', '\\']) {
            result.errors.push(ValidationError {
                field: String::from("queue.name"),
                message: format!(
                    "Queue name '{}' cannot contain path separators",
                    settings.queue.name
                ),
            });
        }

        if settings.queue.poll_interval_ms == 0 {
            result.errors.push(ValidationError {
                field: String::from("queue.poll_interval_ms"),
                message: String::from("Poll interval must be greater than zero"),
            });
        }
    }

    fn validate_safety(settings: &Settings, result: &mut ValidationResult) {
        if !settings.safety.dry_run && settings.safety.enable_local_execution {
            result.warnings.push(String::from(
                "Dry-run is off and local execution is enabled: builds will run on this host",
            ));
        }
    }
}

impl ValidationResult {
    /// Returns true if there are no errors.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}
