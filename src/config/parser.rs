//! Settings loader for files and environment overrides.
//!
//! Settings are resolved in three layers: built-in defaults, an optional YAML
//! file, then environment variables (optionally seeded from a `.env` file).

use crate::error::{CommanderError, ConfigError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::settings::Settings;

/// Loader for process settings.
#[derive(Debug, Default)]
pub struct SettingsLoader {
    /// Base path for resolving the `.env` file.
    base_path: Option<PathBuf>,
}

impl SettingsLoader {
    /// Creates a new settings loader.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path used to locate the `.env` file.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads settings from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Settings> {
        let path = path.as_ref();
        info!("Loading settings from: {}", path.display());

        if !path.exists() {
            return Err(CommanderError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            CommanderError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses settings from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<Settings> {
        debug!("Parsing YAML settings");

        if content.trim().is_empty() {
            return Ok(Settings::default());
        }

        serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            CommanderError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })
    }

    /// Loads settings from an optional file, then applies environment overrides.
    ///
    /// `lookup` resolves environment variable names; the binary passes
    /// `std::env::var`, tests pass a fixed map.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or an override is invalid.
    pub fn load<F>(&self, path: Option<&Path>, lookup: F) -> Result<Settings>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = match path {
            Some(path) => self.load_file(path)?,
            None => {
                debug!("No settings file, using defaults");
                Settings::default()
            }
        };

        apply_env_overrides(&mut settings, lookup)?;
        Ok(settings)
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                CommanderError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

/// Applies environment variable overrides to the settings.
///
/// # Errors
///
/// Returns an error if a boolean or numeric override cannot be parsed.
pub fn apply_env_overrides<F>(settings: &mut Settings, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("DRY_RUN") {
        debug!("Overriding safety.dry_run from environment");
        settings.safety.dry_run = parse_bool("DRY_RUN", &value)?;
    }

    if let Some(value) = lookup("ENABLE_LOCAL_EXECUTION") {
        debug!("Overriding safety.enable_local_execution from environment");
        settings.safety.enable_local_execution = parse_bool("ENABLE_LOCAL_EXECUTION", &value)?;
    }

    if let Some(provider) = lookup("DEPLOY_PROVIDER") {
        debug!("Overriding deploy.provider from environment");
        settings.deploy.provider = provider.trim().to_lowercase();
    }

    override_secret(&mut settings.deploy.vercel.token, lookup("VERCEL_TOKEN"));
    override_secret(&mut settings.deploy.vercel.org_id, lookup("VERCEL_ORG_ID"));
    override_secret(&mut settings.deploy.vercel.project_id, lookup("VERCEL_PROJECT_ID"));
    override_secret(&mut settings.deploy.render.api_key, lookup("RENDER_API_KEY"));
    override_secret(&mut settings.deploy.render.service_id, lookup("RENDER_SERVICE_ID"));

    if let Some(dir) = lookup("DATA_DIR") {
        debug!("Overriding storage.data_dir from environment");
        settings.storage.data_dir = PathBuf::from(dir);
    }

    if let Some(name) = lookup("RQ_QUEUE_NAME") {
        debug!("Overriding queue.name from environment");
        settings.queue.name = name;
    }

    if let Some(value) = lookup("QUEUE_POLL_INTERVAL_MS") {
        settings.queue.poll_interval_ms = value.trim().parse().map_err(|_| {
            CommanderError::Config(ConfigError::InvalidEnvValue {
                name: String::from("QUEUE_POLL_INTERVAL_MS"),
                value,
            })
        })?;
    }

    Ok(())
}

/// Empty values clear the setting rather than storing an empty credential.
fn override_secret(slot: &mut Option<String>, value: Option<String>) {
    if let Some(value) = value {
        let trimmed = value.trim();
        *slot = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
    }
}

/// Parses a boolean environment value.
///
/// # Errors
///
/// Returns an error for values outside the accepted spellings.
pub fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(CommanderError::Config(ConfigError::InvalidEnvValue {
            name: name.to_string(),
            value: value.to_string(),
        })),
    }
}

/// Default settings file names to search for.
pub const DEFAULT_SETTINGS_FILES: &[&str] = &["commander.yaml", "commander.yml"];

/// Finds the settings file in the given directory or its parents.
#[must_use]
pub fn find_settings_file(start_dir: impl AsRef<Path>) -> Option<PathBuf> {
    let mut current = start_dir.as_ref().to_path_buf();

    loop {
        for filename in DEFAULT_SETTINGS_FILES {
            let candidate = current.join(filename);
            if candidate.exists() {
                info!("Found settings file: {}", candidate.display());
                return Some(candidate);
            }
        }

        if !current.pop() {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_parse_partial_settings() {
        let yaml = r"
deploy:
  provider: render
  render:
    service_id: srv-123
";
        let settings = SettingsLoader::new().parse_yaml(yaml, None).unwrap();
        assert_eq!(settings.deploy.provider, "render");
        assert_eq!(settings.deploy.render.service_id.as_deref(), Some("srv-123"));
        assert!(settings.safety.dry_run);
        assert_eq!(settings.queue.name, "ai-devops");
    }

    #[test]
    fn test_empty_file_yields_defaults() {
        let settings = SettingsLoader::new().parse_yaml("  \n", None).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_invalid_yaml_is_rejected() {
        let result = SettingsLoader::new().parse_yaml("safety: [", None);
        assert!(matches!(
            result,
            Err(CommanderError::Config(ConfigError::ParseError { .. }))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::default();
        apply_env_overrides(
            &mut settings,
            env(&[
                ("DRY_RUN", "false"),
                ("ENABLE_LOCAL_EXECUTION", "1"),
                ("DEPLOY_PROVIDER", " Vercel "),
                ("VERCEL_TOKEN", "tok"),
                ("RENDER_API_KEY", ""),
                ("RQ_QUEUE_NAME", "deploys"),
            ]),
        )
        .unwrap();

        assert!(!settings.safety.dry_run);
        assert!(settings.safety.enable_local_execution);
        assert_eq!(settings.deploy.provider, "vercel");
        assert_eq!(settings.deploy.vercel.token.as_deref(), Some("tok"));
        assert_eq!(settings.deploy.render.api_key, None);
        assert_eq!(settings.queue.name, "deploys");
    }

    #[test]
    fn test_invalid_bool_override() {
        let mut settings = Settings::default();
        let result = apply_env_overrides(&mut settings, env(&[("DRY_RUN", "maybe")]));
        assert!(matches!(
            result,
            Err(CommanderError::Config(ConfigError::InvalidEnvValue { .. }))
        ));
        assert!(settings.safety.dry_run);
    }

    #[test]
    fn test_load_file_then_env() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("commander.yaml");
        std::fs::write(&path, "safety:\n  dry_run: false\n").unwrap();

        let settings = SettingsLoader::new()
            .load(Some(&path), env(&[("DRY_RUN", "yes")]))
            .unwrap();
        assert!(settings.safety.dry_run);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = SettingsLoader::new().load_file(dir.path().join("nope.yaml"));
        assert!(matches!(
            result,
            Err(CommanderError::Config(ConfigError::FileNotFound { .. }))
        ));
    }

    #[test]
    fn test_find_settings_file_walks_up() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("commander.yml"), "").unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let found = find_settings_file(&nested).unwrap();
        assert_eq!(found, dir.path().join("commander.yml"));
    }
}
