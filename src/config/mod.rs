//! Configuration module for the DevOps Commander.
//!
//! This module handles all settings-related functionality:
//! - Deserializing `commander.yaml` with safe defaults
//! - Environment variable and `.env` overrides
//! - Validation of settings values

mod parser;
mod settings;
mod validator;

pub use parser::{
    DEFAULT_SETTINGS_FILES, SettingsLoader, apply_env_overrides, find_settings_file, parse_bool,
};
pub use settings::{
    DEFAULT_RENDER_API_BASE, DEFAULT_VERCEL_API_BASE, DeploySettings, LocalSettings,
    QueueSettings, RenderSettings, SafetySettings, Settings, StorageSettings, VercelSettings,
};
pub use validator::{SettingsValidator, ValidationResult};
