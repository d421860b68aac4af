//! Policy gate for side-effecting local execution.
//!
//! Consulted only by the local build path. Cloud deployers validate their own
//! credentials instead.

use tracing::warn;

use crate::config::SafetySettings;
use crate::error::{DeployError, Result};

/// Remediation message returned when local execution is refused.
pub const LOCAL_EXECUTION_DISABLED: &str =
    "Local execution is disabled. Set ENABLE_LOCAL_EXECUTION=true and DRY_RUN=false explicitly.";

/// Pure predicate over the global safety switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyGate {
    dry_run: bool,
    local_execution_enabled: bool,
}

impl PolicyGate {
    /// Creates a gate from explicit flags.
    #[must_use]
    pub const fn new(dry_run: bool, local_execution_enabled: bool) -> Self {
        Self {
            dry_run,
            local_execution_enabled,
        }
    }

    /// Creates a gate from the safety settings.
    #[must_use]
    pub const fn from_settings(safety: &SafetySettings) -> Self {
        Self::new(safety.dry_run, safety.enable_local_execution)
    }

    /// Returns true if local execution may proceed.
    ///
    /// Dry-run always passes: nothing side-effecting happens in that mode.
    #[must_use]
    pub const fn is_execution_allowed(&self) -> bool {
        self.dry_run || self.local_execution_enabled
    }

    /// Fails with `PermissionDenied` unless local execution is allowed.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::PermissionDenied`] when dry-run is off and local
    /// execution has not been enabled.
    pub fn ensure_execution_allowed(&self) -> Result<()> {
        if self.is_execution_allowed() {
            return Ok(());
        }

        warn!("Local execution refused by policy gate");
        Err(DeployError::PermissionDenied {
            message: LOCAL_EXECUTION_DISABLED.to_string(),
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CommanderError;

    #[test]
    fn test_dry_run_always_permits() {
        assert!(PolicyGate::new(true, false).ensure_execution_allowed().is_ok());
        assert!(PolicyGate::new(true, true).ensure_execution_allowed().is_ok());
    }

    #[test]
    fn test_live_mode_requires_opt_in() {
        assert!(PolicyGate::new(false, true).ensure_execution_allowed().is_ok());

        let err = PolicyGate::new(false, false)
            .ensure_execution_allowed()
            .unwrap_err();
        assert!(matches!(
            err,
            CommanderError::Deploy(DeployError::PermissionDenied { .. })
        ));
        let message = err.to_string();
        assert!(message.contains("ENABLE_LOCAL_EXECUTION=true"));
        assert!(message.contains("DRY_RUN=false"));
    }

    #[test]
    fn test_defaults_permit_because_of_dry_run() {
        let gate = PolicyGate::from_settings(&SafetySettings::default());
        assert!(gate.is_execution_allowed());
    }
}
