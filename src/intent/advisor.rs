//! Advisory warnings attached to plans for human review.
//!
//! Warnings never block plan creation.

use super::types::{Action, Environment, PostStep};

/// Warning for plans targeting production.
pub const PRODUCTION_WARNING: &str =
    "Production environment selected: ensure change window and approvals.";

/// Warning for commands that could not be classified.
pub const LOW_CONFIDENCE_WARNING: &str =
    "Could not confidently classify action. Review plan carefully.";

/// Warning for plans without a test step.
pub const NO_TESTS_WARNING: &str = "No tests requested. Consider adding run_tests.";

/// Returns the advisory warnings for a classified command, in fixed order.
#[must_use]
pub fn advise(action: Action, environments: &[Environment], post_steps: &[PostStep]) -> Vec<String> {
    let mut warnings = Vec::new();

    if environments.contains(&Environment::Production) {
        warnings.push(PRODUCTION_WARNING.to_string());
    }
    if action == Action::Unknown {
        warnings.push(LOW_CONFIDENCE_WARNING.to_string());
    }
    if !post_steps.contains(&PostStep::RunTests) {
        warnings.push(NO_TESTS_WARNING.to_string());
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::classify;

    #[test]
    fn test_all_rules_in_order() {
        let warnings = advise(Action::Unknown, &[Environment::Production], &[]);
        assert_eq!(
            warnings,
            vec![PRODUCTION_WARNING, LOW_CONFIDENCE_WARNING, NO_TESTS_WARNING]
        );
    }

    #[test]
    fn test_clean_plan_has_no_warnings() {
        let warnings = advise(Action::Deploy, &[Environment::Staging], &[PostStep::RunTests]);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_unclassified_command_gets_low_confidence_warning() {
        let intent = classify("roll something out");
        let warnings = advise(intent.action, &intent.environments, &intent.post_steps);
        assert!(warnings.iter().any(|w| w == LOW_CONFIDENCE_WARNING));
    }
}
