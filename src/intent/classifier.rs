//! Deterministic keyword classifier for deployment commands.
//!
//! Classification is pure and total: any text yields an [`Intent`], with
//! unrecognised commands mapped to [`Action::Unknown`].

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use super::types::{Action, Environment, PostStep};

/// Dotted numeric version, optionally prefixed with `v`.
const VERSION_PATTERN: &str = r"\bv?(\d+\.\d+(?:\.\d+)*)\b";

/// Environment tokens and their aliases.
const ENVIRONMENT_PATTERN: &str = r"\b(dev|staging|stage|production|prod)\b";

static VERSION_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(VERSION_PATTERN).ok());

static ENVIRONMENT_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(ENVIRONMENT_PATTERN).ok());

/// Structured reading of a free-text command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Intent {
    /// Classified action.
    pub action: Action,
    /// Version or ref mentioned in the command.
    pub version: Option<String>,
    /// Target environments, never empty.
    pub environments: Vec<Environment>,
    /// Steps to run after deploying.
    pub post_steps: Vec<PostStep>,
}

/// Classifies a free-text command.
#[must_use]
pub fn classify(text: &str) -> Intent {
    let lowered = text.trim().to_lowercase();

    let action = if lowered.contains("deploy") {
        Action::Deploy
    } else {
        Action::Unknown
    };

    Intent {
        action,
        version: extract_version(&lowered),
        environments: extract_environments(&lowered),
        post_steps: extract_post_steps(&lowered),
    }
}

fn extract_version(lowered: &str) -> Option<String> {
    VERSION_RE
        .as_ref()?
        .captures(lowered)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Environments are reported in canonical order (dev, staging, production)
/// regardless of where they appear in the text. Defaults to staging.
fn extract_environments(lowered: &str) -> Vec<Environment> {
    let found: BTreeSet<Environment> = ENVIRONMENT_RE
        .as_ref()
        .map(|re| {
            re.find_iter(lowered)
                .filter_map(|m| m.as_str().parse().ok())
                .collect()
        })
        .unwrap_or_default();

    if found.is_empty() {
        return vec![Environment::Staging];
    }

    found.into_iter().collect()
}

fn extract_post_steps(lowered: &str) -> Vec<PostStep> {
    let mut steps = Vec::new();
    if lowered.contains("test") {
        steps.push(PostStep::RunTests);
    }
    if lowered.contains("smoke") {
        steps.push(PostStep::SmokeTests);
    }
    steps
}
