//! Persistent records and their status state machines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{CommanderError, Result};
use crate::intent::{Action, Environment, PostStep};

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generates a fresh random id.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = CommanderError;

            fn from_str(s: &str) -> Result<Self> {
                Uuid::parse_str(s.trim()).map(Self).map_err(|_| {
                    CommanderError::validation(stringify!($name), format!("'{s}' is not a valid id"))
                })
            }
        }
    };
}

record_id!(
    /// Identifier of a [`Project`].
    ProjectId
);
record_id!(
    /// Identifier of a [`Plan`].
    PlanId
);
record_id!(
    /// Identifier of an [`Execution`].
    ExecutionId
);

/// A deployable project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Project id.
    pub id: ProjectId,
    /// Display name.
    pub name: String,
    /// Local checkout, used by the local build pipeline.
    pub repo_path: Option<String>,
    /// Remote repository URL.
    pub repo_url: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Input for creating a project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProject {
    /// Display name.
    pub name: String,
    /// Local checkout.
    pub repo_path: Option<String>,
    /// Remote repository URL.
    pub repo_url: Option<String>,
}

impl Project {
    /// Materialises a new project record.
    #[must_use]
    pub fn create(input: NewProject) -> Self {
        Self {
            id: ProjectId::new(),
            name: input.name,
            repo_path: input.repo_path,
            repo_url: input.repo_url,
            created_at: Utc::now(),
        }
    }
}

/// Lifecycle of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    /// Waiting for a human to approve.
    PendingApproval,
    /// Approved and queued.
    Approved,
    /// Being executed.
    Running,
    /// Execution finished successfully.
    Succeeded,
    /// Execution failed.
    Failed,
    /// A rollback was issued.
    RolledBack,
}

impl PlanStatus {
    /// Returns the wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PendingApproval => "pending_approval",
            Self::Approved => "approved",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::RolledBack => "rolled_back",
        }
    }

    /// Returns true if the plan may move to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::PendingApproval, Self::Approved)
                | (Self::Approved, Self::Running | Self::Failed)
                | (Self::Running, Self::Succeeded | Self::Failed | Self::RolledBack)
                | (Self::Failed, Self::RolledBack)
        )
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Waiting for a worker.
    Queued,
    /// Being executed.
    Running,
    /// Finished successfully.
    Succeeded,
    /// Finished with an error.
    Failed,
    /// A rollback was issued.
    RolledBack,
}

impl ExecutionStatus {
    /// Returns the wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::RolledBack => "rolled_back",
        }
    }

    /// Returns true for states a run ends in.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::RolledBack)
    }

    /// Returns true if the execution may move to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Running | Self::Failed)
                | (Self::Running, Self::Succeeded | Self::Failed | Self::RolledBack)
                | (Self::Failed, Self::RolledBack)
        )
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified command awaiting or past approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Plan id.
    pub id: PlanId,
    /// Owning project.
    pub project_id: ProjectId,
    /// The instruction as typed.
    pub raw_command: String,
    /// Classified action.
    pub action: Action,
    /// Requested version, if any.
    pub version: Option<String>,
    /// Target environments in deploy order.
    pub environments: Vec<Environment>,
    /// Requested post-deploy steps.
    pub post_steps: Vec<PostStep>,
    /// Advisory warnings shown before approval.
    pub warnings: Vec<String>,
    /// Lifecycle status.
    pub status: PlanStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last status change.
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPlan {
    /// Owning project.
    pub project_id: ProjectId,
    /// The instruction as typed.
    pub raw_command: String,
    /// Classified action.
    pub action: Action,
    /// Requested version.
    pub version: Option<String>,
    /// Target environments.
    pub environments: Vec<Environment>,
    /// Post-deploy steps.
    pub post_steps: Vec<PostStep>,
    /// Advisory warnings.
    pub warnings: Vec<String>,
}

impl Plan {
    /// Materialises a new plan in `pending_approval`.
    #[must_use]
    pub fn create(input: NewPlan) -> Self {
        let now = Utc::now();
        Self {
            id: PlanId::new(),
            project_id: input.project_id,
            raw_command: input.raw_command,
            action: input.action,
            version: input.version,
            environments: input.environments,
            post_steps: input.post_steps,
            warnings: input.warnings,
            status: PlanStatus::PendingApproval,
            created_at: now,
            updated_at: now,
        }
    }

    /// Moves the plan to `next`.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if the transition is not allowed.
    pub fn transition(&mut self, next: PlanStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(CommanderError::conflict(format!(
                "Plan {} cannot move from {} to {next}",
                self.id, self.status
            )));
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// One run of an approved plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Execution {
    /// Execution id.
    pub id: ExecutionId,
    /// Plan being executed.
    pub plan_id: PlanId,
    /// Lifecycle status.
    pub status: ExecutionStatus,
    /// Append-only audit log.
    pub logs: Vec<String>,
    /// First entry into `running`.
    pub started_at: Option<DateTime<Utc>>,
    /// First entry into a terminal state.
    pub finished_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Execution {
    /// Materialises a new queued execution.
    #[must_use]
    pub fn create(plan_id: PlanId) -> Self {
        Self {
            id: ExecutionId::new(),
            plan_id,
            status: ExecutionStatus::Queued,
            logs: Vec::new(),
            started_at: None,
            finished_at: None,
            created_at: Utc::now(),
        }
    }

    /// Moves the execution to `next`, stamping start and finish times once.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if the transition is not allowed.
    pub fn transition(&mut self, next: ExecutionStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(CommanderError::conflict(format!(
                "Execution {} cannot move from {} to {next}",
                self.id, self.status
            )));
        }

        let now = Utc::now();
        if next == ExecutionStatus::Running && self.started_at.is_none() {
            self.started_at = Some(now);
        }
        if next.is_terminal() && self.finished_at.is_none() {
            self.finished_at = Some(now);
        }
        self.status = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> Plan {
        Plan::create(NewPlan {
            project_id: ProjectId::new(),
            raw_command: String::from("deploy 1.0 to staging"),
            action: Action::Deploy,
            version: Some(String::from("1.0")),
            environments: vec![Environment::Staging],
            post_steps: Vec::new(),
            warnings: Vec::new(),
        })
    }

    #[test]
    fn test_plan_happy_path() {
        let mut plan = plan();
        assert_eq!(plan.status, PlanStatus::PendingApproval);
        plan.transition(PlanStatus::Approved).unwrap();
        plan.transition(PlanStatus::Running).unwrap();
        plan.transition(PlanStatus::Succeeded).unwrap();
        assert_eq!(plan.status, PlanStatus::Succeeded);
    }

    #[test]
    fn test_plan_rejects_backward_moves() {
        let mut plan = plan();
        plan.transition(PlanStatus::Approved).unwrap();

        let err = plan.transition(PlanStatus::Approved).unwrap_err();
        assert!(matches!(err, CommanderError::Conflict { .. }));
        assert!(plan.transition(PlanStatus::PendingApproval).is_err());
        assert!(plan.transition(PlanStatus::RolledBack).is_err());
        assert_eq!(plan.status, PlanStatus::Approved);
    }

    #[test]
    fn test_rollback_only_from_running_or_failed() {
        assert!(PlanStatus::Running.can_transition_to(PlanStatus::RolledBack));
        assert!(PlanStatus::Failed.can_transition_to(PlanStatus::RolledBack));
        assert!(!PlanStatus::Succeeded.can_transition_to(PlanStatus::RolledBack));
        assert!(ExecutionStatus::Failed.can_transition_to(ExecutionStatus::RolledBack));
        assert!(!ExecutionStatus::Queued.can_transition_to(ExecutionStatus::RolledBack));
    }

    #[test]
    fn test_execution_timestamps_set_once() {
        let mut execution = Execution::create(PlanId::new());
        assert!(execution.started_at.is_none());

        execution.transition(ExecutionStatus::Running).unwrap();
        let started = execution.started_at;
        assert!(started.is_some());

        execution.transition(ExecutionStatus::Failed).unwrap();
        let finished = execution.finished_at;
        assert!(finished.is_some());

        execution.transition(ExecutionStatus::RolledBack).unwrap();
        assert_eq!(execution.started_at, started);
        assert_eq!(execution.finished_at, finished);
    }

    #[test]
    fn test_terminal_execution_cannot_rerun() {
        let mut execution = Execution::create(PlanId::new());
        execution.transition(ExecutionStatus::Running).unwrap();
        execution.transition(ExecutionStatus::Succeeded).unwrap();
        assert!(execution.transition(ExecutionStatus::Running).is_err());
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&PlanStatus::PendingApproval).unwrap(),
            "\"pending_approval\""
        );
        assert_eq!(
            serde_json::to_string(&ExecutionStatus::RolledBack).unwrap(),
            "\"rolled_back\""
        );
    }

    #[test]
    fn test_id_parsing() {
        let id = ExecutionId::new();
        assert_eq!(id.to_string().parse::<ExecutionId>().unwrap(), id);
        assert!("not-a-uuid".parse::<PlanId>().is_err());
    }
}
