//! Record storage for projects, plans and executions.
//!
//! This module provides:
//! - The record types and their status state machines
//! - The [`Store`] trait every backend implements
//! - A file-based backend (one JSON document per record)
//! - An in-memory backend

mod file;
mod memory;
mod store;
mod types;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use store::Store;
pub use types::{
    Execution, ExecutionId, ExecutionStatus, NewPlan, NewProject, Plan, PlanId, PlanStatus,
    Project, ProjectId,
};
