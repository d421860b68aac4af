// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![warn(missing_docs)]                // All public items should be documented
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # DevOps Commander
//!
//! Turns plain-language deployment instructions into plans a human approves
//! before anything runs.
//!
//! ## Overview
//!
//! - Register a project (a local checkout or a remote repository)
//! - Type an instruction such as `deploy v1.6 to staging and run tests`
//! - Review the classified plan and its warnings
//! - Approve it; a worker picks the execution off the queue and drives the
//!   configured deployer (local build, Vercel or Render)
//!
//! Every side effect passes through a policy gate. With `dry_run` on (the
//! default) the worker only logs what it would have done.
//!
//! ## Lifecycle
//!
//! ```text
//! plan:       pending_approval -> approved -> running -> succeeded | failed
//! execution:  queued -> running -> succeeded | failed
//! rollback:   running | failed -> rolled_back
//! ```
//!
//! ## Modules
//!
//! - [`intent`]: Instruction classification and advisory warnings
//! - [`store`]: Project, plan and execution records (file and memory backends)
//! - [`queue`]: Work queue (spool directory and in-process channel)
//! - [`workflow`]: Operations behind the CLI
//! - [`worker`], [`runner`], [`orchestrator`]: Execution pipeline
//! - [`deployer`]: Local, Vercel and Render deployers
//! - [`policy`]: Dry-run and local execution switches
//! - [`config`]: Settings loading and validation
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! safety:
//!   dry_run: true
//!   enable_local_execution: false
//! deploy:
//!   provider: render
//!   render:
//!     service_id: srv-abc123
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod deployer;
pub mod error;
pub mod intent;
pub mod orchestrator;
pub mod policy;
pub mod queue;
pub mod runner;
pub mod store;
pub mod worker;
pub mod workflow;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{Settings, SettingsLoader, SettingsValidator};
pub use deployer::{Deploy, DeployProvider, Deployer, DeploymentResult};
pub use error::{CommanderError, Result};
pub use intent::{Action, Environment, Intent, PostStep, classify};
pub use orchestrator::Orchestrator;
pub use policy::PolicyGate;
pub use queue::{ChannelQueue, JobQueue, SpoolQueue};
pub use runner::{ExecutionRunner, RunOutcome};
pub use store::{Execution, ExecutionStatus, FileStore, MemoryStore, Plan, PlanStatus, Project, Store};
pub use worker::Worker;
pub use workflow::{ApprovalReceipt, Workflow};
