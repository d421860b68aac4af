//! Intent classification module.
//!
//! Turns free-text deployment instructions into structured intents and
//! attaches advisory warnings for the reviewer.

mod advisor;
mod classifier;
mod types;

pub use advisor::{LOW_CONFIDENCE_WARNING, NO_TESTS_WARNING, PRODUCTION_WARNING, advise};
pub use classifier::{Intent, classify};
pub use types::{Action, Environment, PostStep};
