//! Configuration for gpo-backup
//!
//! Settings are stored as a JSON file and can be partially overridden
//! by command-line arguments.

pub mod settings;

pub use settings::{FailurePolicy, Settings};
