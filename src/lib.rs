//! plox-tools - assorted utilities that don't have a particular home
//!
//! A grab bag of small, well-tested helpers organized by theme:
//! - [`files`]: local file system operations (reading, walking, sizing)
//! - [`env`]: process environment variables and env files
//! - [`exec`]: subprocess execution with streamed logging
//! - [`interact`]: terminal prompts, menus, and color helpers
//! - [`seq`]: sequence and collection helpers
//!
//! Everything fallible returns [`ToolsResult`]; emitted diagnostics go
//! through [`tracing`], so hosts control verbosity with their own
//! subscriber.

pub mod env;
pub mod error;
pub mod exec;
pub mod files;
pub mod interact;
pub mod seq;

// Re-export the error surface for convenient access
pub use error::{ToolsError, ToolsResult};

pub use env::{PathRequirement, ScopedEnv};
pub use exec::ExecOptions;
pub use files::LineFilter;
