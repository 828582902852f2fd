//! Crate-wide error and result types.
//!
//! Every fallible operation in the crate returns [`ToolsResult`], so callers
//! can match on a single error enum regardless of which module they reached
//! into.

use std::path::PathBuf;

/// Error type shared by all modules in the crate
#[derive(Debug, thiserror::Error)]
pub enum ToolsError {
    /// A required environment variable is absent from the process environment
    #[error("{name} is not set")]
    MissingEnvVar { name: String },

    /// An environment variable named a path that is absent from local disk
    #[error("{name} does not exist on local disk")]
    EnvPathMissing { name: String, path: PathBuf },

    /// A line in an environment file did not parse as `KEY=VALUE`
    #[error("failed to parse environment line: {line}")]
    EnvParse { line: String },

    /// File could not be read, written, or created
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// A glob or regex pattern failed to compile or apply
    #[error("pattern error: {message}")]
    Pattern { message: String },

    /// Spawning or running a subprocess failed
    #[error("exec error: {message}")]
    Exec { message: String },

    /// A deadline passed before the awaited condition or process finished
    #[error("timed out: {message}")]
    Timeout { message: String },

    /// A detected tool version is outside the supported set
    #[error("version {found} is not supported (supported: {supported})")]
    UnsupportedVersion { found: String, supported: String },

    /// The user aborted an interactive prompt
    #[error("interrupted: {message}")]
    Interrupted { message: String },
}

impl ToolsError {
    /// Create a missing-environment-variable error
    pub fn missing_var(name: impl Into<String>) -> Self {
        Self::MissingEnvVar { name: name.into() }
    }

    /// Create an environment-file parse error
    pub fn env_parse(line: impl Into<String>) -> Self {
        Self::EnvParse { line: line.into() }
    }

    /// Create a pattern error
    pub fn pattern(message: impl Into<String>) -> Self {
        Self::Pattern { message: message.into() }
    }

    /// Create a subprocess error
    pub fn exec(message: impl Into<String>) -> Self {
        Self::Exec { message: message.into() }
    }

    /// Create a timeout error
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout { message: message.into() }
    }

    /// Create an interrupted error
    pub fn interrupted(message: impl Into<String>) -> Self {
        Self::Interrupted { message: message.into() }
    }
}

/// Result type for crate operations
pub type ToolsResult<T> = Result<T, ToolsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ToolsError::missing_var("FOOBAR");
        assert_eq!(err.to_string(), "FOOBAR is not set");

        let err = ToolsError::env_parse("garbage line");
        assert_eq!(err.to_string(), "failed to parse environment line: garbage line");

        let err = ToolsError::timeout("waited 10s for child");
        assert_eq!(err.to_string(), "timed out: waited 10s for child");
    }

    #[test]
    fn test_io_error_conversion() {
        fn read_missing() -> ToolsResult<String> {
            let contents = std::fs::read_to_string("/definitely/not/a/real/file")?;
            Ok(contents)
        }

        let err = read_missing().unwrap_err();
        assert!(matches!(err, ToolsError::Io { .. }));
    }
}
