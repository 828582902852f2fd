//! Utilities for dealing with anything related to the current process' environment.
//!
//! Covers reading and validating environment variables, loading `KEY=VALUE`
//! env files, temporarily patching the environment for a scope, and the
//! supported-version bootstrap check used when entering a project directory.

use crate::error::{ToolsError, ToolsResult};
use crate::files::{file_lines, LineFilter};
use lazy_static::lazy_static;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Command;

#[cfg(test)]
use std::sync::Mutex;

lazy_static! {
    static ref ENV_LINE: Regex = Regex::new(r"^(?P<key>[^=]+)=(?P<value>.*)$").unwrap();
    static ref VAR_REF: Regex =
        Regex::new(r"\$\{(?P<braced>[A-Za-z_][A-Za-z0-9_]*)\}|\$(?P<plain>[A-Za-z_][A-Za-z0-9_]*)")
            .unwrap();
    static ref MAJOR_MINOR: Regex = Regex::new(r"(?P<version>\d+\.\d+)").unwrap();
}

/// Serializes tests that mutate the process environment.
#[cfg(test)]
pub(crate) static ENV_LOCK: Mutex<()> = Mutex::new(());

/// What [`ensure_vars_set`] requires of each variable's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathRequirement {
    /// The variable only needs to be set
    #[default]
    None,
    /// The variable's value must be an existing local path
    MustExist,
    /// The variable's value must be a local path, created as a directory if absent
    CreateIfMissing,
}

/// Expand `${VAR}` and `$VAR` references in a string against the current environment.
///
/// References to unset variables are left verbatim.
pub fn expand_vars(input: &str) -> String {
    VAR_REF
        .replace_all(input, |caps: &regex::Captures<'_>| {
            let name = caps
                .name("braced")
                .or_else(|| caps.name("plain"))
                .map(|m| m.as_str())
                .unwrap_or_default();
            std::env::var(name).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

/// Parse a local file containing `KEY=VALUE` environment pairs.
///
/// Comment (`#`) and blank lines are ignored. Pairs are returned in file
/// order. With `expand` set, `${VAR}` references in values are expanded
/// against the current environment.
///
/// An example env file:
///
/// ```text
/// FOOBAR=/tmp/some_key
/// FOOBAZ=${HOME}/some_other_key
/// ```
///
/// # Errors
///
/// Returns [`ToolsError::EnvParse`] for the first line that is not a
/// `KEY=VALUE` pair.
pub fn parse_env_file(path: impl AsRef<Path>, expand: bool) -> ToolsResult<Vec<(String, String)>> {
    let mut pairs = Vec::new();
    for line in file_lines(path, LineFilter::Default)? {
        let caps = ENV_LINE.captures(&line).ok_or_else(|| ToolsError::env_parse(line.as_str()))?;
        let value = if expand { expand_vars(&caps["value"]) } else { caps["value"].to_string() };
        pairs.push((caps["key"].to_string(), value));
    }
    Ok(pairs)
}

/// Add a set of `KEY=VALUE` pairs from an env file to the current environment.
///
/// Values have `${VAR}` references expanded before being set.
pub fn add_to_env_from_file(path: impl AsRef<Path>) -> ToolsResult<()> {
    let path = path.as_ref();
    for (key, value) in parse_env_file(path, true)? {
        tracing::debug!("Setting envvar {} from file {}", key, path.display());
        std::env::set_var(key, value);
    }
    Ok(())
}

/// Validate that a list of variables exists in the current environment.
///
/// With a [`PathRequirement`] other than `None`, each variable's value is
/// additionally checked to be an existing local path, optionally creating the
/// directory when absent.
pub fn ensure_vars_set(names: &[&str], requirement: PathRequirement) -> ToolsResult<()> {
    for name in names {
        let value = var_or_bail(name)?;
        if requirement == PathRequirement::None {
            continue;
        }

        let path = PathBuf::from(&value);
        if path.exists() {
            continue;
        }

        match requirement {
            PathRequirement::MustExist => {
                tracing::error!("{}'s path {} is not an existing path", name, path.display());
                return Err(ToolsError::EnvPathMissing { name: name.to_string(), path });
            }
            PathRequirement::CreateIfMissing => {
                std::fs::create_dir_all(&path).map_err(|e| {
                    tracing::error!("couldn't make {}'s path {}: {}", name, path.display(), e);
                    e
                })?;
            }
            PathRequirement::None => unreachable!(),
        }
    }
    Ok(())
}

/// Read and return an environment variable or fail.
///
/// # Errors
///
/// Returns [`ToolsError::MissingEnvVar`] when the variable is unset.
pub fn var_or_bail(name: &str) -> ToolsResult<String> {
    std::env::var(name).map_err(|_| ToolsError::missing_var(name))
}

/// RAII guard that temporarily modifies the process environment.
///
/// Each [`set`](ScopedEnv::set) or [`remove`](ScopedEnv::remove) applies
/// immediately and records the previous state; everything is restored when
/// the guard drops, including during unwind. [`ScopedEnv::clear`] empties the
/// entire environment for the guard's lifetime.
///
/// ```
/// use plox_tools::env::ScopedEnv;
///
/// assert!(std::env::var("FOOBAR_SCOPED").is_err());
/// {
///     let _env = ScopedEnv::new().set("FOOBAR_SCOPED", "set");
///     assert_eq!(std::env::var("FOOBAR_SCOPED").unwrap(), "set");
/// }
/// assert!(std::env::var("FOOBAR_SCOPED").is_err());
/// ```
#[derive(Debug, Default)]
pub struct ScopedEnv {
    saved: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    /// Create a guard that has not yet touched the environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a guard with the entire environment removed.
    pub fn clear() -> Self {
        let keys: Vec<String> = std::env::vars().map(|(k, _)| k).collect();
        let mut guard = Self::new();
        for key in keys {
            guard = guard.remove(&key);
        }
        guard
    }

    fn save(&mut self, key: &str) {
        if !self.saved.iter().any(|(k, _)| k == key) {
            self.saved.push((key.to_string(), std::env::var(key).ok()));
        }
    }

    /// Set a variable for the guard's lifetime.
    pub fn set(mut self, key: &str, value: &str) -> Self {
        self.save(key);
        std::env::set_var(key, value);
        self
    }

    /// Remove a variable for the guard's lifetime.
    pub fn remove(mut self, key: &str) -> Self {
        self.save(key);
        std::env::remove_var(key);
        self
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (key, value) in self.saved.drain(..) {
            match value {
                Some(value) => std::env::set_var(key, value),
                None => std::env::remove_var(key),
            }
        }
    }
}

/// Check that a detected `major.minor` version belongs to a supported set.
///
/// The input may carry a patch component (`3.12.1`); only `major.minor` is
/// compared.
///
/// # Errors
///
/// Returns [`ToolsError::UnsupportedVersion`] when the version is not a
/// member of `supported`, or [`ToolsError::Pattern`] when no `major.minor`
/// can be extracted at all.
pub fn ensure_supported_version(version: &str, supported: &[&str]) -> ToolsResult<()> {
    let found = extract_major_minor(version)
        .ok_or_else(|| ToolsError::pattern(format!("no version found in '{version}'")))?;
    if supported.contains(&found.as_str()) {
        return Ok(());
    }
    Err(ToolsError::UnsupportedVersion { found, supported: supported.join(", ") })
}

/// Run `<program> --version` and return the reported `major.minor` version.
///
/// # Errors
///
/// Returns [`ToolsError::Exec`] when the program cannot be run or reports no
/// recognizable version.
pub fn tool_version(program: &str) -> ToolsResult<String> {
    let output = Command::new(program)
        .arg("--version")
        .output()
        .map_err(|e| ToolsError::exec(format!("no usable {program} found: {e}")))?;

    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    extract_major_minor(&text)
        .ok_or_else(|| ToolsError::exec(format!("{program} reported no recognizable version")))
}

fn extract_major_minor(text: &str) -> Option<String> {
    MAJOR_MINOR.captures(text).map(|caps| caps["version"].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TEMPFILE_ENV: &str = "FOO=BAR\nBAZ=QUX\n# comment";

    fn lock() -> std::sync::MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn temp_env_file(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("file.env");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_var_or_bail() {
        let _lock = lock();
        let _env = ScopedEnv::new().remove("FOO_BAR_TESTING_BAZ_QUZ_BAIL");

        let err = var_or_bail("FOO_BAR_TESTING_BAZ_QUZ_BAIL").unwrap_err();
        assert_eq!(err.to_string(), "FOO_BAR_TESTING_BAZ_QUZ_BAIL is not set");

        let _env = ScopedEnv::new().set("FOO_BAR_TESTING_BAZ_QUZ_BAIL", "foo");
        assert_eq!(var_or_bail("FOO_BAR_TESTING_BAZ_QUZ_BAIL").unwrap(), "foo");
    }

    #[test]
    fn test_expand_vars() {
        let _lock = lock();
        let _env =
            ScopedEnv::new().set("PLOX_EXPAND_TEST", "/tmp/expanded").remove("PLOX_UNSET_TEST");

        assert_eq!(expand_vars("${PLOX_EXPAND_TEST}/key"), "/tmp/expanded/key");
        assert_eq!(expand_vars("$PLOX_EXPAND_TEST/key"), "/tmp/expanded/key");
        assert_eq!(expand_vars("no refs here"), "no refs here");
        // unset vars stay verbatim
        assert_eq!(expand_vars("${PLOX_UNSET_TEST}/key"), "${PLOX_UNSET_TEST}/key");
    }

    #[test]
    fn test_parse_env_file() {
        let _lock = lock();
        let dir = TempDir::new().unwrap();

        let envfile = temp_env_file(&dir, TEMPFILE_ENV);
        let pairs = parse_env_file(&envfile, false).unwrap();
        assert_eq!(
            pairs,
            vec![("FOO".to_string(), "BAR".to_string()), ("BAZ".to_string(), "QUX".to_string())]
        );

        let malformed = temp_env_file(&dir, "foo\nbar");
        let err = parse_env_file(&malformed, false).unwrap_err();
        assert_eq!(err.to_string(), "failed to parse environment line: foo");
    }

    #[test]
    fn test_parse_env_file_expansion() {
        let _lock = lock();
        let _env = ScopedEnv::new().set("PLOX_PARSE_TEST", "/tmp/base");
        let dir = TempDir::new().unwrap();
        let envfile = temp_env_file(&dir, "KEY=${PLOX_PARSE_TEST}/sub");

        let pairs = parse_env_file(&envfile, true).unwrap();
        assert_eq!(pairs, vec![("KEY".to_string(), "/tmp/base/sub".to_string())]);

        let pairs = parse_env_file(&envfile, false).unwrap();
        assert_eq!(pairs, vec![("KEY".to_string(), "${PLOX_PARSE_TEST}/sub".to_string())]);
    }

    #[test]
    fn test_add_to_env_from_file() {
        let _lock = lock();
        let _env = ScopedEnv::new().remove("FOO").remove("BAZ");
        let dir = TempDir::new().unwrap();
        let envfile = temp_env_file(&dir, TEMPFILE_ENV);

        add_to_env_from_file(&envfile).unwrap();
        assert_eq!(std::env::var("FOO").unwrap(), "BAR");
        assert_eq!(std::env::var("BAZ").unwrap(), "QUX");
    }

    #[test]
    fn test_ensure_vars_set() {
        let _lock = lock();
        let dir = TempDir::new().unwrap();
        let existing = dir.path().join("existing.txt");
        std::fs::write(&existing, "x").unwrap();

        {
            let _env = ScopedEnv::new().set("FOO_BAR_TESTING_BAZ_QUZ", "foobar");
            ensure_vars_set(&["FOO_BAR_TESTING_BAZ_QUZ"], PathRequirement::None).unwrap();
        }

        let _env = ScopedEnv::new().remove("FOO_BAR_TESTING_BAZ_QUZ");
        let err =
            ensure_vars_set(&["FOO_BAR_TESTING_BAZ_QUZ"], PathRequirement::None).unwrap_err();
        assert_eq!(err.to_string(), "FOO_BAR_TESTING_BAZ_QUZ is not set");

        // value is an existing path
        let _env = ScopedEnv::new().set("FOO_BAR_TESTING_BAZ_QUZ", existing.to_str().unwrap());
        ensure_vars_set(&["FOO_BAR_TESTING_BAZ_QUZ"], PathRequirement::MustExist).unwrap();

        // value is a missing path
        let missing = dir.path().join("doesnotexist");
        let _env = ScopedEnv::new().set("FOO_BAR_TESTING_BAZ_QUZ", missing.to_str().unwrap());
        let err =
            ensure_vars_set(&["FOO_BAR_TESTING_BAZ_QUZ"], PathRequirement::MustExist).unwrap_err();
        assert_eq!(err.to_string(), "FOO_BAR_TESTING_BAZ_QUZ does not exist on local disk");

        ensure_vars_set(&["FOO_BAR_TESTING_BAZ_QUZ"], PathRequirement::CreateIfMissing).unwrap();
        assert!(missing.is_dir());
        ensure_vars_set(&["FOO_BAR_TESTING_BAZ_QUZ"], PathRequirement::MustExist).unwrap();
    }

    #[test]
    fn test_scoped_env_restores() {
        let _lock = lock();
        let _outer = ScopedEnv::new().set("PLOX_SCOPED_A", "original").remove("PLOX_SCOPED_B");

        {
            let _env =
                ScopedEnv::new().set("PLOX_SCOPED_A", "patched").set("PLOX_SCOPED_B", "introduced");
            assert_eq!(std::env::var("PLOX_SCOPED_A").unwrap(), "patched");
            assert_eq!(std::env::var("PLOX_SCOPED_B").unwrap(), "introduced");
        }

        assert_eq!(std::env::var("PLOX_SCOPED_A").unwrap(), "original");
        assert!(std::env::var("PLOX_SCOPED_B").is_err());
    }

    #[test]
    fn test_scoped_env_restores_during_unwind() {
        let _lock = lock();
        let _outer = ScopedEnv::new().set("PLOX_SCOPED_PANIC", "original");

        let result = std::panic::catch_unwind(|| {
            let _env = ScopedEnv::new().set("PLOX_SCOPED_PANIC", "patched");
            assert_eq!(std::env::var("PLOX_SCOPED_PANIC").unwrap(), "patched");
            panic!("boom");
        });

        assert!(result.is_err());
        assert_eq!(std::env::var("PLOX_SCOPED_PANIC").unwrap(), "original");
    }

    #[test]
    fn test_scoped_env_clear() {
        let _lock = lock();
        let _outer = ScopedEnv::new().set("PLOX_SCOPED_CLEAR", "kept");

        {
            let _env = ScopedEnv::clear();
            assert_eq!(std::env::vars().count(), 0);
        }

        assert_eq!(std::env::var("PLOX_SCOPED_CLEAR").unwrap(), "kept");
    }

    #[test]
    fn test_ensure_supported_version() {
        let supported = ["3.9", "3.10", "3.11", "3.12"];
        ensure_supported_version("3.12", &supported).unwrap();
        ensure_supported_version("3.12.1", &supported).unwrap();
        ensure_supported_version("Python 3.9.18", &supported).unwrap();

        let err = ensure_supported_version("3.8.10", &supported).unwrap_err();
        assert!(matches!(err, ToolsError::UnsupportedVersion { .. }));
        assert!(err.to_string().contains("3.8"));

        let err = ensure_supported_version("not a version", &supported).unwrap_err();
        assert!(matches!(err, ToolsError::Pattern { .. }));
    }

    #[test]
    fn test_tool_version_missing_program() {
        let err = tool_version("definitely-not-a-real-program-xyz").unwrap_err();
        assert!(matches!(err, ToolsError::Exec { .. }));
    }
}
