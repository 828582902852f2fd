//! Utilities for dealing with anything related to the local file system.
//!
//! If it is a generic operation on something residing on disk, about a file,
//! or about something related to a file, it is a good bet that it belongs in
//! this module.

use crate::env::expand_vars;
use crate::error::{ToolsError, ToolsResult};
use lazy_static::lazy_static;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use walkdir::WalkDir;

const METRIC_LABELS: [&str; 9] = ["B", "kB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];
const BINARY_LABELS: [&str; 9] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB", "ZiB", "YiB"];

lazy_static! {
    static ref COMMENT_LINE: Regex = Regex::new(r"^#").unwrap();
    static ref BLANK_LINE: Regex = Regex::new(r"^\s*$").unwrap();
}

/// How [`file_lines`] filters the lines it returns.
#[derive(Debug, Clone, Default)]
pub enum LineFilter {
    /// Return every line verbatim
    #[default]
    None,
    /// Drop comment (`^#`) and blank lines, trimming the survivors
    Default,
    /// Drop lines matching any of the given patterns, trimming the survivors
    Patterns(Vec<Regex>),
}

/// Format bytes to human readable, using binary (1024) or metric (1000) representation.
///
/// ```
/// use plox_tools::files::format_bytes;
///
/// assert_eq!(format_bytes(1024.0, false, 1), "1.0 KiB");
/// assert_eq!(format_bytes(1000.0, false, 1), "1000.0 B");
/// assert_eq!(format_bytes(1000.0, true, 1), "1.0 kB");
/// assert_eq!(format_bytes(1024.0, true, 3), "1.024 kB");
/// ```
pub fn format_bytes(number_bytes: f64, metric: bool, precision: usize) -> String {
    let unit_labels = if metric { &METRIC_LABELS } else { &BINARY_LABELS };
    let last_label = unit_labels[unit_labels.len() - 1];
    let unit_step: f64 = if metric { 1000.0 } else { 1024.0 };
    // Promote to the next unit just before float rounding at the configured
    // precision would render e.g. "1024.0 KiB" instead of "1.0 MiB".
    let unit_step_thresh = unit_step - 5.0 / 10f64.powi(precision as i32);

    let (mut remaining, sign) =
        if number_bytes < 0.0 { (-number_bytes, "-") } else { (number_bytes, "") };

    let mut unit = "B";
    for &label in unit_labels {
        unit = label;
        if remaining < unit_step_thresh {
            break;
        }
        if label != last_label {
            remaining /= unit_step;
        }
    }

    format!("{sign}{remaining:.precision$} {unit}")
}

/// Read and return a local file path's contents as a string.
///
/// Trailing whitespace (including the final newline) is stripped.
pub fn file_contents(path: impl AsRef<Path>) -> ToolsResult<String> {
    let raw = fs::read_to_string(path)?;
    Ok(raw.trim_end().to_string())
}

/// Read and return a local binary file path's contents as raw bytes.
pub fn bin_file_contents(path: impl AsRef<Path>) -> ToolsResult<Vec<u8>> {
    Ok(fs::read(path)?)
}

/// Fetch an environment variable's local file path's contents as a string.
///
/// The variable's value has `${VAR}` references expanded before it is treated
/// as a path.
pub fn file_contents_from_envar(key: &str) -> ToolsResult<String> {
    let value = std::env::var(key).map_err(|_| ToolsError::missing_var(key))?;
    file_contents(expand_vars(&value))
}

/// Return the contents of a given filepath as its individual lines.
///
/// With [`LineFilter::None`] every line is returned verbatim. The other
/// filters drop matching lines (matched from the start of the trimmed line,
/// in the manner of an anchored pattern) and return the survivors trimmed.
pub fn file_lines(path: impl AsRef<Path>, filter: LineFilter) -> ToolsResult<Vec<String>> {
    let content = file_contents(path)?;
    let lines = content.lines();

    let patterns: Vec<Regex> = match filter {
        LineFilter::None => return Ok(lines.map(str::to_string).collect()),
        LineFilter::Default => vec![COMMENT_LINE.clone(), BLANK_LINE.clone()],
        LineFilter::Patterns(patterns) => patterns,
    };

    let mut acc = Vec::new();
    for line in lines {
        let line = line.trim();
        if !patterns.iter().any(|p| matches_at_start(p, line)) {
            acc.push(line.to_string());
        }
    }
    Ok(acc)
}

/// Whether `pattern` matches `text` starting at the first byte.
pub(crate) fn matches_at_start(pattern: &Regex, text: &str) -> bool {
    pattern.find(text).is_some_and(|m| m.start() == 0)
}

/// Recursively delete a given folder path and everything beneath it.
///
/// Refuses to operate on `/` or the user's home directory.
pub fn delete_folder_and_contents(path: impl AsRef<Path>) -> ToolsResult<()> {
    let path = path.as_ref();
    let resolved = path.canonicalize()?;

    let home = std::env::var_os("HOME")
        .map(PathBuf::from)
        .and_then(|h| h.canonicalize().ok());
    if resolved == Path::new("/") || home.is_some_and(|h| resolved == h) {
        tracing::warn!("Hm, deleting {} looks pretty dangerous, refusing", resolved.display());
        return Ok(());
    }

    // Depth-first with directories last, so every directory is empty by the
    // time it is removed.
    for entry in WalkDir::new(&resolved).contents_first(true) {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_dir() {
            fs::remove_dir(entry.path())?;
        } else {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

/// Walk a local directory glob pattern and return the files found.
///
/// `pattern` is a glob such as `/some/path/**` or `/some/path/*.txt`. When
/// `recursive` is false, `**` components are demoted to `*` so only a single
/// level is listed. Any file whose path matches one of the `ignore` patterns
/// (from the start of the path string) is skipped.
pub fn walkdir(pattern: &str, recursive: bool, ignore: &[Regex]) -> ToolsResult<Vec<PathBuf>> {
    let pattern = if recursive { pattern.to_string() } else { pattern.replace("**", "*") };

    let paths = glob::glob(&pattern)
        .map_err(|e| ToolsError::pattern(format!("invalid glob pattern '{pattern}': {e}")))?;

    let mut found = Vec::new();
    for path in paths {
        let path = match path {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!("Skipping unreadable glob entry: {e}");
                continue;
            }
        };
        if !path.is_file() {
            continue;
        }
        let as_str = path.to_string_lossy();
        if ignore.iter().any(|p| matches_at_start(p, &as_str)) {
            continue;
        }
        found.push(path);
    }
    Ok(found)
}

/// Ensure the local directory structure exists for a given path.
///
/// The final component is treated as a file name unless the path ends with a
/// separator, so `ensure_dir("a/b/c.txt")` creates `a/b` while
/// `ensure_dir("a/b/c/")` creates `a/b/c`.
pub fn ensure_dir(path: &str) -> ToolsResult<()> {
    let dirpath = match path.rsplit_once(MAIN_SEPARATOR) {
        Some((dir, _)) => dir,
        None => return Ok(()),
    };
    if !dirpath.is_empty() && !Path::new(dirpath).is_dir() {
        fs::create_dir_all(dirpath)?;
    }
    Ok(())
}

/// Return the names of the plain files directly inside a directory.
pub fn list_files(directory: impl AsRef<Path>, sort: bool) -> ToolsResult<Vec<String>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    if sort {
        files.sort();
    }
    Ok(files)
}

/// Check whether a given path is an existent file, returning it if so.
///
/// The `Result<_, String>` shape makes this directly usable as a CLI argument
/// value parser.
pub fn existing_filepath(file_path: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(file_path);
    if !path.exists() {
        return Err(format!("{file_path} does not exist"));
    }
    Ok(path)
}
