use crate::error::{Result, SteError};
use std::fs;
use std::path::{Path, PathBuf};

/// Resolves a file named by a template (or on the command line) against the base directory
#[must_use]
pub fn resolve_template_path(base_dir: &Path, file_name: &str) -> PathBuf {
    base_dir.join(file_name)
}

/// Reads a whole file as an ordered list of lines, without line terminators
///
/// `\n`, `\r\n` and a lone `\r` all end a line. A terminator at the very end
/// of the file doesn't start an extra empty line.
///
/// # Errors
///
/// - `SteError::FileNotFound` if the path doesn't exist or isn't a file.
/// - `SteError::FileUnreadable` if the file can't be read as UTF-8 text.
pub fn read_file_lines(path: &Path) -> Result<Vec<String>> {
    if !path.is_file() {
        return Err(SteError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let contents = fs::read_to_string(path).map_err(|source| SteError::FileUnreadable {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(split_lines(&contents))
}

fn split_lines(contents: &str) -> Vec<String> {
    let normalized = contents.replace("\r\n", "\n").replace('\r', "\n");
    let mut lines: Vec<String> = normalized.split('\n').map(str::to_string).collect();

    // A final terminator (or an empty file) leaves one empty trailing piece
    if normalized.is_empty() || normalized.ends_with('\n') {
        lines.pop();
    }
    lines
}

/// Canonical form of a path used to recognise the same file reached twice.
/// Falls back to the path as given when it can't be canonicalized.
#[must_use]
pub fn canonical_identity(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
