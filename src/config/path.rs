//! Filesystem path validation and lexical normalization.
//!
//! Every path accepted from configuration passes through here before any
//! filesystem access. Forbidden markers are checked on the *raw* string
//! before normalization: normalizing first could resolve a traversal
//! attempt away before the check runs.
//!
//! The sanitizer never expands `~` itself, so a home-directory shortcut is
//! rejected outright rather than silently targeting the wrong location.

use std::path::{Component, Path, PathBuf};

use super::error::ConfigError;

/// Validate a configuration directory path and normalize it.
///
/// Rejects blank input and any raw string containing `~`. Relative paths are
/// resolved against the current working directory, then `.` and `..` segments
/// are folded lexically: `/tmp/../tmp` normalizes to `/tmp`.
pub fn sanitize_dir(raw: &str) -> Result<PathBuf, ConfigError> {
    check_raw(raw)?;
    Ok(normalize(&absolutize(Path::new(raw))))
}

/// Validate an arbitrary export/import target path.
///
/// Same policy as [`sanitize_dir`], plus a post-normalization check that no
/// parent-directory segment survives (possible only for inputs that escape
/// above the filesystem root).
pub fn sanitize_target(path: &Path) -> Result<PathBuf, ConfigError> {
    let raw = path.to_string_lossy();
    check_raw(&raw)?;
    let normalized = normalize(&absolutize(path));
    if normalized
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(ConfigError::InvalidPath {
            path: raw.into_owned(),
            message: "contains path traversal".to_string(),
        });
    }
    Ok(normalized)
}

/// Validate a bare configuration filename.
///
/// The value is nominally "just a filename", but traversal and home-shortcut
/// markers are rejected anyway in case a later caller joins it onto a path.
pub fn sanitize_file_name(raw: &str) -> Result<(), ConfigError> {
    if raw.trim().is_empty() {
        return Err(ConfigError::InvalidPath {
            path: raw.to_string(),
            message: "filename cannot be empty".to_string(),
        });
    }
    if raw.contains("..") || raw.contains('~') || raw.contains('/') || raw.contains('\\') {
        return Err(ConfigError::InvalidPath {
            path: raw.to_string(),
            message: "filename contains forbidden characters".to_string(),
        });
    }
    Ok(())
}

fn check_raw(raw: &str) -> Result<(), ConfigError> {
    if raw.trim().is_empty() {
        return Err(ConfigError::InvalidPath {
            path: raw.to_string(),
            message: "path cannot be empty".to_string(),
        });
    }
    if raw.contains('~') {
        return Err(ConfigError::InvalidPath {
            path: raw.to_string(),
            message: "home-directory shortcut (~) is not expanded and is rejected".to_string(),
        });
    }
    Ok(())
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

/// Fold `.` and `..` segments without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }
    parts.iter().map(|c| c.as_os_str()).collect()
}
