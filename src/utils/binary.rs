//! Routing daemon binary resolution and validation.
//!
//! Daemons live in a single directory (`/usr/lib/frr` by default). The
//! directory may be given with a leading `~`, which expands to `$HOME`.

use crate::process::DaemonKind;
use std::env;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Errors that can occur during binary resolution or validation
#[derive(Debug, thiserror::Error)]
pub enum BinaryError {
    #[error("Binary not found: {path}")]
    NotFound { path: String },

    #[error("Binary is not executable: {path}")]
    NotExecutable { path: String },

    #[error("Cannot determine home directory")]
    NoHomeDir,

    #[error("Invalid path: {path}")]
    InvalidPath { path: String },
}

/// Get the user's home directory from the HOME environment variable
fn get_home_dir() -> Result<PathBuf, BinaryError> {
    env::var("HOME")
        .map(PathBuf::from)
        .map_err(|_| BinaryError::NoHomeDir)
}

/// Expand a leading `~/` in a daemon directory
pub fn expand_daemon_dir(dir: &str) -> Result<PathBuf, BinaryError> {
    if let Some(rest) = dir.strip_prefix("~/") {
        Ok(get_home_dir()?.join(rest))
    } else if dir == "~" {
        get_home_dir()
    } else {
        Ok(PathBuf::from(dir))
    }
}

/// Path of the binary for `kind` inside `daemon_dir`
///
/// # Examples
///
/// ```ignore
/// resolve_daemon_binary("/usr/lib/frr", DaemonKind::Bgpd) -> /usr/lib/frr/bgpd
/// resolve_daemon_binary("~/frr/bin", DaemonKind::Zebra) -> /home/user/frr/bin/zebra
/// ```
pub fn resolve_daemon_binary(daemon_dir: &str, kind: DaemonKind) -> Result<PathBuf, BinaryError> {
    Ok(expand_daemon_dir(daemon_dir)?.join(kind.as_str()))
}

/// Validate that a binary exists and is executable.
///
/// Called before bring-up so a missing daemon fails before any namespace
/// is created.
pub fn validate_binary(path: &Path) -> Result<(), BinaryError> {
    if !path.exists() {
        return Err(BinaryError::NotFound {
            path: path.display().to_string(),
        });
    }

    let metadata = path.metadata().map_err(|_| BinaryError::InvalidPath {
        path: path.display().to_string(),
    })?;

    // Any execute bit will do
    let mode = metadata.permissions().mode();
    if mode & 0o111 == 0 {
        return Err(BinaryError::NotExecutable {
            path: path.display().to_string(),
        });
    }

    Ok(())
}

/// Resolve and validate the binaries of every daemon kind in `kinds`
pub fn validate_daemon_binaries(daemon_dir: &str, kinds: &[DaemonKind]) -> Result<Vec<PathBuf>, BinaryError> {
    kinds
        .iter()
        .map(|kind| {
            let path = resolve_daemon_binary(daemon_dir, *kind)?;
            validate_binary(&path)?;
            Ok(path)
        })
        .collect()
}
