//! Tracing setup: a size-rotated log file under the configured log dir.
//!
//! Labels and paths are logged; secret values and passwords never are.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::errors::Result;

/// Log file name inside the log directory.
pub const LOG_FILE: &str = "rabbithole.log";

/// Rotate once the active log grows past this many bytes.
pub const MAX_LOG_BYTES: u64 = 1024 * 1024;

/// Number of rotated files kept (`rabbithole.log.1` .. `.5`).
pub const LOG_BACKUPS: usize = 5;

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence; otherwise `verbose` selects `debug` and
/// `level` is used.  If the log file cannot be opened, warnings and errors
/// go to stderr instead.  Returns the log file path when file logging is
/// active.
pub fn init(log_dir: &Path, level: &str, verbose: bool) -> Option<PathBuf> {
    let level = if verbose { "debug" } else { level };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("rabbithole={level},warn")));

    match open_log_file(log_dir) {
        Ok((path, file)) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(false)
                .try_init();
            Some(path)
        }
        Err(e) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::new("warn"))
                .with_writer(std::io::stderr)
                .with_target(false)
                .try_init();
            tracing::warn!(error = %e, dir = %log_dir.display(), "file logging unavailable");
            None
        }
    }
}

fn open_log_file(log_dir: &Path) -> Result<(PathBuf, File)> {
    fs::create_dir_all(log_dir)?;
    let path = log_dir.join(LOG_FILE);
    rotate_if_needed(&path, MAX_LOG_BYTES, LOG_BACKUPS)?;

    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    Ok((path, file))
}

/// Shift `path` to `path.1` (and older backups up by one) if it exceeds
/// `max_bytes`.  The oldest backup beyond `keep` is removed.
pub fn rotate_if_needed(path: &Path, max_bytes: u64, keep: usize) -> Result<bool> {
    let size = match fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    };
    if size <= max_bytes || keep == 0 {
        return Ok(false);
    }

    let oldest = backup_path(path, keep);
    if oldest.exists() {
        fs::remove_file(&oldest)?;
    }
    for n in (1..keep).rev() {
        let from = backup_path(path, n);
        if from.exists() {
            fs::rename(&from, backup_path(path, n + 1))?;
        }
    }
    fs::rename(path, backup_path(path, 1))?;
    Ok(true)
}

fn backup_path(path: &Path, n: usize) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".{n}"));
    PathBuf::from(name)
}
