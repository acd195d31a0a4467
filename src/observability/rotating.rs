//! Size-capped append-only file with numbered backups.
//!
//! When the live file grows past its limit it is shifted to `<name>.1`, the
//! previous `.1` becomes `.2`, and so on; the oldest backup beyond the
//! retention count is deleted.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;

/// Default size limit before rotation (8 MiB).
pub const DEFAULT_MAX_BYTES: u64 = 8 * 1024 * 1024;

/// Default number of backups kept next to the live file.
pub const DEFAULT_BACKUPS: usize = 3;

/// Line-oriented writer with size-based rotation.
///
/// Safe to share between threads; the file handle is opened lazily on the
/// first write and reopened after each rotation.
pub struct RotatingFile {
    /// Path of the live file; backups get a numeric suffix.
    path: PathBuf,
    /// Size at which the live file is rotated before the next write.
    max_bytes: u64,
    /// Number of backups kept; `0` truncates instead of rotating.
    backups: usize,
    /// Open handle and bytes written so far, `None` until the first write.
    state: Mutex<Option<(File, u64)>>,
}

impl RotatingFile {
    /// Creates a writer with [`DEFAULT_MAX_BYTES`] and [`DEFAULT_BACKUPS`].
    ///
    /// # Parameters
    ///
    /// * `path` - File to append to; created on the first write
    pub fn new(path: PathBuf) -> Self {
        Self::with_limits(path, DEFAULT_MAX_BYTES, DEFAULT_BACKUPS)
    }

    /// Creates a writer with explicit limits.
    ///
    /// # Parameters
    ///
    /// * `path` - File to append to; created on the first write
    /// * `max_bytes` - Size that triggers rotation
    /// * `backups` - How many rotated files to keep
    pub const fn with_limits(path: PathBuf, max_bytes: u64, backups: usize) -> Self {
        Self {
            path,
            max_bytes,
            backups,
            state: Mutex::new(None),
        }
    }

    /// Appends `line` plus a newline, rotating first if the limit is reached.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be opened, renamed or written, or if a
    /// previous writer panicked while holding the lock.
    pub fn write_line(&self, line: &str) -> io::Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("writer lock poisoned: {e}")))?;

        if state.is_none() {
            *state = Some(self.open()?);
        }
        if state.as_ref().is_some_and(|(_, written)| *written >= self.max_bytes) {
            *state = None;
            self.rotate()?;
            *state = Some(self.open()?);
        }

        let (file, written) = state
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "trace file unavailable"))?;
        writeln!(file, "{line}")?;
        file.flush()?;
        *written += line.len() as u64 + 1;
        Ok(())
    }

    fn open(&self) -> io::Result<(File, u64)> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let len = file.metadata()?.len();
        Ok((file, len))
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(format!(".{index}"));
        PathBuf::from(name)
    }

    fn rotate(&self) -> io::Result<()> {
        if self.backups == 0 {
            return fs::remove_file(&self.path).or_else(ignore_missing);
        }
        fs::remove_file(self.backup_path(self.backups)).or_else(ignore_missing)?;
        for index in (1..self.backups).rev() {
            let from = self.backup_path(index);
            if from.exists() {
                fs::rename(&from, self.backup_path(index + 1))?;
            }
        }
        fs::rename(&self.path, self.backup_path(1)).or_else(ignore_missing)
    }
}

fn ignore_missing(err: io::Error) -> io::Result<()> {
    if err.kind() == io::ErrorKind::NotFound {
        Ok(())
    } else {
        Err(err)
    }
}

impl std::fmt::Debug for RotatingFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotatingFile")
            .field("path", &self.path)
            .field("max_bytes", &self.max_bytes)
            .field("backups", &self.backups)
            .finish_non_exhaustive()
    }
}
