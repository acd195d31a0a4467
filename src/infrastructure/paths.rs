//! Path utilities for locating engine data on the host.
//!
//! Trace files live under a per-user data directory. The location can be
//! overridden with the `ELMLOOP_DATA_DIR` environment variable, which is what
//! tests and sandboxed hosts use.

use std::path::PathBuf;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "ELMLOOP_DATA_DIR";

/// Returns the data directory for engine output.
///
/// Resolution order:
/// 1. `$ELMLOOP_DATA_DIR` if set and non-empty
/// 2. `$HOME/.local/share/elmloop`
/// 3. `elmloop` under the system temp directory
///
/// # Examples
///
/// ```
/// use elmloop::infrastructure::get_data_dir;
///
/// let data_dir = get_data_dir();
/// assert!(data_dir.ends_with("elmloop") || std::env::var_os("ELMLOOP_DATA_DIR").is_some());
/// ```
#[must_use]
pub fn get_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|dir| !dir.is_empty()) {
        return PathBuf::from(dir);
    }
    home_dir().map_or_else(
        || std::env::temp_dir().join("elmloop"),
        |home| home.join(".local").join("share").join("elmloop"),
    )
}

/// Expands a leading tilde to the home directory.
///
/// Paths without a tilde, or hosts without `$HOME`, are returned unchanged.
///
/// # Examples
///
/// ```
/// use elmloop::infrastructure::expand_tilde;
///
/// assert_eq!(expand_tilde("/absolute/path"), "/absolute/path");
/// assert_eq!(expand_tilde("relative/~"), "relative/~");
/// ```
#[must_use]
pub fn expand_tilde(path: &str) -> String {
    let Some(home) = home_dir() else {
        return path.to_string();
    };
    let home = home.to_string_lossy();
    if let Some(rest) = path.strip_prefix("~/") {
        format!("{home}/{rest}")
    } else if path == "~" {
        home.into_owned()
    } else {
        path.to_string()
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
}
