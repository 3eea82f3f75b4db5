use std::path::PathBuf;

use crate::error::{Result, SimError};

/// Expands a leading `~` in a path to the user's home directory.
pub fn expand_tilde(path: &str) -> String {
    if path.starts_with("~/") || path == "~" {
        if let Some(home) = dirs::home_dir() {
            let rest = &path[1..]; // "/dronesim/..."
            return home.join(rest.trim_start_matches('/')).to_string_lossy().to_string();
        }
    }
    path.to_string()
}

/// The user's home directory, or an error when it cannot be determined.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| SimError::Custom("Cannot find home directory".into()))
}

/// `~/.dronesim` — config, logs, and bundled models/worlds live here.
pub fn data_dir() -> Result<PathBuf> {
    Ok(home_dir()?.join(".dronesim"))
}
