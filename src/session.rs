use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

/// Client-local storage for the opaque access token, kept in a single
/// well-known file. Absence of the file (or an empty file) means the user is
/// not authenticated.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Read the stored token, if any. Surrounding whitespace is stripped so a
    /// hand-edited file with a trailing newline still works.
    pub fn load(&self) -> Option<String> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                if token.is_empty() {
                    None
                } else {
                    Some(token.to_string())
                }
            }
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "no stored session token");
                None
            }
        }
    }

    pub fn save(&self, token: &str) -> Result<()> {
        fs::write(&self.path, token).context(format!(
            "Failed to write session token to {}",
            self.path.display()
        ))
    }

    /// Remove the stored token. Missing file is not an error.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context(format!(
                "Failed to remove session token at {}",
                self.path.display()
            )),
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.load().is_some()
    }
}
