//! Persisted user preferences.
//!
//! The auto-assign toggle survives restarts; it is stored as a small JSON
//! file next to the user's other client state.

use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// Preferences stored between runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Assign created tickets to the current user.
    pub auto_assign: bool,
}

impl Preferences {
    /// Load preferences, or `None` if nothing was saved yet.
    pub async fn load(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(name: "preferences.missing", path = %path.display(), "No saved preferences");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Save preferences, creating parent directories as needed.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json).await?;
        debug!(name: "preferences.saved", path = %path.display(), auto_assign = self.auto_assign, "Preferences saved");
        Ok(())
    }
}
