//! Signed-in session stored next to the config file

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use contentforge_core::auth::{Session, SessionKeeper, ValidationOutcome};
use contentforge_core::config::AuthConfig;
use tracing::{debug, warn};

use crate::client::ApiClient;

const SESSION_FILE: &str = "session.json";

/// Truncate or create `path`, readable by the owner only before any write
fn private_file(path: &Path) -> std::io::Result<fs::File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    std::os::unix::fs::OpenOptionsExt::mode(&mut options, 0o600);

    let file = options.open(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        // mode() only applies on creation
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }
    Ok(file)
}

/// Session persistence under one directory
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(SESSION_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> anyhow::Result<Option<Session>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session file: {}", self.path.display()))?;
        let session = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse session file: {}", self.path.display()))?;
        Ok(Some(session))
    }

    pub fn save(&self, session: &Session) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(session)?;
        let mut file = private_file(&self.path)
            .with_context(|| format!("Failed to open session file: {}", self.path.display()))?;
        file.write_all(contents.as_bytes())
            .with_context(|| format!("Failed to write session file: {}", self.path.display()))?;
        Ok(())
    }

    /// Returns whether a session file was removed
    pub fn clear(&self) -> anyhow::Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        fs::remove_file(&self.path)?;
        Ok(true)
    }

    /// Load the session, refreshing and re-saving it when close to expiry
    pub async fn fresh(
        &self,
        client: &ApiClient,
        config: &AuthConfig,
    ) -> anyhow::Result<Option<Session>> {
        let Some(session) = self.load()? else {
            return Ok(None);
        };

        let keeper = SessionKeeper::from_config(Arc::new(client.clone()), Some(session), config);
        match keeper.validate().await {
            ValidationOutcome::Refreshed => {
                if let Some(refreshed) = keeper.session().await {
                    self.save(&refreshed)?;
                    debug!("Stored refreshed session");
                }
            }
            ValidationOutcome::RefreshFailed(reason) => {
                warn!(reason = %reason, "Could not refresh session; run `contentforge login` if requests fail");
            }
            _ => {}
        }
        Ok(keeper.session().await)
    }
}
