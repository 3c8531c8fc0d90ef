// Local context store: the access token plus the selected project, server
// and nameserver, persisted as JSON in the user's home directory.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::api::TokenResponse;

const CONFIG_DIR: &str = ".flux-relay";
const CONFIG_FILE: &str = "config.json";

/// Everything the CLI remembers between invocations.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct StoredConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub access_token: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub refresh_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub developer_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_server_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_nameserver_id: Option<String>,
}

impl StoredConfig {
    /// The access token, if present and not expired.
    pub fn access_token(&self) -> Option<&str> {
        if self.access_token.is_empty() {
            return None;
        }
        match self.expires_at {
            Some(at) if Utc::now() >= at => None,
            _ => Some(self.access_token.as_str()),
        }
    }

    pub fn has_session(&self) -> bool {
        self.access_token().is_some()
    }

    /// Record a freshly issued token. Selections survive a re-login.
    pub fn apply_token(&mut self, token: &TokenResponse) {
        self.access_token = token.access_token.clone();
        self.refresh_token = token.refresh_token.clone();
        self.expires_at = Some(Utc::now() + Duration::seconds(token.expires_in.max(0)));
        self.developer_id = token.developer.id.clone();
        self.email = token.developer.email.clone();
    }

    /// Selecting a project invalidates the server and nameserver below it.
    pub fn select_project(&mut self, project_id: &str) {
        if self.selected_project_id.as_deref() != Some(project_id) {
            self.selected_server_id = None;
            self.selected_nameserver_id = None;
        }
        self.selected_project_id = Some(project_id.to_string());
    }

    pub fn select_server(&mut self, server_id: &str) {
        if self.selected_server_id.as_deref() != Some(server_id) {
            self.selected_nameserver_id = None;
        }
        self.selected_server_id = Some(server_id.to_string());
    }

    pub fn select_nameserver(&mut self, nameserver_id: &str) {
        self.selected_nameserver_id = Some(nameserver_id.to_string());
    }
}

/// Reads and writes the config file at a fixed path.
#[derive(Debug, Clone)]
pub struct ContextStore {
    path: PathBuf,
}

impl ContextStore {
    pub fn default_path() -> PathBuf {
        let dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        dir.join(CONFIG_DIR).join(CONFIG_FILE)
    }

    pub fn new(path: PathBuf) -> Self {
        ContextStore { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored config. A missing file is an empty config; a file that
    /// no longer parses is ignored with a warning so `login` can overwrite it.
    pub fn load(&self) -> Result<StoredConfig> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(StoredConfig::default())
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read {}", self.path.display()))
            }
        };
        debug!(path = %self.path.display(), "loaded config file");
        match serde_json::from_str(&data) {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unreadable config file");
                Ok(StoredConfig::default())
            }
        }
    }

    /// Write the config with owner-only permissions.
    pub fn save(&self, config: &StoredConfig) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                create_private_dir(dir)?;
            }
        }
        let data = serde_json::to_string_pretty(config).context("Serializing config")?;
        write_private(&self.path, data.as_bytes())
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        debug!(path = %self.path.display(), "saved config file");
        Ok(())
    }

    /// Remove the config file. Returns whether a file was removed.
    pub fn remove(&self) -> Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", self.path.display())),
        }
    }

    /// Load, apply `f`, and save.
    pub fn update(&self, f: impl FnOnce(&mut StoredConfig)) -> Result<StoredConfig> {
        let mut config = self.load()?;
        f(&mut config);
        self.save(&config)?;
        Ok(config)
    }
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new()
        .recursive(true)
        .mode(0o700)
        .create(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))
}

#[cfg(unix)]
fn write_private(path: &Path, data: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies on creation; tighten files that already existed.
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    file.write_all(data)
}

#[cfg(not(unix))]
fn write_private(path: &Path, data: &[u8]) -> std::io::Result<()> {
    fs::write(path, data)
}
