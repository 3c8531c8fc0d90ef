// Resolved runtime settings, built once in `main` and passed to every
// command instead of living in globals.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::debug;

use crate::api::ApiClient;
use crate::store::ContextStore;

pub const DEFAULT_API_URL: &str = "https://flux.postacksolutions.com";

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_url: String,
    pub config_path: PathBuf,
    pub verbose: bool,
}

impl Settings {
    /// API URL precedence: flag or `FLUX_RELAY_API_URL`, then `api_url` from
    /// the config file, then the production default.
    pub fn resolve(api_url: Option<String>, config: Option<PathBuf>, verbose: bool) -> Self {
        let config_path = config.unwrap_or_else(ContextStore::default_path);
        let api_url = api_url
            .filter(|u| !u.trim().is_empty())
            .or_else(|| {
                ContextStore::new(config_path.clone())
                    .load()
                    .ok()
                    .and_then(|c| c.api_url)
                    .filter(|u| !u.trim().is_empty())
            })
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        debug!(%api_url, config = %config_path.display(), "resolved settings");
        Settings {
            api_url,
            config_path,
            verbose,
        }
    }

    pub fn store(&self) -> ContextStore {
        ContextStore::new(self.config_path.clone())
    }

    pub fn client(&self) -> Result<ApiClient> {
        ApiClient::new(&self.api_url).context("Failed to build HTTP client")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoredConfig;
    use tempfile::TempDir;

    #[test]
    fn test_flag_wins_over_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        ContextStore::new(path.clone())
            .save(&StoredConfig {
                api_url: Some("http://from-file".into()),
                ..StoredConfig::default()
            })
            .unwrap();

        let s = Settings::resolve(Some("http://from-flag".into()), Some(path.clone()), false);
        assert_eq!(s.api_url, "http://from-flag");

        let s = Settings::resolve(None, Some(path), false);
        assert_eq!(s.api_url, "http://from-file");
    }

    #[test]
    fn test_default_url_when_nothing_configured() {
        let dir = TempDir::new().unwrap();
        let s = Settings::resolve(None, Some(dir.path().join("missing.json")), true);
        assert_eq!(s.api_url, DEFAULT_API_URL);
        assert!(s.verbose);
    }
}
