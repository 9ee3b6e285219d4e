//! Server configuration.
//!
//! Values come from `flowmaster.toml`, then environment variables, then
//! command-line flags applied by the caller.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use flow_core::PacingProfile;
use flow_llm::LlmSettings;
use flow_store::SessionStore;

use crate::error::{ServerError, ServerResult};

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "flowmaster.toml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory with the stock wireframe PNGs.
    pub assets_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            assets_dir: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackendKind {
    File,
    Memory,
}

impl Default for StoreBackendKind {
    fn default() -> Self {
        Self::File
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    pub root: PathBuf,
    pub backend: StoreBackendKind,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            backend: StoreBackendKind::File,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlaybackConfig {
    pub profile: PacingProfile,
    pub auto_approve: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct JobsConfig {
    /// Upper bound for one artifact job.
    pub timeout_secs: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

/// Complete FlowMaster configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FlowConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub playback: PlaybackConfig,
    pub llm: LlmSettings,
    pub jobs: JobsConfig,
}

impl FlowConfig {
    /// Load configuration and apply environment overrides.
    ///
    /// An explicit `path` must exist. Without one, `flowmaster.toml` in the
    /// working directory is used when present.
    pub fn load(path: Option<&Path>) -> ServerResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> ServerResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        debug!("Loaded configuration from {}", path.display());
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ServerResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `FLOWMASTER_HOST`, `FLOWMASTER_PORT` and `FLOWMASTER_STORE`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("FLOWMASTER_HOST").filter(|h| !h.trim().is_empty()) {
            self.server.host = host;
        }
        if let Some(port) = lookup("FLOWMASTER_PORT") {
            match port.trim().parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!("Ignoring invalid FLOWMASTER_PORT: {}", port),
            }
        }
        if let Some(root) = lookup("FLOWMASTER_STORE").filter(|r| !r.trim().is_empty()) {
            self.store.root = PathBuf::from(root);
        }
    }

    /// `host:port`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn open_store(&self) -> SessionStore {
        match self.store.backend {
            StoreBackendKind::File => SessionStore::file(&self.store.root),
            StoreBackendKind::Memory => SessionStore::memory(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_llm::ProviderKind;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = FlowConfig::default();
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.jobs.timeout_secs, 30);
        assert_eq!(config.store.backend, StoreBackendKind::File);
        assert_eq!(config.playback.profile, PacingProfile::Brisk);
    }

    #[test]
    fn test_parse_toml() {
        let config = FlowConfig::from_toml_str(
            r#"
            [server]
            port = 9090
            assets_dir = "public/wireframes"

            [store]
            backend = "memory"

            [playback]
            profile = "deliberate"
            auto_approve = true

            [llm]
            order = ["groq", "gemini"]
            models = { groq = "llama-3.1-8b-instant" }

            [jobs]
            timeout_secs = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.assets_dir, Some(PathBuf::from("public/wireframes")));
        assert_eq!(config.store.backend, StoreBackendKind::Memory);
        assert_eq!(config.playback.profile, PacingProfile::Deliberate);
        assert!(config.playback.auto_approve);
        assert_eq!(config.llm.order, vec![ProviderKind::Groq, ProviderKind::Gemini]);
        assert_eq!(config.llm.models.get("groq").map(String::as_str), Some("llama-3.1-8b-instant"));
        assert_eq!(config.jobs.timeout_secs, 5);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(matches!(
            FlowConfig::from_toml_str("[server]\nport = \"high\""),
            Err(ServerError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("FLOWMASTER_HOST", "0.0.0.0"),
            ("FLOWMASTER_PORT", "not-a-port"),
            ("FLOWMASTER_STORE", "/var/lib/flowmaster"),
        ]
        .into_iter()
        .collect();

        let mut config = FlowConfig::default();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.store.root, PathBuf::from("/var/lib/flowmaster"));
    }
}
