//! Server configuration: TOML file, then environment overrides.

use std::path::{Path, PathBuf};

use notewall_catalog::CatalogConfig;
use notewall_protocol::SigningConfig;
use notewall_state::RateLimitConfig;
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

pub const ENV_SESSION_SECRET: &str = "SESSION_SECRET";
pub const ENV_BIND: &str = "NOTEWALL_BIND";
pub const ENV_PRODUCTION: &str = "NOTEWALL_PRODUCTION";
pub const ENV_CATALOG_CLIENT_ID: &str = "CATALOG_CLIENT_ID";
pub const ENV_CATALOG_CLIENT_SECRET: &str = "CATALOG_CLIENT_SECRET";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: {value:?}")]
    InvalidEnv { key: &'static str, value: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Serve cookies with the `Secure` flag.
    pub production: bool,
    pub signing: SigningConfig,
    pub rate_limit: RateLimitConfig,
    pub catalog: CatalogConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            production: false,
            signing: SigningConfig::default(),
            rate_limit: RateLimitConfig::default(),
            catalog: CatalogConfig::default(),
        }
    }
}

/// `$XDG_CONFIG_HOME/notewall/config.toml` or the platform equivalent.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("notewall").join("config.toml"))
}

impl ServerConfig {
    /// Load from `path` when given (it must exist), else from the default
    /// location when a file is there, else built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path),
                None => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Apply overrides from the environment. `lookup` is `std::env::var`
    /// in the binary and a map in tests.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // A variable set to an empty value leaves the file setting alone.
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(secret) = lookup(ENV_SESSION_SECRET) {
            self.signing.secret = Some(secret);
        }
        if let Some(bind) = lookup(ENV_BIND) {
            self.bind_addr = bind;
        }
        if let Some(value) = lookup(ENV_PRODUCTION) {
            self.production = parse_flag(&value).ok_or(ConfigError::InvalidEnv {
                key: ENV_PRODUCTION,
                value,
            })?;
        }
        if let Some(id) = lookup(ENV_CATALOG_CLIENT_ID) {
            self.catalog.client_id = Some(id);
        }
        if let Some(secret) = lookup(ENV_CATALOG_CLIENT_SECRET) {
            self.catalog.client_secret = Some(secret);
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_defaults() {
        let c = ServerConfig::default();
        assert_eq!(c.bind_addr, DEFAULT_BIND_ADDR);
        assert!(!c.production);
        assert!(c.signing.secret.is_none());
        assert!(c.signing.allow_insecure_fallback);
        assert_eq!(c.rate_limit.window_ms, 300_000);
        assert_eq!(c.rate_limit.max_actions, 10);
        assert_eq!(c.rate_limit.reclaim_interval_ms, 600_000);
        assert_eq!(c.catalog.max_retries, 3);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
production = true

[signing]
secret = "from-file"

[rate_limit]
max_actions = 3
"#,
        )
        .unwrap();

        let c = ServerConfig::load(Some(&path)).unwrap();
        assert!(c.production);
        assert_eq!(c.signing.secret.as_deref(), Some("from-file"));
        assert!(c.signing.allow_insecure_fallback);
        assert_eq!(c.rate_limit.max_actions, 3);
        assert_eq!(c.rate_limit.window_ms, 300_000);
        assert_eq!(c.bind_addr, DEFAULT_BIND_ADDR);
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ServerConfig::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_bad_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "bind_addr = [").unwrap();
        assert!(matches!(
            ServerConfig::load(Some(&path)),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_SESSION_SECRET, "from-env"),
            (ENV_BIND, "127.0.0.1:8080"),
            (ENV_PRODUCTION, "true"),
            (ENV_CATALOG_CLIENT_ID, "cid"),
            (ENV_CATALOG_CLIENT_SECRET, "csecret"),
        ]
        .into_iter()
        .collect();

        let mut c = ServerConfig::default();
        c.apply_env(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(c.signing.secret.as_deref(), Some("from-env"));
        assert_eq!(c.bind_addr, "127.0.0.1:8080");
        assert!(c.production);
        assert_eq!(c.catalog.client_id.as_deref(), Some("cid"));
        assert_eq!(c.catalog.client_secret.as_deref(), Some("csecret"));
    }

    #[test]
    fn test_empty_env_does_not_clear_file_secret() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[signing]
secret = "from-file"
allow_insecure_fallback = false

[catalog]
client_id = "file-id"
client_secret = "file-secret"
"#,
        )
        .unwrap();

        let env: HashMap<&str, &str> = [
            (ENV_SESSION_SECRET, ""),
            (ENV_BIND, "  "),
            (ENV_CATALOG_CLIENT_ID, ""),
            (ENV_CATALOG_CLIENT_SECRET, " "),
        ]
        .into_iter()
        .collect();

        let mut c = ServerConfig::load(Some(&path)).unwrap();
        c.apply_env(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(c.signing.secret.as_deref(), Some("from-file"));
        assert_eq!(c.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(c.catalog.client_id.as_deref(), Some("file-id"));
        assert_eq!(c.catalog.client_secret.as_deref(), Some("file-secret"));

        let signer = notewall_protocol::IdentitySigner::from_config(&c.signing)
            .expect("configured secret must be used");
        assert!(!signer.is_insecure(), "file secret was replaced by the fallback");
    }

    #[test]
    fn test_bad_production_flag() {
        let mut c = ServerConfig::default();
        let err = c
            .apply_env(|k| (k == ENV_PRODUCTION).then(|| "maybe".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { key: ENV_PRODUCTION, .. }));
    }
}
