//! Layered configuration: optional `inspection.toml` plus `INSPECTION__*` env overrides.

use config::{Config, Environment, File};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub storage: StorageConfig,
    pub bootstrap: BootstrapConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: IpAddr,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub ttl_hours: i64,
    /// Adds `Secure` to the session cookie; enable behind TLS.
    pub secure: bool,
}

/// Photo bucket. An empty bucket keeps photos in process memory.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub bucket: String,
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub prefix: String,
    pub max_photo_bytes: usize,
}

/// First administrator, created only while the users table is empty.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    pub admin_username: String,
    pub admin_password: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            path: base.join("container-inspection").join("app.db"),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "inspection_session".to_string(),
            ttl_hours: 12,
            secure: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            endpoint: None,
            access_key: None,
            secret_key: None,
            prefix: String::new(),
            max_photo_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            admin_username: "admin".to_string(),
            admin_password: String::new(),
        }
    }
}

impl AppConfig {
    /// Load `inspection.toml` (or the file named by `INSPECTION_CONFIG`) if present,
    /// then apply environment overrides such as `INSPECTION__SERVER__PORT=9000`.
    pub fn load() -> Result<Self, config::ConfigError> {
        let path = std::env::var("INSPECTION_CONFIG").unwrap_or_else(|_| "inspection".to_string());
        Config::builder()
            .add_source(File::with_name(&path).required(false))
            .add_source(
                Environment::with_prefix("INSPECTION")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn session_ttl_seconds(&self) -> i64 {
        self.session.ttl_hours * 3600
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.session.cookie_name, "inspection_session");
        assert_eq!(cfg.session_ttl_seconds(), 12 * 3600);
        assert!(cfg.storage.bucket.is_empty());
        assert!(cfg.database.path.ends_with("app.db"));
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let cfg: AppConfig = Config::builder()
            .add_source(File::from_str(
                "[server]\nport = 9000\n[storage]\nbucket = \"photos\"\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.storage.bucket, "photos");
        assert_eq!(cfg.storage.max_photo_bytes, 10 * 1024 * 1024);
        assert_eq!(cfg.session.ttl_hours, 12);
    }
}
