//! Layered configuration: defaults < `servidesk.toml` < `SERVIDESK_*` env vars,
//! with `DATABASE_URL` honored as the conventional override.

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub email: Option<EmailConfig>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    pub evidence_dir: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_server: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8085,
            },
            database: DatabaseConfig {
                url: "postgres://localhost/servidesk".to_string(),
            },
            storage: StorageConfig {
                evidence_dir: "./data/evidences".to_string(),
            },
            email: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from("servidesk.toml")
    }

    pub fn load_from(path: &str) -> anyhow::Result<Self> {
        let mut config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("SERVIDESK_").split("__"))
            .extract()?;
        if let Ok(url) = std::env::var("DATABASE_URL") {
            if !url.is_empty() {
                config.database.url = url;
            }
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_apply_without_a_file() {
        let config = AppConfig::load_from("does-not-exist.toml").unwrap();
        assert_eq!(config.server.port, 8085);
        assert!(config.email.is_none());
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("servidesk.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[server]\nhost = \"127.0.0.1\"\nport = 9000\n\n[email]\nsmtp_server = \"mail.local\"\nsmtp_port = 587\nusername = \"desk\"\npassword = \"secret\"\nfrom = \"desk@mail.local\""
        )
        .unwrap();

        let config = AppConfig::load_from(path.to_str().unwrap()).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.email.unwrap().smtp_server, "mail.local");
        // untouched sections keep their defaults
        assert_eq!(config.storage.evidence_dir, "./data/evidences");
    }
}
