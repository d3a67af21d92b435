use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, anyhow, bail, ensure};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::cli::{Cli, LogFormat};

fn default_log_format() -> LogFormat {
    LogFormat::Json
}

fn default_client_timeout() -> u64 {
    30
}

fn default_backend_connect_timeout() -> u64 {
    5
}

fn default_backend_timeout() -> u64 {
    60
}

fn default_max_line_size() -> usize {
    8192
}

fn default_max_header_size() -> usize {
    32 * 1024
}

fn default_max_header_count() -> usize {
    128
}

fn default_max_request_body_size() -> usize {
    64 * 1024 * 1024
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Address the proxy listens on.
    pub listen: SocketAddr,
    /// Backend `host:port` every request is forwarded to.
    pub backend: String,
    #[serde(default = "default_log_format")]
    pub log: LogFormat,
    #[serde(default = "default_client_timeout")]
    pub client_timeout: u64,
    #[serde(default = "default_backend_connect_timeout")]
    pub backend_connect_timeout: u64,
    #[serde(default = "default_backend_timeout")]
    pub backend_timeout: u64,
    #[serde(default = "default_max_line_size")]
    pub max_line_size: usize,
    #[serde(default = "default_max_header_size")]
    pub max_header_size: usize,
    #[serde(default = "default_max_header_count")]
    pub max_header_count: usize,
    #[serde(default = "default_max_request_body_size")]
    pub max_request_body_size: usize,
    /// Extra `type/subtype` entries merged into the builtin MIME registry.
    #[serde(default)]
    pub extra_mime_types: Vec<String>,
}

impl Settings {
    pub fn load(cli: &Cli) -> Result<Self> {
        let config_path = resolve_config_path(cli)?;
        let cfg = Config::builder()
            .add_source(File::from(config_path).required(true))
            .add_source(
                Environment::with_prefix("FORMGUARD")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(to_anyhow)?;
        let settings: Settings = cfg.try_deserialize().map_err(to_anyhow)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.backend.is_empty(), "backend must not be empty");
        ensure!(
            self.backend.contains(':'),
            "backend must be of the form host:port"
        );
        ensure!(self.client_timeout > 0, "client_timeout must be positive");
        ensure!(self.backend_timeout > 0, "backend_timeout must be positive");
        ensure!(self.max_line_size > 0, "max_line_size must be positive");
        ensure!(
            self.max_header_size >= self.max_line_size,
            "max_header_size must be at least max_line_size"
        );
        Ok(())
    }

    pub fn client_timeout(&self) -> Duration {
        Duration::from_secs(self.client_timeout)
    }

    pub fn backend_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.backend_connect_timeout)
    }

    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend_timeout)
    }
}

fn resolve_config_path(cli: &Cli) -> Result<PathBuf> {
    if let Some(path) = &cli.config {
        ensure!(path.exists(), "config file {} does not exist", path.display());
        return Ok(path.clone());
    }
    let default = PathBuf::from("formguard.toml");
    if default.exists() {
        return Ok(default);
    }
    bail!("no configuration found; pass --config or create ./formguard.toml");
}

fn to_anyhow(err: ConfigError) -> anyhow::Error {
    anyhow!(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_settings() -> Settings {
        Settings {
            listen: "127.0.0.1:8080".parse().expect("socket addr"),
            backend: "127.0.0.1:8000".to_string(),
            log: LogFormat::Text,
            client_timeout: default_client_timeout(),
            backend_connect_timeout: default_backend_connect_timeout(),
            backend_timeout: default_backend_timeout(),
            max_line_size: default_max_line_size(),
            max_header_size: default_max_header_size(),
            max_header_count: default_max_header_count(),
            max_request_body_size: default_max_request_body_size(),
            extra_mime_types: Vec::new(),
        }
    }

    #[test]
    fn valid_settings_pass_validation() {
        base_settings().validate().expect("valid");
    }

    #[test]
    fn backend_without_port_is_rejected() {
        let mut settings = base_settings();
        settings.backend = "localhost".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn header_size_must_cover_a_full_line() {
        let mut settings = base_settings();
        settings.max_header_size = settings.max_line_size - 1;
        assert!(settings.validate().is_err());
    }
}
