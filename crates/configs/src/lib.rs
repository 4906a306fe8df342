use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;
use std::net::SocketAddr;

use common::utils::logging::LogFormat;
use models::db::Consistency;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub grpc: GrpcConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_keyspace")]
    pub keyspace: String,
    #[serde(default = "default_consistency")]
    pub consistency: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { keyspace: default_keyspace(), consistency: default_consistency() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GrpcConfig {
    /// Listen address of the native RPC server.
    #[serde(default = "default_grpc_address")]
    pub address: String,
    /// Endpoint the gateway dials in loopback mode. Derived from `address` when empty.
    #[serde(default)]
    pub endpoint: String,
}

impl Default for GrpcConfig {
    fn default() -> Self {
        Self { address: default_grpc_address(), endpoint: String::new() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_address")]
    pub address: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { address: default_http_address() }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GatewayMode {
    /// Gateway calls the RPC handler directly inside the process.
    #[default]
    InProcess,
    /// Gateway dials the RPC server over a client channel.
    Loopback,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct GatewayConfig {
    #[serde(default)]
    pub mode: GatewayMode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { format: default_log_format() }
    }
}

fn default_keyspace() -> String { "user_service".into() }
fn default_consistency() -> String { "quorum".into() }
fn default_grpc_address() -> String { "127.0.0.1:50051".into() }
fn default_http_address() -> String { "127.0.0.1:8080".into() }
fn default_log_format() -> String { "compact".into() }

/// `CONFIG_PATH` when set, otherwise `config.toml` in the working directory.
pub fn default_path() -> String {
    std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string())
}

pub fn load_default() -> Result<AppConfig> {
    load_from_file(&default_path())
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let cfg: AppConfig = toml::from_str(&content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Apply environment overrides, fill blanks with defaults and reject unusable values.
    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.apply_env();
        self.storage.normalize()?;
        self.grpc.normalize()?;
        self.http.normalize()?;
        self.logging.normalize()?;
        Ok(())
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("STORAGE_KEYSPACE") { self.storage.keyspace = v; }
        if let Ok(v) = std::env::var("GRPC_ADDR") { self.grpc.address = v; }
        if let Ok(v) = std::env::var("GRPC_ENDPOINT") { self.grpc.endpoint = v; }
        if let Ok(v) = std::env::var("HTTP_ADDR") { self.http.address = v; }
        if let Ok(v) = std::env::var("LOG_FORMAT") { self.logging.format = v; }
    }
}

impl StorageConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.keyspace.trim().is_empty() {
            self.keyspace = default_keyspace();
        }
        if !self.keyspace.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(anyhow!("storage.keyspace may only contain letters, digits and '_'"));
        }
        let level: Consistency = self.consistency.parse().map_err(|e| anyhow!("storage.consistency: {e}"))?;
        self.consistency = level.to_string();
        Ok(())
    }

    /// The configured level. Valid once the config has been normalized.
    pub fn consistency(&self) -> Result<Consistency> {
        self.consistency.parse().map_err(|e| anyhow!("storage.consistency: {e}"))
    }
}

impl LoggingConfig {
    fn normalize(&mut self) -> Result<()> {
        let format: LogFormat = self.format.parse().map_err(|e| anyhow!("logging.format: {e}"))?;
        self.format = format.as_str().to_string();
        Ok(())
    }

    pub fn log_format(&self) -> Result<LogFormat> {
        self.format.parse().map_err(|e| anyhow!("logging.format: {e}"))
    }
}

impl GrpcConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.address.trim().is_empty() {
            self.address = default_grpc_address();
        }
        let addr = parse_addr("grpc.address", &self.address)?;
        if self.endpoint.trim().is_empty() {
            self.endpoint = format!("http://{addr}");
        }
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(anyhow!("grpc.endpoint must start with http:// or https://"));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        parse_addr("grpc.address", &self.address)
    }
}

impl HttpConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.address.trim().is_empty() {
            self.address = default_http_address();
        }
        parse_addr("http.address", &self.address)?;
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        parse_addr("http.address", &self.address)
    }
}

fn parse_addr(key: &str, value: &str) -> Result<SocketAddr> {
    value
        .trim()
        .parse()
        .map_err(|e| anyhow!("{key} is not a socket address ({value:?}): {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let mut cfg: AppConfig = toml::from_str("").unwrap();
        cfg.storage.normalize().unwrap();
        cfg.grpc.normalize().unwrap();
        cfg.http.normalize().unwrap();
        assert_eq!(cfg.storage.keyspace, "user_service");
        assert_eq!(cfg.storage.consistency, "quorum");
        assert_eq!(cfg.grpc.endpoint, "http://127.0.0.1:50051");
        assert_eq!(cfg.gateway.mode, GatewayMode::InProcess);
        assert_eq!(cfg.logging.format, "compact");
    }

    #[test]
    fn sections_parse_from_toml() {
        let doc = r#"
            [storage]
            keyspace = "accounts"
            consistency = "QUORUM"

            [grpc]
            address = "0.0.0.0:6000"
            endpoint = "http://127.0.0.1:6000"

            [http]
            address = "0.0.0.0:8088"

            [gateway]
            mode = "loopback"
        "#;
        let mut cfg: AppConfig = toml::from_str(doc).unwrap();
        cfg.storage.normalize().unwrap();
        cfg.grpc.normalize().unwrap();
        cfg.http.normalize().unwrap();
        assert_eq!(cfg.storage.keyspace, "accounts");
        assert_eq!(cfg.storage.consistency, "quorum");
        assert_eq!(cfg.grpc.socket_addr().unwrap().port(), 6000);
        assert_eq!(cfg.http.socket_addr().unwrap().port(), 8088);
        assert_eq!(cfg.gateway.mode, GatewayMode::Loopback);
    }

    #[test]
    fn rejects_unknown_consistency() {
        let mut storage = StorageConfig { keyspace: "ks".into(), consistency: "serial-ish".into() };
        let err = storage.normalize().unwrap_err().to_string();
        assert!(err.contains("storage.consistency"), "{err}");
        assert!(err.contains("serial-ish"), "{err}");

        let mut storage = StorageConfig { keyspace: "ks".into(), consistency: " Local_Quorum ".into() };
        storage.normalize().unwrap();
        assert_eq!(storage.consistency().unwrap(), Consistency::LocalQuorum);
    }

    #[test]
    fn rejects_unknown_log_format() {
        let mut logging = LoggingConfig { format: "pretty".into() };
        let err = logging.normalize().unwrap_err().to_string();
        assert!(err.contains("logging.format"), "{err}");

        let mut logging = LoggingConfig { format: "JSON".into() };
        logging.normalize().unwrap();
        assert_eq!(logging.log_format().unwrap(), LogFormat::Json);
    }

    #[test]
    fn rejects_bad_listen_address() {
        let mut http = HttpConfig { address: "localhost".into() };
        assert!(http.normalize().is_err());
        let mut grpc = GrpcConfig { address: "127.0.0.1:50051".into(), endpoint: "tcp://x".into() };
        assert!(grpc.normalize().is_err());
    }
}
