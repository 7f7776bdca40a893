// Configuration module entry point
// Loads layered configuration and turns it into runtime components

mod types;

use hyper::StatusCode;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::handler::{Materializer, StatusPolicy};
use crate::http::{HttpRuntime, RestRuntime};

// Re-export public types
pub use types::{
    BuilderKind, Config, HttpConfig, LoggingConfig, MaterializerConfig, PerformanceConfig,
    ServerConfig,
};

impl Config {
    /// Load configuration from default "config" file (config.toml)
    pub fn load() -> Result<Self> {
        Self::load_from("config")
    }

    /// Load configuration from specified file path (without extension)
    ///
    /// Sources, later ones winning: built-in defaults, the optional file,
    /// `SERVER_*` environment variables (`SERVER_HTTP__SERVER_NAME=x`).
    pub fn load_from(config_path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("http.server_name", "rest-reply/0.1")?
            .set_default("http.max_body_size", 10_485_760)? // 10MB
            .set_default("materializer.entity_status", 200)?
            .set_default("materializer.absent_status", 204)?
            .set_default("materializer.builder", "rest")?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("SERVER").separator("__"))
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let cfg: Self =
            toml::from_str(content).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Render the configuration as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    fn validate(&self) -> Result<()> {
        self.socket_addr()?;
        self.materializer.status_policy()?;
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| Error::InvalidConfig(format!("Invalid address: {e}")))
    }
}

impl MaterializerConfig {
    /// Both statuses must be valid 2xx codes
    pub fn status_policy(&self) -> Result<StatusPolicy> {
        let success = |code: u16, key: &str| -> Result<StatusCode> {
            let status = StatusCode::from_u16(code)?;
            if status.is_success() {
                Ok(status)
            } else {
                Err(Error::InvalidConfig(format!(
                    "materializer.{key} must be a 2xx status, got {code}"
                )))
            }
        };
        Ok(StatusPolicy {
            entity: success(self.entity_status, "entity_status")?,
            absent: success(self.absent_status, "absent_status")?,
        })
    }

    pub fn to_materializer(&self) -> Result<Materializer> {
        let policy = self.status_policy()?;
        Ok(match self.builder {
            BuilderKind::Rest => Materializer::with_factory(Arc::new(RestRuntime), policy),
            BuilderKind::Http => Materializer::with_factory(Arc::new(HttpRuntime), policy),
        })
    }
}
