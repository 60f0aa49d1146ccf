//! Service configuration, read from the environment.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use thiserror::Error;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DATABASE_URL: &str = "sqlite://unitconv.db";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
    #[error("failed to read {key}: {message}")]
    Unreadable { key: String, message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub host: IpAddr,
    pub port: u16,
    pub database_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
        }
    }
}

impl ApiConfig {
    /// `UNITCONV_HOST`, `PORT`, `DATABASE_URL`; unset or empty means default.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| match std::env::var(key) {
            Ok(val) => Ok(Some(val)),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(e) => Err(ConfigError::Unreadable { key: key.to_string(), message: e.to_string() }),
        })
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<Option<String>, ConfigError>,
    {
        let optional = |key: &str| -> Result<Option<String>, ConfigError> {
            Ok(lookup(key)?.filter(|v| !v.trim().is_empty()))
        };
        let defaults = Self::default();

        let host = match optional("UNITCONV_HOST")? {
            Some(h) => h.trim().parse().map_err(|e| ConfigError::InvalidValue {
                key: "UNITCONV_HOST".to_string(),
                message: format!("must be an IP address: {e}"),
            })?,
            None => defaults.host,
        };
        let port = match optional("PORT")? {
            Some(p) => p.trim().parse().map_err(|e| ConfigError::InvalidValue {
                key: "PORT".to_string(),
                message: format!("must be a port number: {e}"),
            })?,
            None => defaults.port,
        };
        let database_url = optional("DATABASE_URL")?.unwrap_or(defaults.database_url);

        Ok(Self { host, port, database_url })
    }

    pub fn addr(&self) -> SocketAddr { SocketAddr::new(self.host, self.port) }
}
