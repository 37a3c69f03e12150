//! Configuration module - environment variable parsing

pub mod war;

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::util::rate_limit::CONSOLE_RATE_LIMIT;
use crate::util::time::DEFAULT_TPS;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Directory holding `war.json`, the zone files and the trash
    pub data_dir: PathBuf,
    /// Authority ticks per second
    pub tick_rate: u32,
    /// Console commands accepted per second
    pub console_rate_limit: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // PORT wins over SERVER_ADDR for hosted deployments
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            data_dir: env::var("WAR_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./war-data")),
            tick_rate: parse_positive("WAR_TICK_RATE", DEFAULT_TPS)?,
            console_rate_limit: parse_positive("WAR_CONSOLE_RATE_LIMIT", CONSOLE_RATE_LIMIT)?,
        })
    }
}

fn parse_positive(var: &'static str, default: u32) -> Result<u32, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw
            .parse::<u32>()
            .ok()
            .filter(|v| *v > 0)
            .ok_or(ConfigError::Invalid(var)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
