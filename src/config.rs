// Service configuration
// Read from the environment after `.env` has been loaded

use std::collections::HashMap;
use thiserror::Error;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub max_connections: u32,
    pub bcrypt_cost: u32,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_url = env_map
            .get("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_URL".to_string()))?;

        let port = parse_or(&env_map, "PORT", DEFAULT_PORT)?;

        let max_connections = parse_or(&env_map, "DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?;
        if max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "DATABASE_MAX_CONNECTIONS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let bcrypt_cost = parse_or(&env_map, "BCRYPT_COST", bcrypt::DEFAULT_COST)?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::InvalidValue(
                "BCRYPT_COST".to_string(),
                format!("must be between 4 and 31, got {}", bcrypt_cost),
            ));
        }

        Ok(Self {
            database_url,
            port,
            max_connections,
            bcrypt_cost,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    env_map: &HashMap<String, String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match env_map.get(key) {
        Some(raw) => raw.trim().parse().map_err(|_| {
            ConfigError::InvalidValue(key.to_string(), format!("cannot parse '{}'", raw))
        }),
        None => Ok(default),
    }
}
