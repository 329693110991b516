use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::TimeDelta;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub database_max_connections: u32,
    pub bind_addr: String,
    pub app_url: String,
    pub storage_root: PathBuf,
    pub storage_public_url: String,
    pub dashboard_path: String,
    pub upload_ttl: TimeDelta,
}

impl Settings {
    /// Reads settings from the process environment, after loading `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let app_url = lookup("APP_URL")
            .unwrap_or_else(|| "http://127.0.0.1:3000".to_string())
            .trim_end_matches('/')
            .to_string();
        let storage_public_url =
            lookup("STORAGE_PUBLIC_URL").unwrap_or_else(|| format!("{app_url}/storage"));

        Ok(Self {
            database_url,
            database_max_connections: parse(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?,
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:3000".to_string()),
            app_url,
            storage_root: lookup("STORAGE_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./storage")),
            storage_public_url,
            dashboard_path: lookup("DASHBOARD_PATH").unwrap_or_else(|| "/dashboard".to_string()),
            upload_ttl: upload_ttl(&lookup)?,
        })
    }
}

/// `UPLOAD_TTL_SECS` must be a positive number of seconds chrono can represent.
fn upload_ttl(lookup: &impl Fn(&str) -> Option<String>) -> Result<TimeDelta, ConfigError> {
    const NAME: &str = "UPLOAD_TTL_SECS";
    let secs: i64 = parse(lookup, NAME, 24 * 60 * 60)?;

    TimeDelta::try_seconds(secs)
        .filter(|ttl| *ttl > TimeDelta::zero())
        .ok_or_else(|| ConfigError::Invalid {
            name: NAME,
            value: secs.to_string(),
        })
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}
