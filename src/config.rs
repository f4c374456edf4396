use anyhow::{anyhow, Result};
use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use tracing::info;

pub const DB_PATH_VAR: &str = "SANTA_DB_PATH";
pub const BIND_VAR: &str = "SANTA_BIND";
pub const PORT_VAR: &str = "SANTA_PORT";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// SQLite file; `:memory:` keeps everything in RAM
    pub db_path: PathBuf,
    pub bind: String,
    pub port: u16,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup (the environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            db_path: try_load(&lookup, DB_PATH_VAR, "santa.db")?,
            bind: try_load(&lookup, BIND_VAR, "0.0.0.0")?,
            port: try_load(&lookup, PORT_VAR, "3000")?,
        })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

fn try_load<T, F>(lookup: &F, key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse()
        .map_err(|e| anyhow!("Invalid {key} value '{raw}': {e}"))
}
