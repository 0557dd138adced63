//! Database configuration read from a YAML file.
//!
//! ```yaml
//! database:
//!   host: localhost
//!   port: 5432
//!   user: dmp
//!   password: secret
//!   dbname: radio
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;
use sqlx::postgres::PgConnectOptions;
use tracing::info;

use crate::error::ImportError;

const DEFAULT_PORT: u16 = 5432;
const PASSWORD_ENV: &str = "DB_PASSWORD";

#[derive(Debug, Deserialize)]
struct ConfigFile {
    database: Option<RawDatabaseConfig>,
}

#[derive(Debug, Deserialize)]
struct RawDatabaseConfig {
    host: Option<String>,
    port: Option<u16>,
    user: Option<String>,
    password: Option<String>,
    #[serde(alias = "database", alias = "name")]
    dbname: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.dbname)
    }

    /// `user@host:port/dbname`, without the password.
    pub fn display_target(&self) -> String {
        format!("{}@{}:{}/{}", self.user, self.host, self.port, self.dbname)
    }
}

/// Reads the `database` section of `path`.
///
/// A missing password falls back to `DB_PASSWORD`, which may come from a
/// `.env` file in the working directory.
pub fn load_config(path: &Path) -> Result<DatabaseConfig, ImportError> {
    let error = |message: String| ImportError::Config {
        path: path.to_path_buf(),
        message,
    };

    let text = fs::read_to_string(path).map_err(|e| error(format!("cannot read file: {e}")))?;
    dotenvy::dotenv().ok();
    let config = parse_config(&text, std::env::var(PASSWORD_ENV).ok()).map_err(error)?;

    info!("Database configuration read from {}", path.display());
    Ok(config)
}

fn parse_config(text: &str, env_password: Option<String>) -> Result<DatabaseConfig, String> {
    let file: ConfigFile =
        serde_yaml::from_str(text).map_err(|e| format!("invalid YAML: {e}"))?;
    let raw = file
        .database
        .ok_or_else(|| "missing 'database' section".to_string())?;

    let required = |value: Option<String>, key: &str| -> Result<String, String> {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| format!("missing 'database.{key}'"))
    };

    let password = raw
        .password
        .filter(|p| !p.is_empty())
        .or(env_password.filter(|p| !p.is_empty()))
        .ok_or_else(|| format!("missing 'database.password' (or {PASSWORD_ENV})"))?;

    Ok(DatabaseConfig {
        host: required(raw.host, "host")?,
        port: raw.port.unwrap_or(DEFAULT_PORT),
        user: required(raw.user, "user")?,
        password,
        dbname: required(raw.dbname, "dbname")?,
    })
}
