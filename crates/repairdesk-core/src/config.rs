//! Configuration resolution for Repair Desk.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Settings file (JSON, `--config` / `REPAIRDESK_CONFIG`)
//! 3. Environment variables
//! 4. CLI arguments (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Complete Repair Desk configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
    /// Manager account created at startup when its login is absent.
    #[serde(default)]
    pub bootstrap: Option<BootstrapConfig>,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub database_path: Option<PathBuf>,
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
            database_path: None,
            log_level: "info".to_string(),
        }
    }
}

/// Token signing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Access token lifetime in seconds. Default: 24 hours.
    pub access_ttl_secs: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "dev-secret-change-me".to_string(),
            access_ttl_secs: 24 * 60 * 60,
        }
    }
}

/// List pagination bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub default_limit: u32,
    /// Upper bound applied to any caller-supplied `limit`.
    pub max_limit: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: 50,
            max_limit: 100,
        }
    }
}

/// Credentials for the initial manager account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    pub login: String,
    pub password: String,
    #[serde(default = "default_bootstrap_name")]
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
}

fn default_bootstrap_name() -> String {
    "Administrator".to_string()
}

/// Load configuration with hierarchical resolution.
///
/// `settings_path` is an explicit settings file; when `None`, the
/// `REPAIRDESK_CONFIG` variable is consulted. A missing explicit file is an
/// error, a missing default is not.
pub fn load_config(settings_path: Option<&Path>) -> Result<Config> {
    let mut config = Config::default();

    let env_path = std::env::var("REPAIRDESK_CONFIG").ok().map(PathBuf::from);
    if let Some(path) = settings_path.map(Path::to_path_buf).or(env_path) {
        let file = load_config_file(&path)?;
        merge_config(&mut config, file);
    }

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate(&config)?;

    Ok(config)
}

/// Default location of the `SQLite` database: `~/.repairdesk/repairdesk.db`.
pub fn default_database_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".repairdesk").join("repairdesk.db"))
}

fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn merge_config(base: &mut Config, overlay: Config) {
    if overlay.server.database_path.is_some() {
        base.server.database_path = overlay.server.database_path;
    }
    base.server.listen_addr = overlay.server.listen_addr;
    base.server.log_level = overlay.server.log_level;

    base.auth = overlay.auth;
    base.pagination = overlay.pagination;

    if overlay.bootstrap.is_some() {
        base.bootstrap = overlay.bootstrap;
    }
}

/// Apply `REPAIRDESK_*` overrides using `lookup` to read variables.
fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup("REPAIRDESK_LISTEN_ADDR") {
        if let Ok(addr) = val.parse() {
            config.server.listen_addr = addr;
        }
    }
    if let Some(val) = lookup("REPAIRDESK_DB_PATH") {
        config.server.database_path = Some(PathBuf::from(val));
    }
    if let Some(val) = lookup("REPAIRDESK_LOG_LEVEL") {
        config.server.log_level = val;
    }
    if let Some(val) = lookup("REPAIRDESK_JWT_SECRET") {
        config.auth.jwt_secret = val;
    }
    if let Some(val) = lookup("REPAIRDESK_TOKEN_TTL") {
        if let Ok(n) = val.parse() {
            config.auth.access_ttl_secs = n;
        }
    }
    if let Some(val) = lookup("REPAIRDESK_MAX_PAGE_LIMIT") {
        if let Ok(n) = val.parse() {
            config.pagination.max_limit = n;
        }
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.auth.jwt_secret.is_empty() {
        return Err(Error::Config("jwt_secret must not be empty".into()));
    }
    if config.auth.access_ttl_secs <= 0 {
        return Err(Error::Config("access_ttl_secs must be positive".into()));
    }
    if config.pagination.max_limit == 0 {
        return Err(Error::Config("max_limit must be at least 1".into()));
    }
    Ok(())
}
