use std::{
    fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Mutex,
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::utils;

pub const DEFAULT_API_BASE: &str = "http://localhost:3001";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Which event store backs the app.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// The remote JSON API.
    #[default]
    Http,
    /// Embedded SQLite database, for working without the API.
    Local,
}

impl FromStr for StoreKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "http" | "remote" => Ok(StoreKind::Http),
            "local" | "sqlite" => Ok(StoreKind::Local),
            _ => Err(ConfigError::Invalid {
                key: "store",
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::Http => f.write_str("http"),
            StoreKind::Local => f.write_str("local"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: String,
    pub store: StoreKind,
    pub database_path: Option<PathBuf>,
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE.to_string(),
            store: StoreKind::default(),
            database_path: None,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl AppConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(utils::database_path)
    }

    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies `HORIZON_*` overrides looked up through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base) = lookup("HORIZON_API_BASE").filter(|v| !v.trim().is_empty()) {
            self.api_base_url = base.trim().to_string();
        }
        if let Some(kind) = lookup("HORIZON_STORE") {
            self.store = kind.parse()?;
        }
        if let Some(path) = lookup("HORIZON_DB_PATH").filter(|v| !v.trim().is_empty()) {
            self.database_path = Some(PathBuf::from(path.trim()));
        }
        if let Some(secs) = lookup("HORIZON_TIMEOUT_SECS") {
            self.request_timeout_secs =
                secs.trim()
                    .parse()
                    .map_err(|_| ConfigError::Invalid {
                        key: "request_timeout_secs",
                        value: secs.clone(),
                    })?;
        }
        Ok(())
    }
}

pub struct ConfigStore {
    path: PathBuf,
    data: Mutex<AppConfig>,
}

impl ConfigStore {
    pub fn load() -> Self {
        Self::load_from(utils::config_path())
    }

    /// Reads the config at `path`, falling back to defaults when it is
    /// missing or unreadable.
    pub fn load_from(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = read_config(&path).unwrap_or_else(|err| {
            tracing::warn!(path = ?path, error = %err, "ignoring unreadable config");
            AppConfig::default()
        });
        Self {
            path,
            data: Mutex::new(data),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> Result<AppConfig, ConfigError> {
        self.data
            .lock()
            .map(|guard| guard.clone())
            .map_err(|_| ConfigError::Poisoned)
    }

    pub fn update<F>(&self, transform: F) -> Result<AppConfig, ConfigError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut guard = self.data.lock().map_err(|_| ConfigError::Poisoned)?;
        transform(&mut guard);
        write_config(&self.path, &guard)?;
        Ok(guard.clone())
    }
}

fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

fn write_config(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let contents = serde_json::to_string_pretty(config)?;
    fs::write(path, contents)?;
    Ok(())
}
