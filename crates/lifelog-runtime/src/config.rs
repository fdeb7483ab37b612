use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Resolve the data directory path based on priority:
/// 1. Explicit path (with tilde expansion)
/// 2. LIFELOG_PATH environment variable (with tilde expansion)
/// 3. XDG data directory (recommended default)
/// 4. ~/.lifelog (fallback for systems without XDG)
pub fn resolve_data_path(explicit_path: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = explicit_path {
        return Ok(expand_tilde(path));
    }

    if let Ok(env_path) = std::env::var("LIFELOG_PATH") {
        return Ok(expand_tilde(&env_path));
    }

    if let Some(data_dir) = dirs::data_dir() {
        return Ok(data_dir.join("lifelog"));
    }

    if let Some(home) = std::env::var_os("HOME") {
        return Ok(PathBuf::from(home).join(".lifelog"));
    }

    Err(Error::Config(
        "Could not determine data path: no HOME directory or XDG data directory found".to_string(),
    ))
}

/// Expand tilde (~) in paths to the user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME")
    {
        return PathBuf::from(home).join(stripped);
    }
    PathBuf::from(path)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    /// Auth is bypassed only in development
    pub fn allows_auth_bypass(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "default_origins")]
    pub origins: Vec<String>,
    #[serde(default)]
    pub allow_credentials: bool,
    #[serde(default = "default_methods")]
    pub methods: Vec<String>,
    #[serde(default = "default_headers")]
    pub headers: Vec<String>,
}

fn default_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_methods() -> Vec<String> {
    ["GET", "POST", "PUT", "DELETE"].iter().map(|s| s.to_string()).collect()
}

fn default_headers() -> Vec<String> {
    vec!["*".to_string()]
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origins: default_origins(),
            allow_credentials: false,
            methods: default_methods(),
            headers: default_headers(),
        }
    }
}

/// External collaborator settings. API keys come from the environment
/// when absent from the file; nothing here is written back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default)]
    pub llm_api_key: Option<String>,
    #[serde(default = "default_llm_model")]
    pub llm_model: String,
    #[serde(default = "default_embed_model")]
    pub embed_model: String,
    #[serde(default)]
    pub notes_api_key: Option<String>,
    /// Path to the access token file the calendar auth collaborator keeps
    #[serde(default)]
    pub calendar_token_path: Option<PathBuf>,
}

fn default_llm_model() -> String {
    lifelog_providers::DEFAULT_CHAT_MODEL.to_string()
}

fn default_embed_model() -> String {
    lifelog_providers::DEFAULT_EMBED_MODEL.to_string()
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            llm_api_key: None,
            llm_model: default_llm_model(),
            embed_model: default_embed_model(),
            notes_api_key: None,
            calendar_token_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the embedded database file; defaults to <data_dir>/lifelog.db
    #[serde(default)]
    pub db_path: Option<PathBuf>,

    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    #[serde(default)]
    pub environment: Environment,

    #[serde(default = "default_api_prefix")]
    pub api_v1_prefix: String,

    #[serde(default)]
    pub cors: CorsConfig,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: Option<String>,

    #[serde(default)]
    pub providers: ProviderSettings,

    /// Optional JSONL path for structured per-activity tagging logs
    #[serde(default)]
    pub tagging_log_file: Option<PathBuf>,

    /// Accepted bearer tokens; empty plus development environment means
    /// auth is bypassed
    #[serde(default)]
    pub api_keys: Vec<String>,
}

fn default_pool_size() -> usize {
    lifelog_store::DEFAULT_POOL_SIZE
}

fn default_api_prefix() -> String {
    "/api/v1".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: None,
            pool_size: default_pool_size(),
            environment: Environment::default(),
            api_v1_prefix: default_api_prefix(),
            cors: CorsConfig::default(),
            log_level: default_log_level(),
            log_format: None,
            providers: ProviderSettings::default(),
            tagging_log_file: None,
            api_keys: Vec::new(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::default_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str::<Config>(&content)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn default_path() -> Result<PathBuf> {
        Ok(resolve_data_path(None)?.join("config.toml"))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("LIFELOG_DB_PATH") {
            self.db_path = Some(expand_tilde(&path));
        }
        if self.providers.llm_api_key.is_none()
            && let Ok(key) = std::env::var("LIFELOG_LLM_API_KEY")
        {
            self.providers.llm_api_key = Some(key);
        }
        if self.providers.notes_api_key.is_none()
            && let Ok(key) = std::env::var("LIFELOG_NOTES_API_KEY")
        {
            self.providers.notes_api_key = Some(key);
        }
    }

    fn validate(&self) -> Result<()> {
        if self.pool_size < 1 || self.pool_size > lifelog_store::MAX_POOL_SIZE {
            return Err(Error::Config(format!(
                "pool_size must be between 1 and {}",
                lifelog_store::MAX_POOL_SIZE
            )));
        }
        Ok(())
    }

    /// Resolved database file path
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.db_path {
            Some(path) => Ok(path.clone()),
            None => Ok(resolve_data_path(None)?.join("lifelog.db")),
        }
    }

    /// Resource namespace for generated taxonomy artifacts
    pub fn resources_dir(&self) -> Result<PathBuf> {
        Ok(resolve_data_path(None)?.join("resources"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.pool_size, 10);
        assert_eq!(config.api_v1_prefix, "/api/v1");
        assert_eq!(config.environment, Environment::Development);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.pool_size = 4;
        config.environment = Environment::Production;
        config.api_keys = vec!["secret".to_string()];
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.pool_size, 4);
        assert_eq!(loaded.environment, Environment::Production);
        assert_eq!(loaded.api_keys, vec!["secret"]);
    }

    #[test]
    fn out_of_range_pool_size_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "pool_size = 500\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn dev_environment_allows_bypass() {
        assert!(Environment::Development.allows_auth_bypass());
        assert!(!Environment::Production.allows_auth_bypass());
    }
}
