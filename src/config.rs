use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub projects: ProjectsConfig,

    #[serde(default)]
    pub derivatives: DerivativeConfig,

    #[serde(default)]
    pub mail: MailConfig,

    #[serde(default)]
    pub daemon: DaemonConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub sqlite_path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            sqlite_path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectsConfig {
    /// Directory holding one sub-directory per project.
    #[serde(default = "default_projects_root")]
    pub root_dir: PathBuf,

    /// Public URL that `root_dir` is served under.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Seconds after which an ingestion lease left by a dead process is taken over.
    #[serde(default = "default_lease_timeout")]
    pub lease_timeout: u64,
}

impl Default for ProjectsConfig {
    fn default() -> Self {
        Self {
            root_dir: default_projects_root(),
            base_url: default_base_url(),
            lease_timeout: default_lease_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivativeConfig {
    #[serde(default = "default_small_size")]
    pub small_size: u32,

    #[serde(default = "default_small_quality")]
    pub small_quality: u8,

    #[serde(default = "default_large_size")]
    pub large_size: u32,

    #[serde(default = "default_large_quality")]
    pub large_quality: u8,
}

fn default_small_size() -> u32 {
    300
}

fn default_small_quality() -> u8 {
    80
}

fn default_large_size() -> u32 {
    1280
}

fn default_large_quality() -> u8 {
    90
}

impl Default for DerivativeConfig {
    fn default() -> Self {
        Self {
            small_size: default_small_size(),
            small_quality: default_small_quality(),
            large_size: default_large_size(),
            large_quality: default_large_quality(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MailTransport {
    /// Drop `.eml` files into a pickup directory.
    #[default]
    Outbox,
    /// POST to an HTTP mail relay.
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// Where "gallery created" notifications go.
    #[serde(default = "default_recipient")]
    pub recipient: String,

    #[serde(default = "default_sender")]
    pub sender: String,

    #[serde(default)]
    pub transport: MailTransport,

    #[serde(default = "default_outbox_dir")]
    pub outbox_dir: PathBuf,

    #[serde(default = "default_mail_endpoint")]
    pub endpoint: String,

    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_recipient() -> String {
    "photographer@localhost".to_string()
}

fn default_sender() -> String {
    "proofer@localhost".to_string()
}

fn default_outbox_dir() -> PathBuf {
    data_dir().join("outbox")
}

fn default_mail_endpoint() -> String {
    "http://127.0.0.1:8025/api/send".to_string()
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            recipient: default_recipient(),
            sender: default_sender(),
            transport: MailTransport::default(),
            outbox_dir: default_outbox_dir(),
            endpoint: default_mail_endpoint(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Seconds between two scans of the projects directory.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
}

fn default_poll_interval() -> u64 {
    60
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
        }
    }
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("proofer")
}

fn default_db_path() -> PathBuf {
    data_dir().join("proofer.db")
}

fn default_projects_root() -> PathBuf {
    data_dir().join("projects")
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_lease_timeout() -> u64 {
    3600
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            projects: ProjectsConfig::default(),
            derivatives: DerivativeConfig::default(),
            mail: MailConfig::default(),
            daemon: DaemonConfig::default(),
        }
    }
}

impl Config {
    /// Load from the default location, writing a default file on first run.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Config::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
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

    pub fn db_path(&self) -> &PathBuf {
        &self.database.sqlite_path
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("proofer")
    }

    /// `$PROOFER_CONFIG` wins over the per-user config directory.
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("PROOFER_CONFIG") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }
}
