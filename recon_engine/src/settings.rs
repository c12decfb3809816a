use std::{
    collections::HashSet,
    env,
    fs,
    path::{Path, PathBuf},
};

use log::*;
use recon_common::Secret;
use serde::Deserialize;

use crate::errors::ConfigError;

pub const DEFAULT_CONFIG_FILE: &str = "clients.json";
pub const CONFIG_FILE_ENV: &str = "RECON_CONFIG_FILE";

const DEFAULT_DAYS: u32 = 2;
const DEFAULT_MAX_WORKERS: usize = 4;
const DEFAULT_PAGE_SIZE: u32 = 5000;
const DEFAULT_REQUEST_TIMEOUT: u64 = 30;
const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
const DEFAULT_SMTP_PORT: u16 = 587;

/// Identity and connection info for one client organization. Loaded fresh at the start of
/// every run and immutable for its duration.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub name: String,
    pub base_url: String,
    pub api_key: Secret<String>,
    #[serde(default = "default_table_prefix")]
    pub table_prefix: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_table_prefix() -> String {
    "pw_".to_string()
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmailSettings {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub sender_email: String,
    pub sender_password: Secret<String>,
    pub admin_emails: Vec<String>,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            smtp_host: DEFAULT_SMTP_HOST.to_string(),
            smtp_port: DEFAULT_SMTP_PORT,
            sender_email: String::new(),
            sender_password: Secret::default(),
            admin_emails: vec![],
        }
    }
}

/// Settings scoped to one run: lookback window, concurrency bounds, page size, request
/// timeout and email delivery.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    pub days: u32,
    pub max_workers: usize,
    pub fetch_page_size: u32,
    /// Bound on a single HTTP request, in seconds. Nothing bounds the run as a whole.
    pub request_timeout: u64,
    pub email: EmailSettings,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            days: DEFAULT_DAYS,
            max_workers: DEFAULT_MAX_WORKERS,
            fetch_page_size: DEFAULT_PAGE_SIZE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            email: EmailSettings::default(),
        }
    }
}

/// One loaded configuration document: the enabled clients plus the run settings.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub clients: Vec<ClientConfig>,
    pub settings: RunSettings,
}

#[derive(Deserialize)]
struct RawConfig {
    #[serde(default)]
    clients: Vec<ClientConfig>,
    #[serde(default)]
    settings: RunSettings,
}

/// Handle on the JSON configuration document. The document is re-read at the start of every
/// run, so edits apply to the next run rather than a running one.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn from_env_or_default() -> Self {
        let path = env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| {
            warn!("🗂️ {CONFIG_FILE_ENV} not set, using {DEFAULT_CONFIG_FILE}");
            DEFAULT_CONFIG_FILE.to_string()
        });
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads and validates the document, dropping disabled clients. Client names must be
    /// unique case-insensitively across the whole document, disabled entries included.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let raw = fs::read_to_string(&self.path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {e}", self.path.display())))?;
        let raw: RawConfig = serde_json::from_str(&raw).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        let mut seen = HashSet::with_capacity(raw.clients.len());
        for client in &raw.clients {
            if !seen.insert(client.name.to_lowercase()) {
                return Err(ConfigError::DuplicateClient(client.name.clone()));
            }
        }
        let clients: Vec<ClientConfig> = raw.clients.into_iter().filter(|c| c.enabled).collect();
        debug!("🗂️ Loaded config: {} enabled clients", clients.len());
        Ok(AppConfig { clients, settings: raw.settings })
    }
}
