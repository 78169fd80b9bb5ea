use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::pipeline::extraction::ExtractionStrategy;

/// Application-level constants
pub const APP_NAME: &str = "GreenPulse";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Model used for structured report extraction
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
/// Model used when bill text has to be OCR'd by the generative endpoint
pub const DEFAULT_GEMINI_OCR_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_TIMEOUT_SECS: u64 = 120;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Maximum number of bill characters embedded in a structuring prompt
pub const MAX_PROMPT_CHARS: usize = 50_000;

/// Log filter used when RUST_LOG is unset
pub fn default_log_filter() -> &'static str {
    "greenpulse_lib=info,greenpulse=info,tower_http=info"
}

/// Get the default application data directory
/// ~/GreenPulse/ on all platforms
pub fn app_data_dir() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join(APP_NAME))
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot determine home directory; set GREENPULSE_DATA_DIR")]
    NoHomeDir,

    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Runtime settings for the bill service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub data_dir: PathBuf,
    pub bind_addr: SocketAddr,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_ocr_model: String,
    pub gemini_base_url: String,
    pub gemini_timeout: Duration,
    pub extraction: ExtractionStrategy,
    pub max_upload_bytes: usize,
}

impl ServiceConfig {
    /// Read settings from the process environment (after `.env` is loaded).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let data_dir = match get("GREENPULSE_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => app_data_dir()?,
        };

        let bind_raw = get("GREENPULSE_BIND").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw.parse().map_err(|_| ConfigError::Invalid {
            key: "GREENPULSE_BIND",
            value: bind_raw.clone(),
        })?;

        let gemini_timeout = match get("GEMINI_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                    key: "GEMINI_TIMEOUT_SECS",
                    value: raw.clone(),
                })?;
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_GEMINI_TIMEOUT_SECS),
        };

        let extraction = match get("GREENPULSE_EXTRACTION") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "GREENPULSE_EXTRACTION",
                value: raw.clone(),
            })?,
            None => ExtractionStrategy::default(),
        };

        let max_upload_bytes = match get("GREENPULSE_MAX_UPLOAD_BYTES") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "GREENPULSE_MAX_UPLOAD_BYTES",
                value: raw.clone(),
            })?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Ok(Self {
            data_dir,
            bind_addr,
            gemini_api_key: get("GEMINI_API_KEY"),
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            gemini_ocr_model: get("GEMINI_OCR_MODEL")
                .unwrap_or_else(|| DEFAULT_GEMINI_OCR_MODEL.to_string()),
            gemini_base_url: get("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            gemini_timeout,
            extraction,
            max_upload_bytes,
        })
    }

    /// Defaults rooted at an explicit data directory (tests, embedding).
    pub fn with_data_dir(data_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_ocr_model: DEFAULT_GEMINI_OCR_MODEL.to_string(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            gemini_timeout: Duration::from_secs(DEFAULT_GEMINI_TIMEOUT_SECS),
            extraction: ExtractionStrategy::default(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    /// The API key, required before the server can talk to the model.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.gemini_api_key
            .as_deref()
            .ok_or(ConfigError::Missing("GEMINI_API_KEY"))
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("database").join("greenpulse.db")
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.data_dir.join("reports")
    }
}
