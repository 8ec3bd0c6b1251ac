//! Application configuration structures.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP and scraping behavior settings
    #[serde(default)]
    pub watch: WatchConfig,

    /// Email delivery settings
    #[serde(default)]
    pub email: EmailConfig,

    /// State file locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.watch.departments.is_empty() {
            return Err(AppError::validation("No departments defined"));
        }
        for dep in &self.watch.departments {
            if dep.len() != 2 || !dep.chars().all(|c| c.is_ascii_digit()) {
                return Err(AppError::validation(format!(
                    "Invalid department code '{dep}' (expected two digits)"
                )));
            }
        }
        if self.watch.user_agent.trim().is_empty() {
            return Err(AppError::validation("watch.user_agent is empty"));
        }
        if self.watch.timeout_secs == 0 {
            return Err(AppError::validation("watch.timeout_secs must be > 0"));
        }
        if self.email.recipients.is_empty() {
            return Err(AppError::validation("No recipients defined"));
        }
        if self.email.sender.trim().is_empty() {
            return Err(AppError::validation("email.sender is empty"));
        }
        if self.email.smtp_port == 0 {
            return Err(AppError::validation("email.smtp_port must be > 0"));
        }
        Ok(())
    }
}

/// HTTP client and scraping behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Base URL of the Fac-Habitat site
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Two-digit department codes to watch
    #[serde(default = "defaults::departments")]
    pub departments: Vec<String>,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between detail-page requests in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            departments: defaults::departments(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
        }
    }
}

/// Email delivery settings.
///
/// Credentials are never stored here; see `config::SmtpCredentials`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// SMTP server hostname (implicit TLS)
    #[serde(default = "defaults::smtp_host")]
    pub smtp_host: String,

    /// SMTP server port
    #[serde(default = "defaults::smtp_port")]
    pub smtp_port: u16,

    /// Sender address
    #[serde(default)]
    pub sender: String,

    /// Sender display name
    #[serde(default = "defaults::sender_name")]
    pub sender_name: String,

    /// Recipient addresses
    #[serde(default)]
    pub recipients: Vec<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: defaults::smtp_host(),
            smtp_port: defaults::smtp_port(),
            sender: String::new(),
            sender_name: defaults::sender_name(),
            recipients: Vec::new(),
        }
    }
}

impl EmailConfig {
    /// Recipient list with case-insensitive duplicates removed,
    /// preserving first-seen order.
    pub fn unique_recipients(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.recipients
            .iter()
            .filter(|r| seen.insert(r.trim().to_lowercase()))
            .map(|r| r.as_str())
            .collect()
    }
}

/// State file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Key-set state file (CSV, one `key` column)
    #[serde(default = "defaults::state_file")]
    pub state_file: String,

    /// Daily summary marker file (single ISO date)
    #[serde(default = "defaults::daily_marker_file")]
    pub daily_marker_file: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            state_file: defaults::state_file(),
            daily_marker_file: defaults::daily_marker_file(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter: debug, info, warn, error
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    // Watch defaults
    pub fn base_url() -> String {
        "https://www.fac-habitat.com".into()
    }
    pub fn departments() -> Vec<String> {
        // Paris and inner/outer ring, as watched by the original deployment
        ["75", "92", "93", "94", "95", "78", "77"]
            .into_iter()
            .map(String::from)
            .collect()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; fach-watch/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn request_delay() -> u64 {
        100
    }

    // Email defaults
    pub fn smtp_host() -> String {
        "smtp.gmail.com".into()
    }
    pub fn smtp_port() -> u16 {
        465
    }
    pub fn sender_name() -> String {
        "Fac-Habitat Bot".into()
    }

    // Path defaults
    pub fn state_file() -> String {
        "data/last_results.csv".into()
    }
    pub fn daily_marker_file() -> String {
        "data/last_daily_sent.txt".into()
    }

    // Logging defaults
    pub fn log_level() -> String {
        "info".into()
    }
}
