//! Configuration infrastructure
//!
//! Contains configuration loading and management for an order sync run.
//!
//! Configuration is organized by concern:
//! 1. Portal access and selectors (where the orders come from)
//! 2. Enrichment, retry and reconciliation tuning
//! 3. Sheet, notification and logging targets

#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::info;
use url::Url;

use crate::domain::sheet_row::{COL_ARRIVED_AT, COLUMN_COUNT, DEFAULT_COMPARE_COLUMNS};
pub use crate::infrastructure::parsing::config::SelectorConfig;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub portal: PortalConfig,
    pub selectors: SelectorConfig,
    pub enrichment: EnrichmentConfig,
    pub sheets: SheetsConfig,
    pub retry: RetryConfig,
    pub notification: NotificationConfig,
    pub logging: LoggingConfig,
    pub sync: SyncConfig,
}

/// Order portal access
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Site root; login and inquiry paths are joined onto it
    pub base_url: String,
    pub login_path: String,
    pub inquiry_path: String,
    pub username: String,
    pub password: String,
    pub user_agent: String,
    /// Request timeout in seconds; also bounds how long a page may take to appear
    pub request_timeout_seconds: u64,
    /// Hard ceiling on followed list pages
    pub max_pages: u32,
}

/// Detail page enrichment settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Detail pages fetched concurrently per batch
    pub batch_size: usize,
    /// Pause between batches in milliseconds
    pub batch_pause_ms: u64,
    /// Attempts per detail page before it is treated as degraded
    pub detail_max_attempts: u32,
    /// Fixed delay between detail page attempts in milliseconds
    pub detail_retry_delay_ms: u64,
}

/// Remote spreadsheet target
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetsConfig {
    pub api_base_url: String,
    pub spreadsheet_id: String,
    pub worksheet: String,
    /// OAuth bearer token with spreadsheet scope
    pub access_token: String,
}

/// Backoff policy for store calls rejected by quota
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub initial_backoff_seconds: u64,
    pub max_backoff_seconds: u64,
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Incoming webhook; notifications are skipped when unset
    pub slack_webhook_url: Option<String>,
}

/// Reconciliation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Leading columns compared to decide whether a stored row changed
    pub compare_columns: usize,
    /// Column count used for the logical boundary when the sheet is empty
    pub default_column_count: usize,
    /// Reconcile against an in-memory table instead of the spreadsheet
    pub dry_run: bool,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted file logs
    pub json_format: bool,

    pub console_output: bool,

    pub file_output: bool,

    /// Directory for log files; defaults to `logs/` next to the executable
    pub log_dir: Option<PathBuf>,

    /// Module-specific log level filters (e.g., "reqwest": "info")
    pub module_filters: HashMap<String, String>,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::PORTAL_BASE_URL.to_string(),
            login_path: defaults::LOGIN_PATH.to_string(),
            inquiry_path: defaults::INQUIRY_PATH.to_string(),
            username: String::new(),
            password: String::new(),
            user_agent: defaults::USER_AGENT.to_string(),
            request_timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            max_pages: defaults::MAX_PAGES,
        }
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            batch_size: defaults::ENRICHMENT_BATCH_SIZE,
            batch_pause_ms: defaults::ENRICHMENT_BATCH_PAUSE_MS,
            detail_max_attempts: defaults::DETAIL_MAX_ATTEMPTS,
            detail_retry_delay_ms: defaults::DETAIL_RETRY_DELAY_MS,
        }
    }
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            api_base_url: defaults::SHEETS_API_BASE_URL.to_string(),
            spreadsheet_id: String::new(),
            worksheet: defaults::WORKSHEET.to_string(),
            access_token: String::new(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_backoff_seconds: defaults::INITIAL_BACKOFF_SECONDS,
            max_backoff_seconds: defaults::MAX_BACKOFF_SECONDS,
            max_attempts: defaults::STORE_MAX_ATTEMPTS,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            compare_columns: DEFAULT_COMPARE_COLUMNS,
            default_column_count: defaults::DEFAULT_COLUMN_COUNT,
            dry_run: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: defaults::LOG_JSON_FORMAT,
            console_output: defaults::LOG_CONSOLE_OUTPUT,
            file_output: defaults::LOG_FILE_OUTPUT,
            log_dir: None,
            module_filters: {
                let mut filters = HashMap::new();
                filters.insert("reqwest".to_string(), "info".to_string());
                filters.insert("hyper".to_string(), "warn".to_string());
                filters.insert("order_sync_lib".to_string(), "info".to_string());
                filters
            },
        }
    }
}

impl EnrichmentConfig {
    pub const fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.batch_pause_ms)
    }

    pub const fn detail_retry_delay(&self) -> Duration {
        Duration::from_millis(self.detail_retry_delay_ms)
    }
}

impl RetryConfig {
    pub const fn initial_backoff(&self) -> Duration {
        Duration::from_secs(self.initial_backoff_seconds)
    }

    pub const fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_seconds)
    }
}

impl PortalConfig {
    pub fn login_url(&self) -> Result<Url> {
        self.join(&self.login_path)
    }

    pub fn inquiry_url(&self) -> Result<Url> {
        self.join(&self.inquiry_path)
    }

    fn join(&self, path: &str) -> Result<Url> {
        let base = Url::parse(&self.base_url)
            .with_context(|| format!("Invalid portal base_url: {}", self.base_url))?;
        base.join(path)
            .with_context(|| format!("Failed to join '{}' onto {}", path, base))
    }
}

impl AppConfig {
    /// Reject settings that would make a run meaningless or loop forever
    pub fn validate(&self) -> Result<()> {
        self.portal.inquiry_url()?;
        self.portal.login_url()?;

        if self.portal.max_pages == 0 {
            bail!("portal.max_pages must be at least 1");
        }
        if self.enrichment.batch_size == 0 {
            bail!("enrichment.batch_size must be at least 1");
        }
        if self.enrichment.detail_max_attempts == 0 {
            bail!("enrichment.detail_max_attempts must be at least 1");
        }
        if self.retry.max_attempts == 0 {
            bail!("retry.max_attempts must be at least 1");
        }
        if self.retry.initial_backoff_seconds > self.retry.max_backoff_seconds {
            bail!(
                "retry.initial_backoff_seconds ({}) exceeds retry.max_backoff_seconds ({})",
                self.retry.initial_backoff_seconds,
                self.retry.max_backoff_seconds
            );
        }
        if self.sync.compare_columns <= COL_ARRIVED_AT || self.sync.compare_columns > COLUMN_COUNT {
            bail!(
                "sync.compare_columns must cover the arrival date column and stay within {} columns, got {}",
                COLUMN_COUNT,
                self.sync.compare_columns
            );
        }
        if !self.sync.dry_run && (self.sheets.spreadsheet_id.is_empty() || self.sheets.access_token.is_empty()) {
            bail!("sheets.spreadsheet_id and sheets.access_token are required unless sync.dry_run is set");
        }
        Ok(())
    }
}

/// Configuration manager for loading and saving settings
pub struct ConfigManager {
    pub config_path: PathBuf,
}

impl ConfigManager {
    /// Get the application configuration directory
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get user config directory")?
            .join("order-sync");

        Ok(config_dir)
    }

    /// Manager for the default per-user config file
    pub fn new() -> Result<Self> {
        let config_path = Self::get_config_dir()?.join("config.json");
        Ok(Self { config_path })
    }

    pub fn with_path(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    /// Load configuration from file, creating default if it doesn't exist
    pub async fn load_config(&self) -> Result<AppConfig> {
        if !fs::try_exists(&self.config_path).await.unwrap_or(false) {
            info!("Configuration file not found, creating default: {:?}", self.config_path);
            let default_config = AppConfig::default();
            self.save_config(&default_config).await?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(&self.config_path)
            .await
            .context("Failed to read configuration file")?;

        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse configuration file {:?}", self.config_path))?;

        info!("Loaded configuration from: {:?}", self.config_path);
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_config(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }

        let content =
            serde_json::to_string_pretty(config).context("Failed to serialize configuration")?;

        fs::write(&self.config_path, content)
            .await
            .context("Failed to write configuration file")?;

        info!("Saved configuration to: {:?}", self.config_path);
        Ok(())
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

/// Default configuration values
pub mod defaults {
    pub const PORTAL_BASE_URL: &str = "https://yiwupassport.jp";
    pub const LOGIN_PATH: &str = "/login";
    pub const INQUIRY_PATH: &str = "/inquiry";
    pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

    /// Default request timeout in seconds
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 60;

    /// Default ceiling on followed list pages
    pub const MAX_PAGES: u32 = 500;

    pub const ENRICHMENT_BATCH_SIZE: usize = 10;
    pub const ENRICHMENT_BATCH_PAUSE_MS: u64 = 1000;
    pub const DETAIL_MAX_ATTEMPTS: u32 = 3;
    pub const DETAIL_RETRY_DELAY_MS: u64 = 2000;

    pub const SHEETS_API_BASE_URL: &str = "https://sheets.googleapis.com/v4";
    pub const WORKSHEET: &str = "yiwu";

    pub const INITIAL_BACKOFF_SECONDS: u64 = 2;
    pub const MAX_BACKOFF_SECONDS: u64 = 120;
    pub const STORE_MAX_ATTEMPTS: u32 = 5;

    /// Column count (A-Z) assumed when the sheet has no header row yet
    pub const DEFAULT_COLUMN_COUNT: usize = 26;

    // Log configuration defaults
    pub const LOG_LEVEL: &str = "info";
    pub const LOG_JSON_FORMAT: bool = false;
    pub const LOG_CONSOLE_OUTPUT: bool = true;
    pub const LOG_FILE_OUTPUT: bool = false;
}
