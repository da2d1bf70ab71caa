//! Logging system configuration and initialization
//!
//! - Console and file output, each optional
//! - Plain or JSON file logs
//! - Configuration based level control, overridable through `RUST_LOG`
//! - JST (Japan Standard Time) timestamps, matching the portal's dates
//! - The previous run's log file is renamed with its timestamp on startup

#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, anyhow};
use chrono::{DateTime, FixedOffset, Offset, Utc};
use lazy_static::lazy_static;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

pub use crate::infrastructure::config::LoggingConfig;

pub const LOG_FILE_NAME: &str = "order-sync.log";

const JST_OFFSET_SECONDS: i32 = 9 * 3600;

// Keeps the non-blocking file writer alive for the whole process
lazy_static! {
    static ref LOG_GUARDS: Mutex<Vec<tracing_appender::non_blocking::WorkerGuard>> =
        Mutex::new(Vec::new());
}

fn jst() -> FixedOffset {
    FixedOffset::east_opt(JST_OFFSET_SECONDS).unwrap_or_else(|| Utc.fix())
}

/// Timestamps in JST (UTC+9)
struct JstTimeFormatter;

impl FormatTime for JstTimeFormatter {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        let now = Utc::now().with_timezone(&jst());
        write!(w, "{}", now.format("%Y-%m-%d %H:%M:%S%.3f %:z"))
    }
}

/// Log directory: the configured one, else `logs/` next to the executable
pub fn get_log_directory(config: &LoggingConfig) -> PathBuf {
    if let Some(dir) = &config.log_dir {
        return dir.clone();
    }
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());

    exe_dir.join("logs")
}

/// Initialize the logging system with default configuration
pub fn init_logging() -> Result<()> {
    init_logging_with_config(LoggingConfig::default())
}

/// Rename an existing log file with its modification time so each run starts fresh
fn rotate_existing_log_file(log_dir: &Path, log_file_name: &str) -> Result<Option<PathBuf>> {
    let log_file_path = log_dir.join(log_file_name);
    if !log_file_path.exists() {
        return Ok(None);
    }

    let metadata = std::fs::metadata(&log_file_path)
        .map_err(|e| anyhow!("Failed to get log file metadata: {}", e))?;
    let file_time = metadata
        .modified()
        .unwrap_or_else(|_| std::time::SystemTime::now());
    let stamped: DateTime<Utc> = file_time.into();

    let file_stem = log_file_name.trim_end_matches(".log");
    let timestamped_name = format!(
        "{}.{}.log",
        file_stem,
        stamped.with_timezone(&jst()).format("%Y%m%dT%H%M%S")
    );
    let timestamped_path = log_dir.join(&timestamped_name);

    std::fs::rename(&log_file_path, &timestamped_path).map_err(|e| {
        anyhow!(
            "Failed to rotate log file {} to {}: {}",
            log_file_path.display(),
            timestamped_path.display(),
            e
        )
    })?;

    Ok(Some(timestamped_path))
}

/// Filter from `RUST_LOG` when set, else the configured level plus module filters
///
/// ```bash
/// # Show HTTP internals for one run
/// RUST_LOG="debug,reqwest=debug,hyper=debug" order-sync
/// ```
fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let mut filter = EnvFilter::try_new(&config.level)
        .map_err(|e| anyhow!("Invalid log level '{}': {}", config.level, e))?;

    // Dependency noise stays down unless TRACE is requested
    if !config.level.eq_ignore_ascii_case("trace") {
        let mut modules: Vec<_> = config.module_filters.iter().collect();
        modules.sort();
        for (module, level) in modules {
            let directive = format!("{}={}", module, level)
                .parse()
                .map_err(|e| anyhow!("Invalid module filter {}={}: {}", module, level, e))?;
            filter = filter.add_directive(directive);
        }
    }

    Ok(filter)
}

/// Initialize logging with custom configuration
pub fn init_logging_with_config(config: LoggingConfig) -> Result<()> {
    if !config.file_output && !config.console_output {
        return Err(anyhow!("No logging output configured"));
    }

    let env_filter = build_env_filter(&config)?;
    let log_dir = get_log_directory(&config);

    let file_writer = if config.file_output {
        std::fs::create_dir_all(&log_dir)
            .map_err(|e| anyhow!("Failed to create log directory {:?}: {}", log_dir, e))?;
        rotate_existing_log_file(&log_dir, LOG_FILE_NAME)?;

        let (writer, guard) = non_blocking(rolling::never(&log_dir, LOG_FILE_NAME));
        if let Ok(mut guards) = LOG_GUARDS.lock() {
            guards.push(guard);
        }
        Some(writer)
    } else {
        None
    };

    let json_file_layer = file_writer
        .clone()
        .filter(|_| config.json_format)
        .map(|writer| {
            fmt::Layer::new()
                .json()
                .with_writer(writer)
                .with_timer(JstTimeFormatter)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false)
        });

    // Plain file logs keep time, level and message only
    let plain_file_layer = file_writer
        .filter(|_| !config.json_format)
        .map(|writer| {
            fmt::Layer::new()
                .with_writer(writer)
                .with_timer(JstTimeFormatter)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_ansi(false)
        });

    let console_layer = config.console_output.then(|| {
        fmt::Layer::new()
            .with_writer(std::io::stdout)
            .with_timer(JstTimeFormatter)
            .with_target(false)
    });

    Registry::default()
        .with(env_filter)
        .with(console_layer)
        .with(json_file_layer)
        .with(plain_file_layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))?;

    info!("Logging system initialized");
    info!("Log level: {}", config.level);
    info!("Console output: {}", config.console_output);
    info!("File output: {}", config.file_output);
    if config.file_output {
        info!("Log file: {:?}", log_dir.join(LOG_FILE_NAME));
        info!("JSON format: {}", config.json_format);
    }

    Ok(())
}

/// Log system information for diagnostics
pub fn log_system_info() {
    info!("=== order-sync {} ===", env!("CARGO_PKG_VERSION"));
    info!("Operating system: {}", std::env::consts::OS);
    info!("Architecture: {}", std::env::consts::ARCH);
    if let Ok(current_dir) = std::env::current_dir() {
        info!("Working directory: {:?}", current_dir);
    }
}
