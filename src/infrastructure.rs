//! Infrastructure layer: portal access, HTML parsing, the spreadsheet store,
//! notifications, configuration and logging.

pub mod config;
pub mod google_sheets;
pub mod http_client;
pub mod logging;
pub mod memory_store;
pub mod parsing;
pub mod retry_executor;
pub mod slack_notifier;

// Re-export commonly used items
pub use config::{AppConfig, ConfigManager};
pub use google_sheets::GoogleSheetsStore;
pub use http_client::{HttpClient, HttpClientConfig};
pub use logging::{get_log_directory, init_logging, init_logging_with_config};
pub use memory_store::MemoryTableStore;
pub use parsing::{
    ContextualParser, OrderDetailParser, OrderTableParser, PaginationParser, ParseContext,
    ParsingError, ParsingResult, SelectorConfig,
};
pub use retry_executor::{RetryExecutor, RetryPolicy};
pub use slack_notifier::SlackNotifier;
