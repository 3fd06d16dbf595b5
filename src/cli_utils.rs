//! Shared helpers for CLI command handlers.

use colored::*;

use mesonfmt_lib::config::FormattingConfig;
use mesonfmt_lib::exit_codes::exit;

/// Load the formatting config, exiting with a tool error on failure.
pub fn load_config_with_cli_error_handling(config_path: Option<&str>) -> FormattingConfig {
    let dir = std::env::current_dir().unwrap_or_else(|e| {
        eprintln!("{}: Cannot determine current directory: {}", "Error".red().bold(), e);
        exit::tool_error();
    });

    FormattingConfig::load(config_path.map(std::path::Path::new), &dir).unwrap_or_else(|e| {
        eprintln!("{}: {}", "Config error".red().bold(), e);
        exit::tool_error();
    })
}

/// Create the Tokio runtime, exiting with a tool error on failure.
pub fn create_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("{}: Failed to create Tokio runtime: {}", "Error".red().bold(), e);
        exit::tool_error();
    })
}
