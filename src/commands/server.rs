//! Handler for the `server` command.

use colored::*;

use mesonfmt_lib::exit_codes::exit;

use crate::cli_utils::create_runtime;

/// Handle the server command: start the LSP server.
pub fn handle_server(port: Option<u16>, stdio: bool, config: Option<String>) {
    // Validate config file exists if provided
    if let Some(config_path) = &config
        && !std::path::Path::new(config_path).exists()
    {
        eprintln!(
            "{}: Configuration file not found: {}",
            "Error".red().bold(),
            config_path
        );
        exit::tool_error();
    }

    let runtime = create_runtime();
    runtime.block_on(async {
        if let Some(port) = port {
            // TCP mode for debugging
            if let Err(e) = mesonfmt_lib::lsp::start_tcp_server(port, config.as_deref()).await {
                eprintln!("Failed to start LSP server on port {port}: {e}");
                exit::tool_error();
            }
        } else {
            // stdio is the default; the flag only documents intent
            let _ = stdio;
            if let Err(e) = mesonfmt_lib::lsp::start_server(config.as_deref()).await {
                eprintln!("Failed to start LSP server: {e}");
                exit::tool_error();
            }
        }
    });
}
