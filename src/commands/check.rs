//! Handler for the `check` command.

use colored::*;

use mesonfmt_lib::coordinator::{FormattingCoordinator, ReloadOutcome};
use mesonfmt_lib::exit_codes::exit;
use mesonfmt_lib::output::StderrSink;
use std::sync::Arc;

use crate::cli_utils::{create_runtime, load_config_with_cli_error_handling};

/// Handle the check command: report whether formatting is available and how
/// the tool would be invoked.
pub fn handle_check(config_path: Option<&str>) {
    let config = load_config_with_cli_error_handling(config_path);
    let coordinator = FormattingCoordinator::new(Arc::new(StderrSink::default()));

    let outcome = create_runtime().block_on(coordinator.reload(&config));
    match outcome {
        ReloadOutcome::Registered(tool) => {
            println!("{}: {}", "Tool".bold(), tool.path.display());
            println!("{}: {}", "Version".bold(), tool.version);
            println!("{}: {}", "Input".bold(), tool.stdin);
            if let Some(cfg) = &config.meson_config {
                println!("{}: {}", "Format config".bold(), cfg.display());
            }
            println!("{}", "Formatting available".green());
        }
        ReloadOutcome::Disabled => {
            println!("{}", "Formatting is disabled by configuration".yellow());
        }
        ReloadOutcome::Unavailable(e) => {
            // The reason was already printed through the sink
            log::debug!("capability check failed: {e:?}");
            exit::tool_error();
        }
    }
}
