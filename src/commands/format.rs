//! Handler for the `format` command.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use colored::*;

use mesonfmt_lib::coordinator::{FormattingCoordinator, ReloadOutcome};
use mesonfmt_lib::edits::apply_edits;
use mesonfmt_lib::exit_codes::exit;
use mesonfmt_lib::output::StderrSink;

use crate::cli_utils::{create_runtime, load_config_with_cli_error_handling};

/// How formatted output is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatMode {
    /// Rewrite files in place
    Write,
    /// Print formatted content to stdout
    Stdout,
    /// Only report files that would change
    Check,
}

enum Input {
    Stdin,
    File(PathBuf),
}

impl Input {
    fn display_name(&self) -> String {
        match self {
            Self::Stdin => "<stdin>".to_string(),
            Self::File(path) => path.display().to_string(),
        }
    }
}

/// Handle the format command. Exits the process.
pub fn handle_format(paths: Vec<String>, mode: FormatMode, config_path: Option<&str>, quiet: bool) {
    let config = load_config_with_cli_error_handling(config_path);
    let coordinator = FormattingCoordinator::new(Arc::new(StderrSink::default()));

    let inputs: Vec<Input> = if paths.is_empty() || paths.iter().all(|p| p == "-") {
        vec![Input::Stdin]
    } else {
        paths
            .into_iter()
            .filter(|p| p != "-")
            .map(|p| Input::File(PathBuf::from(p)))
            .collect()
    };

    let issues = create_runtime().block_on(async {
        match coordinator.reload(&config).await {
            ReloadOutcome::Registered(tool) => {
                log::debug!("Formatting with {} {}", tool.path.display(), tool.version);
            }
            ReloadOutcome::Disabled => {
                eprintln!("{}: Formatting is disabled by configuration", "Error".red().bold());
                exit::tool_error();
            }
            ReloadOutcome::Unavailable(_) => exit::tool_error(),
        }

        let mut issues = false;
        for input in &inputs {
            match format_input(&coordinator, input, mode, quiet).await {
                Ok(true) => {}
                Ok(false) => issues = true,
                Err(e) => {
                    eprintln!("{}: {}: {}", "Error".red().bold(), input.display_name(), e);
                    exit::tool_error();
                }
            }
        }

        issues
    });

    if issues {
        exit::formatting_issues();
    }
    exit::success();
}

/// Format one input. `Ok(false)` means the tool failed or, in check mode,
/// that the input would change.
async fn format_input(
    coordinator: &FormattingCoordinator,
    input: &Input,
    mode: FormatMode,
    quiet: bool,
) -> io::Result<bool> {
    let (original, working_dir) = match input {
        Input::Stdin => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text)?;
            (text, std::env::current_dir()?)
        }
        Input::File(path) => (std::fs::read_to_string(path)?, parent_dir(path)?),
    };

    let edits = coordinator.format(&original, &working_dir).await.unwrap_or_default();
    if edits.is_empty() {
        // The reason was printed through the sink
        return Ok(false);
    }

    let formatted = apply_edits(&original, &edits);
    let changed = formatted != original;

    match (mode, input) {
        (FormatMode::Check, _) => {
            if changed && !quiet {
                println!("Would reformat: {}", input.display_name());
            }
            Ok(!changed)
        }
        (FormatMode::Stdout, _) | (FormatMode::Write, Input::Stdin) => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(formatted.as_bytes())?;
            stdout.flush()?;
            Ok(true)
        }
        (FormatMode::Write, Input::File(path)) => {
            if changed {
                std::fs::write(path, &formatted)?;
                if !quiet {
                    println!("Formatted {}", path.display());
                }
            }
            Ok(true)
        }
    }
}

fn parent_dir(path: &Path) -> io::Result<PathBuf> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => Ok(parent.to_path_buf()),
        _ => std::env::current_dir(),
    }
}
