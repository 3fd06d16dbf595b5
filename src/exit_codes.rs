//! Exit codes for mesonfmt, following Ruff's convention
//!
//! These exit codes allow editors and CI systems to tell a formatting
//! problem apart from a broken installation.

/// Success - Formatting succeeded or nothing would change
pub const SUCCESS: i32 = 0;

/// Formatting issues - A file would be reformatted (`--check`), or the tool
/// rejected a file
pub const FORMATTING_ISSUES: i32 = 1;

/// Tool error - Configuration error, missing or too old `meson`, file access error
pub const TOOL_ERROR: i32 = 2;

/// Helper functions for consistent exit behavior
pub mod exit {
    use super::{FORMATTING_ISSUES, SUCCESS, TOOL_ERROR};

    /// Exit with success code (0)
    pub fn success() -> ! {
        std::process::exit(SUCCESS);
    }

    /// Exit with formatting issues code (1)
    pub fn formatting_issues() -> ! {
        std::process::exit(FORMATTING_ISSUES);
    }

    /// Exit with tool error code (2)
    pub fn tool_error() -> ! {
        std::process::exit(TOOL_ERROR);
    }
}
