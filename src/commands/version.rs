//! Handler for the `version` command.

use mesonfmt_lib::capability::FORMAT_SUPPORTED_SINCE;

/// Print version information.
pub fn handle_version() {
    println!("mesonfmt {}", env!("CARGO_PKG_VERSION"));
    println!("requires meson >= {FORMAT_SUPPORTED_SINCE}");
}
