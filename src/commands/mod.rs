//! Command handlers for the mesonfmt CLI.
//!
//! Each subcommand has its own module with a public handler function
//! that `main()` dispatches to.

pub mod check;
pub mod format;
pub mod server;
pub mod version;
