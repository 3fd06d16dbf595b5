//! Editor integration for `meson format`.
//!
//! The crate checks whether the installed `meson` can format at all, picks
//! how the document reaches its stdin, runs it, and turns the output into a
//! single whole-document edit. The [`lsp`] module serves this over the
//! Language Server Protocol; the `mesonfmt` binary also exposes it on the
//! command line.

pub mod capability;
pub mod config;
pub mod coordinator;
pub mod edits;
pub mod exec;
pub mod exit_codes;
pub mod formatter;
pub mod introspection;
pub mod lsp;
pub mod output;
pub mod version;

pub use capability::{CapabilityError, StdinConvention, Tool, ToolCheckResult, check_tool};
pub use config::FormattingConfig;
pub use coordinator::{FormattingCoordinator, ReloadOutcome};
pub use edits::{TextEdit, apply_edits, full_document_range, reconcile};
pub use exec::{ExecError, ExecResult, ProcessRunner, SubprocessRunner};
pub use version::{Version, VersionError};
