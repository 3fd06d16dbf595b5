use clap::{Parser, Subcommand};

mod cli_utils;
mod commands;

use commands::format::FormatMode;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path (defaults to .mesonfmt.toml in the current directory)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Show detailed output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Command to run
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Format meson build files with `meson format`
    Format {
        /// Files to format; stdin when empty or `-`
        paths: Vec<String>,

        /// Report files that would change instead of writing them
        #[arg(long, conflicts_with = "stdout")]
        check: bool,

        /// Print formatted content to stdout instead of writing files
        #[arg(long)]
        stdout: bool,
    },

    /// Check that the installed meson can format, and show how it is invoked
    Check,

    /// Start the Language Server Protocol server
    Server {
        /// TCP port to listen on (for debugging)
        #[arg(long)]
        port: Option<u16>,

        /// Use stdio for communication (default)
        #[arg(long)]
        stdio: bool,
    },

    /// Show version information
    Version,
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so they never mix with LSP traffic or formatted output
    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Stderr)
        .init();

    match cli.command {
        Commands::Format { paths, check, stdout } => {
            let mode = if check {
                FormatMode::Check
            } else if stdout {
                FormatMode::Stdout
            } else {
                FormatMode::Write
            };
            commands::format::handle_format(paths, mode, cli.config.as_deref(), cli.quiet);
        }
        Commands::Check => commands::check::handle_check(cli.config.as_deref()),
        Commands::Server { port, stdio } => commands::server::handle_server(port, stdio, cli.config),
        Commands::Version => commands::version::handle_version(),
    }
}
