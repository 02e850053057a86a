//! `autoss`: adds save-state ports and logic to a Verilog module hierarchy.
//!
//! Reads the given sources, instruments every module reachable from the
//! root module and writes the instrumented modules, leaves first, to the
//! output file.

#![warn(missing_docs)]

mod error;
mod output;
mod pipeline;
mod tools;

use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Automatic save-state instrumentation for Verilog.
#[derive(Parser, Debug)]
#[command(name = "autoss", version, about = "Automatic save-state generator")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to an `autoss.toml` configuration file.
    #[arg(long)]
    pub config: Option<String>,

    /// Prefix of the generated ports, overriding the configuration.
    #[arg(long)]
    pub prefix: Option<String>,

    /// Write the output without running the formatter.
    #[arg(long)]
    pub no_format: bool,

    /// Output format for diagnostics.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub message_format: ReportFormat,

    /// Parser used to build the syntax trees.
    #[arg(long, value_enum, default_value_t = Frontend::Verible)]
    pub frontend: Frontend,

    /// Root module of the hierarchy.
    pub module: String,

    /// Output file, or `-` for stdout.
    pub output: String,

    /// Verilog sources (`.v` or `.sv`).
    #[arg(required = true, num_args = 1..)]
    pub files: Vec<PathBuf>,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from terminal capabilities.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Diagnostic output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// One JSON object per line.
    Json,
}

/// Source of the syntax trees.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Frontend {
    /// Preprocess and parse with the Verible command-line tools.
    Verible,
    /// The built-in parser; needs no external tools.
    Builtin,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Whether to use colored output.
    pub color: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

impl GlobalArgs {
    /// Default log filter for these flags; `RUST_LOG` takes precedence.
    fn log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => atty_is_terminal(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
        config: cli.config.clone(),
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(global.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(color)
        .init();

    process::exit(pipeline::run(&cli, &global));
}

/// Rough terminal detection: checks the TERM env var.
fn atty_is_terminal() -> bool {
    std::env::var("TERM").is_ok()
}
