//! qmlaot command-line driver
//!
//! Checks QML documents against their type descriptions and compiles
//! their annotated functions ahead of time.

mod commands;
mod config;
mod error;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::compile::CompileArgs;
use commands::GlobalOptions;
use output::{resolve_color_choice, OutputFormat};

#[derive(Parser)]
#[command(name = "qmlaot")]
#[command(about = "QML ahead-of-time compiler", long_about = None)]
#[command(version)]
struct Cli {
    /// Diagnostic output format
    #[arg(long, value_enum, global = true, default_value_t = OutputFormat::Pretty)]
    format: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a document's scopes and report diagnostics
    Check {
        /// Parsed document (JSON)
        document: PathBuf,
        /// Type descriptions (JSON)
        #[arg(long = "types", num_args = 1..)]
        types: Vec<PathBuf>,
    },

    /// Generate native code for a document's functions
    Compile {
        /// Parsed document (JSON)
        document: PathBuf,
        /// Type descriptions (JSON)
        #[arg(long = "types", num_args = 1..)]
        types: Vec<PathBuf>,
        /// Annotated functions (JSON)
        #[arg(long)]
        functions: PathBuf,
        /// Output file; stdout if omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Install the tracing subscriber; `QMLAOT_LOG` takes an env-filter
/// directive and defaults to `warn`.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("QMLAOT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> anyhow::Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();
    let options = GlobalOptions {
        format: cli.format,
        color: resolve_color_choice(cli.no_color),
    };

    match cli.command {
        Commands::Check { document, types } => commands::check::execute(&options, &document, &types),
        Commands::Compile {
            document,
            types,
            functions,
            output,
        } => commands::compile::execute(
            &options,
            CompileArgs {
                document: &document,
                types: &types,
                functions: &functions,
                output: output.as_deref(),
            },
        ),
    }
}
