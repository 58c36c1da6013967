mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Convert documents to typed objects and back.
#[derive(Parser)]
#[command(name = "yoml", version, about = "Convert documents to typed objects and back")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a document and print the resulting value
    Read {
        /// Type catalog (JSON or YAML)
        #[arg(long)]
        catalog: PathBuf,
        /// Document to read (JSON or YAML)
        document: PathBuf,
        /// Expected type of the document
        #[arg(long = "type")]
        type_name: Option<String>,
    },

    /// Read a document, write it back and print the result
    Roundtrip {
        /// Type catalog (JSON or YAML)
        #[arg(long)]
        catalog: PathBuf,
        /// Document to read (JSON or YAML)
        document: PathBuf,
        /// Expected type of the document
        #[arg(long = "type")]
        type_name: Option<String>,
    },

    /// Print the accepted syntax of a type
    Doc {
        /// Type catalog (JSON or YAML)
        #[arg(long)]
        catalog: PathBuf,
        /// Type to document
        type_name: String,
    },
}

fn init_logging(quiet: bool) {
    let filter = EnvFilter::try_from_env("YOML_LOG")
        .unwrap_or_else(|_| EnvFilter::new(if quiet { "error" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.quiet);

    match cli.command {
        Commands::Read {
            catalog,
            document,
            type_name,
        } => {
            commands::read::cmd_read(&catalog, &document, type_name.as_deref(), cli.output, cli.quiet);
        }
        Commands::Roundtrip {
            catalog,
            document,
            type_name,
        } => {
            commands::roundtrip::cmd_roundtrip(
                &catalog,
                &document,
                type_name.as_deref(),
                cli.output,
                cli.quiet,
            );
        }
        Commands::Doc { catalog, type_name } => {
            commands::doc::cmd_doc(&catalog, &type_name, cli.output, cli.quiet);
        }
    }
}

/// Print an error to stderr, as plain text or `{"error": ...}`.
pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => eprintln!("{}", serde_json::json!({ "error": msg })),
    }
}
