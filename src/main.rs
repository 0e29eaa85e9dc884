//! mdbwire - encode document database commands into wire protocol bytes
//!
//! Builds `OP_DELETE` messages from a namespace and a JSON selector and prints
//! them for inspection or for piping into another tool.

mod commands;
mod config;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use config::Config;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mdbwire")]
#[command(about = "Encode document database commands into wire protocol bytes")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, env = "MDBWIRE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Single line of lowercase hex
    Hex,
    /// Offset-prefixed hex dump
    Dump,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode an OP_DELETE message
    EncodeDelete {
        /// Full collection name ("db.collection")
        #[arg(short, long)]
        ns: String,

        /// Selector JSON (or @file.json to read from file); defaults to {}
        #[arg(short, long)]
        selector: Option<String>,

        /// Pre-encoded selector document as hex
        #[arg(long)]
        raw: Option<String>,

        /// Remove only the first matching document
        #[arg(long)]
        single: bool,

        /// Request ID (allocated automatically if omitted)
        #[arg(short, long)]
        request_id: Option<i32>,

        /// Apply the message size ceiling instead of the document ceiling
        #[arg(long)]
        skip_document_validation: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "hex")]
        format: OutputFormat,
    },

    /// Print the effective configuration as YAML
    ShowConfig,

    /// Write the effective configuration to a YAML file
    InitConfig {
        /// Destination path
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so stdout carries only encoded output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(c) => {
            if let Some(ref path) = cli.config {
                tracing::info!("Loaded config from {}", path.display());
            }
            c
        }
        Err(e) => {
            tracing::error!("Failed to load config: {}", e);
            eprintln!("{}: {}", "Error".red(), e);
            std::process::exit(1);
        }
    };

    tracing::debug!(
        "Size limits: document={} message={} skip_validation={}",
        config.limits.max_document_bytes,
        config.limits.max_message_bytes,
        config.limits.skip_document_validation
    );

    match commands::execute(&config, cli.command) {
        Ok(output) => {
            println!("{}", output);
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            std::process::exit(1);
        }
    }

    Ok(())
}
