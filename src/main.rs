//! # Tracklight CLI (`tracklight`)
//!
//! Highlights track files: every token (or XML element) is recorded
//! against the characters it came from, the annotated file is written as
//! HTML, and at the `database` level the extractions are stored in SQLite.
//!
//! ## Usage
//!
//! ```bash
//! tracklight --config ./config/tracklight.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `tracklight init` | Create the SQLite database and run schema migrations |
//! | `tracklight highlight <path>` | Highlight one file and export HTML |
//! | `tracklight scan` | Highlight every file under `[sources.filesystem]` |
//! | `tracklight extractions <id>` | List stored extractions of a datafile |
//!
//! Logs go to stderr (`RUST_LOG`, default `tracklight=info`); command
//! output goes to stdout.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use tracklight::config;
use tracklight::extractions;
use tracklight::migrate;
use tracklight::pipeline::{self, HighlightOptions, DEFAULT_TOOL};
use tracklight::tokenize::Grammar;

/// Tracklight: provenance highlighting for maritime track files.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. Without one, `highlight` falls back to built-in defaults.
#[derive(Parser)]
#[command(
    name = "tracklight",
    about = "Tracklight — provenance highlighting for maritime track files",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/tracklight.toml`.
    #[arg(long, global = true, default_value = "./config/tracklight.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the `datafiles` and
    /// `extractions` tables. Safe to run repeatedly.
    Init,

    /// Highlight one track file.
    ///
    /// Text files are split into lines and tokens; `.xml` and `.gpx` files
    /// are parsed and every element with text is recorded. The annotated
    /// file is written as HTML.
    Highlight {
        /// File to highlight.
        path: PathBuf,

        /// Token grammar for text files: `whitespace` or `csv`.
        #[arg(long, default_value = "whitespace")]
        grammar: String,

        /// Tool name recorded against each token.
        #[arg(long, default_value = DEFAULT_TOOL)]
        tool: String,

        /// Only process the first N lines.
        #[arg(long)]
        lines: Option<i64>,

        /// HTML output file (default `<output.dir>/<file>.html`).
        #[arg(long)]
        output: Option<PathBuf>,

        /// Append the colour key to the report.
        #[arg(long)]
        key: bool,

        /// Print the summary as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Highlight every file matched by `[sources.filesystem]`.
    ///
    /// Files that fail are logged and skipped.
    Scan {
        /// Tool name recorded against each token.
        #[arg(long, default_value = DEFAULT_TOOL)]
        tool: String,
    },

    /// List the stored extractions of a datafile.
    Extractions {
        /// Datafile UUID (printed by `highlight`).
        id: String,

        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tracklight=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .init();

    // `highlight` works without a config file
    let cfg = match &cli.command {
        Commands::Highlight { .. } if !cli.config.exists() => config::Config::minimal(),
        _ => config::load_config(&cli.config)?,
    };

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Highlight {
            path,
            grammar,
            tool,
            lines,
            output,
            key,
            json,
        } => {
            let opts = HighlightOptions {
                grammar: grammar.parse::<Grammar>()?,
                tool,
                lines,
                output,
                key,
            };
            pipeline::run_highlight(&cfg, &path, &opts, json).await?;
        }
        Commands::Scan { tool } => {
            let opts = HighlightOptions {
                tool,
                ..HighlightOptions::default()
            };
            pipeline::run_scan(&cfg, &opts).await?;
        }
        Commands::Extractions { id, json } => {
            extractions::run_extractions(&cfg, &id, json).await?;
        }
    }

    Ok(())
}
