//! # Repo Harvest CLI (`harvest`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `harvest zip [-o out.zip] <source>...` | Bundle agent files from sources into a zip |
//! | `harvest feeds` | Copy feed files addressed to this repo from its organization |
//! | `harvest sources <token>...` | Show how source tokens are classified |
//!
//! A source is a local path, an `org/repo` pair, or a git URL.
//!
//! ## Examples
//!
//! ```bash
//! harvest zip acme/scripts acme/pixie
//! harvest zip -o bundle.zip https://github.com/acme/scripts ./vendor/tools
//! harvest feeds --limit 200
//! harvest --json zip acme/scripts > events.jsonl
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use repo_harvest::bundle::{self, BundleOptions};
use repo_harvest::config;
use repo_harvest::connector_github::GithubBackend;
use repo_harvest::feeds::{self, FeedOptions};
use repo_harvest::logging;
use repo_harvest::progress::ProgressMode;
use repo_harvest::sources;

/// Harvest marker files from local, cloned, and hosted repositories.
#[derive(Parser)]
#[command(
    name = "harvest",
    about = "Harvest marker files from many repositories into one tree or archive",
    version
)]
struct Cli {
    /// Path to a TOML configuration file.
    ///
    /// Defaults to `./harvest.toml` when present, built-in settings otherwise.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug detail to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit one JSON object per event on stdout instead of text lines.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bundle matching files from each source into one zip archive.
    ///
    /// Entries are stored as `<source name>/<relative path>`.
    Zip {
        /// Output archive path (default: `agents.zip`).
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Filename suffix to collect (default: `agents_.md`).
        #[arg(long)]
        suffix: Option<String>,

        /// Sources: local paths, `org/repo` pairs, or git URLs.
        sources: Vec<String>,
    },

    /// Copy `*.<repo>.feed-out.md` files from every repository in the
    /// organization into this repository as `*.feed-in.md`.
    Feeds {
        /// Organization to scan instead of the current repo's owner.
        #[arg(long)]
        org: Option<String>,

        /// Maximum number of organization repositories to scan.
        #[arg(long)]
        limit: Option<usize>,

        /// Destination root instead of the current repository root.
        #[arg(long)]
        root: Option<PathBuf>,
    },

    /// Show how each token would be classified. Performs no I/O.
    Sources {
        /// Tokens to classify.
        tokens: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    if let Commands::Sources { tokens } = &cli.command {
        sources::list_sources(tokens);
        return Ok(());
    }

    let cfg = config::resolve_config(cli.config.as_deref())?;
    let backend = GithubBackend::new(&cfg.backend)?;
    let mode = ProgressMode::from_json_flag(cli.json);

    match cli.command {
        Commands::Zip {
            output,
            suffix,
            sources,
        } => {
            let mut options = BundleOptions::from_config(&cfg, sources);
            if let Some(output) = output {
                options.output = output;
            }
            if let Some(suffix) = suffix {
                options.suffix = suffix;
            }
            bundle::run_bundle(&cfg, &backend, options, mode).await?;
        }
        Commands::Feeds { org, limit, root } => {
            let options = FeedOptions { org, limit, root };
            feeds::run_feeds(&cfg, &backend, options, mode).await?;
        }
        Commands::Sources { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
