//! # Tier List CLI (`tierlist`)
//!
//! ## Usage
//!
//! ```bash
//! tierlist --config ./config/tierlist.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `tierlist show <id>` | Load an analysis and print functions grouped by tier |
//! | `tierlist stats <id>` | Print totals and the per-tier breakdown |
//! | `tierlist list` | List analyses the configured source can enumerate |
//! | `tierlist browse [<id>]` | Interactive session reading commands from stdin |
//!
//! ## Examples
//!
//! ```bash
//! # Hot-path functions whose name contains "parse"
//! tierlist show run-42 --tier S --search parse
//!
//! # Alphabetical, machine-readable
//! tierlist show run-42 --sort name --order asc --json
//!
//! # Offline, against exported analysis files
//! tierlist --config ./config/offline.toml list
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tierlist::commands::{self, ShowOptions};
use tierlist::{config, logging, SortKey, SortOrder, Tier};

/// Tier List CLI: browse the tiered function catalogue of an analysis run.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. When the file does not exist, an HTTP source against
/// `http://127.0.0.1:8000` is used.
#[derive(Parser)]
#[command(
    name = "tierlist",
    about = "Browse, search, and sort the ranked function catalogue of a code-analysis run",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/tierlist.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load an analysis and print its functions grouped by tier.
    ///
    /// Every tier is listed, including empty ones. Filters apply before
    /// grouping; stats always cover the whole analysis.
    Show {
        /// Analysis id.
        id: String,

        /// Case-insensitive substring match on the function name.
        #[arg(long)]
        search: Option<String>,

        /// Show only one tier (S, A, B, C, D, F).
        #[arg(long)]
        tier: Option<Tier>,

        /// Sort key: `call_count`, `name`, `file` or `tier`.
        #[arg(long)]
        sort: Option<SortKey>,

        /// Sort direction: `asc` or `desc`.
        #[arg(long)]
        order: Option<SortOrder>,

        /// Print the derived state as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print total functions, total calls and per-tier counts.
    Stats {
        /// Analysis id.
        id: String,

        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List analyses available from the configured source.
    ///
    /// Only the `file` provider can enumerate analyses.
    List,

    /// Interactive session: read commands from stdin, print the view after each.
    ///
    /// Type `help` inside the session for the command list.
    Browse {
        /// Analysis to open on start.
        id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = config::load_or_default(&cli.config)?;
    logging::init_with_config(&cfg.logging);
    tracing::debug!(config = %cli.config.display(), provider = %cfg.source.provider, "starting");

    match cli.command {
        Commands::Show {
            id,
            search,
            tier,
            sort,
            order,
            json,
        } => {
            let opts = ShowOptions {
                search,
                tier,
                sort,
                order,
                json,
            };
            commands::run_show(&cfg, &id, opts).await?;
        }
        Commands::Stats { id, json } => {
            commands::run_stats(&cfg, &id, json).await?;
        }
        Commands::List => {
            commands::run_list(&cfg)?;
        }
        Commands::Browse { id } => {
            commands::run_browse(&cfg, id).await?;
        }
    }

    Ok(())
}
