#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front end for the postcode map.
//!
//! Every subcommand works on the same persisted search history the API
//! server uses, so searches made here show up in `history`, `table` and
//! `map` later on. With no subcommand an interactive menu is shown.
//!
//! Uses `indicatif-log-bridge` (via [`postcode_map_cli_utils::init_logger`])
//! so that log lines and the search spinner never fight for the terminal.

mod interactive;
mod render;
mod session;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use postcode_map_config::AppConfig;
use postcode_map_search_models::SearchId;
use postcode_map_view::{DisplayOptions, SortOrder};

use crate::session::Session;

#[derive(Parser)]
#[command(name = "postcode_map_cli", about = "UK postcode search")]
struct Cli {
    /// Config file (overrides `POSTCODE_MAP_CONFIG`)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for a postcode and record the result
    Search {
        /// Postcode, e.g. "SW1A 2AA"
        postcode: String,
    },
    /// Search for the postcode nearest to a coordinate pair
    Locate {
        #[arg(allow_negative_numbers = true)]
        latitude: f64,
        #[arg(allow_negative_numbers = true)]
        longitude: f64,
    },
    /// List or edit the search history
    History {
        #[command(subcommand)]
        action: Option<HistoryAction>,
    },
    /// Show the results table
    Table {
        /// Include every bus stop of each visible search
        #[arg(long)]
        stops: bool,
        /// Include every crime of each visible search
        #[arg(long)]
        crimes: bool,
        /// Oldest search first
        #[arg(long)]
        oldest_first: bool,
    },
    /// Show the map viewport and markers
    Map {
        /// Include bus stop markers
        #[arg(long)]
        stops: bool,
        /// Include crime markers
        #[arg(long)]
        crimes: bool,
    },
    /// Check the backend health endpoint
    Status,
    /// Start the API server
    Serve,
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List cached searches, newest first
    List,
    /// Remove one search
    Remove { id: SearchId },
    /// Remove every search
    Clear,
    /// Keep a search in the table but take it off the map
    Hide { id: SearchId },
    /// Put a hidden search back on the map
    Unhide { id: SearchId },
    /// Put every hidden search back on the map
    UnhideAll,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = postcode_map_cli_utils::init_logger();
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;

    let mut session = Session::open(&config, multi)?;

    let Some(command) = cli.command else {
        return interactive::run(&mut session, config).await;
    };

    let ok = match command {
        Commands::Search { postcode } => session.search(&postcode).await,
        Commands::Locate {
            latitude,
            longitude,
        } => session.locate(latitude, longitude).await,
        Commands::History { action } => history(&mut session, action.unwrap_or(HistoryAction::List)),
        Commands::Table {
            stops,
            crimes,
            oldest_first,
        } => {
            let options = DisplayOptions {
                show_all_stops: stops,
                show_all_crimes: crimes,
            };
            let order = if oldest_first {
                SortOrder::Ascending
            } else {
                SortOrder::Descending
            };
            println!("{}", session.table(options, order));
            true
        }
        Commands::Map { stops, crimes } => {
            if stops {
                session.toggle_stops();
            }
            if crimes {
                session.toggle_crimes();
            }
            println!("{}", session.map());
            true
        }
        Commands::Status => session.status().await,
        Commands::Serve => {
            // The server runs on actix-web's own runtime, off this one.
            tokio::task::spawn_blocking(move || postcode_map_server::run_server_blocking(config))
                .await??;
            true
        }
    };

    if !ok {
        std::process::exit(1);
    }

    Ok(())
}

fn history(session: &mut Session, action: HistoryAction) -> bool {
    let (changed, what) = match action {
        HistoryAction::List => {
            println!("{}", session.history());
            return true;
        }
        HistoryAction::Clear => {
            let count = session.explorer().history().len();
            session.clear();
            println!("Removed {count} search(es)");
            return true;
        }
        HistoryAction::UnhideAll => {
            println!("{} search(es) shown again", session.unhide_all());
            return true;
        }
        HistoryAction::Remove { id } => (session.remove(id), format!("Removed search {id}")),
        HistoryAction::Hide { id } => (session.hide(id), format!("Hid search {id}")),
        HistoryAction::Unhide { id } => (session.unhide(id), format!("Search {id} shown again")),
    };

    if changed {
        println!("{what}");
    } else {
        println!("Nothing changed: search is not in the history or already in that state");
    }
    changed
}
