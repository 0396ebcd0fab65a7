//! `carte`: address lookup and draw-event replay outside the browser.
//!
//! `carte search <terms..>` queries the address API the way the map's search
//! box does; `carte replay` runs a recorded draw-event log against a stored
//! field value and prints what the form would submit.

mod geocode;
mod replay;

use carte_editor::search::{AddressSearch, SearchOutcome};
use carte_editor::EditorConfig;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::geocode::{GeocodeClient, run_search};

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// Editor configuration (JSON). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Look up addresses and print `label<TAB>lon,lat` per match.
    Search {
        #[arg(required = true, num_args = 1..)]
        terms: Vec<String>,
        /// Overrides the configured result limit.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Replay draw events and print the resulting field value.
    Replay {
        /// Persisted field value to seed from. Empty collection when omitted.
        #[arg(long)]
        initial: Option<PathBuf>,
        /// JSON array of `{"kind": "draw.create", "features": [..]}` events.
        #[arg(long)]
        events: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::FAILURE;
        }
    };

    let result = match args.command {
        Command::Search { terms, limit } => search(config, &terms.join(" "), limit).await,
        Command::Replay { initial, events } => run_replay(initial.as_deref(), &events),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<EditorConfig, String> {
    let Some(path) = path else {
        return Ok(EditorConfig::default());
    };
    let text = read(path)?;
    EditorConfig::from_json(&text).map_err(|e| format!("{}: {e}", path.display()))
}

fn read(path: &Path) -> Result<String, String> {
    std::fs::read_to_string(path).map_err(|e| format!("cannot read {}: {e}", path.display()))
}

async fn search(mut config: EditorConfig, term: &str, limit: Option<usize>) -> Result<(), String> {
    if let Some(limit) = limit {
        config.search_limit = limit;
        config.validate().map_err(|e| e.to_string())?;
    }
    let client = GeocodeClient::new().map_err(|e| e.to_string())?;
    let mut search = AddressSearch::new(&config);

    match run_search(&mut search, &client, term).await {
        None => Err(format!(
            "enter at least {} characters to search",
            config.min_query_len
        )),
        Some(SearchOutcome::Failed(e)) => Err(format!("search failed: {e}")),
        Some(SearchOutcome::Results(results)) => {
            if results.is_empty() {
                log::info!("no address matches {term:?}");
            }
            for address in results {
                println!(
                    "{}\t{},{}",
                    address.label(),
                    address.coordinates.lon,
                    address.coordinates.lat
                );
            }
            Ok(())
        }
    }
}

fn run_replay(initial: Option<&Path>, events: &Path) -> Result<(), String> {
    let initial = match initial {
        Some(path) => read(path)?,
        None => r#"{"type":"FeatureCollection","features":[]}"#.to_string(),
    };
    let events = read(events)?;
    let summary = replay::replay(&initial, &events).map_err(|e| e.to_string())?;

    for message in &summary.rejected {
        log::warn!("{message}");
    }
    log::info!(
        "{} seeded, {} features after replay, {} field updates",
        summary.seeded,
        summary.features,
        summary.notifications
    );
    println!("{}", summary.value);
    Ok(())
}
