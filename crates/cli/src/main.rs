//! edgetrace CLI: ingest and search device traces from the command line.
//!
//! - `edgetrace ingest --device D --account A [--file F]` reads a JSON array
//!   of records (stdin by default) and prints the assigned ids
//! - `edgetrace search --account A [filters]` prints one page as JSON
//!
//! `--config FILE` selects the backend; without it an empty in-memory
//! backend is used.

mod commands;
mod parse;

use std::io::Read;
use std::process;

use edgetrace::{parse_batch, ServiceConfig, TraceService};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use commands::build_cli;
use parse::{matches_to_action, CliAction};

const REQUEST_ID: &str = "cli";

fn main() {
    let matches = build_cli().get_matches();

    let level = matches
        .get_one::<String>("log-level")
        .map(String::as_str)
        .unwrap_or("info");
    init_logging(level);

    let exit_code = match run(&matches) {
        Ok(output) => {
            println!("{}", output);
            0
        }
        Err(e) => {
            eprintln!("{}", e);
            1
        }
    };
    process::exit(exit_code);
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(matches: &clap::ArgMatches) -> Result<String, String> {
    let config = match matches.get_one::<String>("config") {
        Some(path) => ServiceConfig::load(path).map_err(|e| e.to_string())?,
        None => ServiceConfig::default(),
    };
    debug!(?config, "loaded configuration");

    let service = TraceService::from_config(&config)
        .map_err(|e| format!("Failed to start trace service: {}", e))?;

    match matches_to_action(matches)? {
        CliAction::Ingest {
            device,
            account,
            file,
        } => {
            let body = read_input(file.as_deref())?;
            let records = parse_batch(&body).map_err(|e| format!("Invalid records: {}", e))?;
            let ctx = service.context(REQUEST_ID, &account);
            let ids = service
                .ingest(&ctx, &device, &account, &records)
                .map_err(|e| e.to_string())?;
            let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
            serde_json::to_string_pretty(&ids).map_err(|e| e.to_string())
        }
        CliAction::Search {
            account,
            devices,
            params,
        } => {
            let parsed = service
                .query_builder()
                .account(account.as_str())
                .devices(devices)
                .params(params.iter().map(|(n, v)| (n.as_str(), v.as_str())))
                .and_then(|builder| builder.build())
                .map_err(|e| e.to_string())?;
            let ctx = service.context(REQUEST_ID, &account);
            let page = service.search(&ctx, &parsed).map_err(|e| e.to_string())?;
            serde_json::to_string_pretty(&page).map_err(|e| e.to_string())
        }
    }
}

fn read_input(file: Option<&str>) -> Result<String, String> {
    match file {
        Some(path) => {
            std::fs::read_to_string(path).map_err(|e| format!("Cannot read {}: {}", path, e))
        }
        None => {
            let mut body = String::new();
            std::io::stdin()
                .read_to_string(&mut body)
                .map_err(|e| format!("Cannot read stdin: {}", e))?;
            Ok(body)
        }
    }
}
