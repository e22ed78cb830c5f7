//! ArgMatches → CliAction conversion.
//!
//! Search flags are turned into the same `name=value` parameters the query
//! builder accepts from an HTTP request, so both paths share validation.

use clap::ArgMatches;

/// The result of parsing the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliAction {
    /// Store records for one device.
    Ingest {
        device: String,
        account: String,
        file: Option<String>,
    },
    /// Run one search.
    Search {
        account: String,
        devices: Vec<String>,
        params: Vec<(String, String)>,
    },
}

/// Convert clap ArgMatches into a CliAction.
pub fn matches_to_action(matches: &ArgMatches) -> Result<CliAction, String> {
    let (sub_name, sub_matches) = matches
        .subcommand()
        .ok_or_else(|| "No command provided".to_string())?;

    match sub_name {
        "ingest" => parse_ingest(sub_matches),
        "search" => parse_search(sub_matches),
        other => Err(format!("Unknown command: {}", other)),
    }
}

fn required(m: &ArgMatches, name: &str) -> Result<String, String> {
    m.get_one::<String>(name)
        .cloned()
        .ok_or_else(|| format!("Missing --{}", name))
}

fn parse_ingest(m: &ArgMatches) -> Result<CliAction, String> {
    Ok(CliAction::Ingest {
        device: required(m, "device")?,
        account: required(m, "account")?,
        file: m.get_one::<String>("file").cloned(),
    })
}

fn parse_search(m: &ArgMatches) -> Result<CliAction, String> {
    let devices = m
        .get_many::<String>("device")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    let mut params = Vec::new();
    for (flag, param) in [
        ("after", "timestamp__gte"),
        ("before", "timestamp__lte"),
        ("type", "type__eq"),
        ("limit", "limit"),
        ("order", "order"),
        ("cursor", "after"),
    ] {
        if let Some(value) = m.get_one::<String>(flag) {
            params.push((param.to_string(), value.clone()));
        }
    }
    if m.get_flag("include-total") {
        params.push(("include".to_string(), "total_count".to_string()));
    }

    Ok(CliAction::Search {
        account: required(m, "account")?,
        devices,
        params,
    })
}
