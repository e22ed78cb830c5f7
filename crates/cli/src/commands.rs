//! Clap command tree.

use clap::{Arg, ArgAction, Command};

/// Build the top-level command.
pub fn build_cli() -> Command {
    Command::new("edgetrace")
        .about("Ingest and search device traces")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_name("FILE")
                .help("Service configuration (TOML)"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .global(true)
                .value_name("LEVEL")
                .default_value("info")
                .help("Log filter when RUST_LOG is unset"),
        )
        .subcommand(ingest_command())
        .subcommand(search_command())
}

fn ingest_command() -> Command {
    Command::new("ingest")
        .about("Store a JSON array of trace records for one device")
        .arg(
            Arg::new("device")
                .long("device")
                .short('d')
                .required(true)
                .help("Device id the records belong to"),
        )
        .arg(
            Arg::new("account")
                .long("account")
                .short('a')
                .required(true)
                .help("Owning account id"),
        )
        .arg(
            Arg::new("file")
                .long("file")
                .short('f')
                .value_name("FILE")
                .help("Read records from FILE instead of stdin"),
        )
}

fn search_command() -> Command {
    Command::new("search")
        .about("List traces for an account")
        .arg(
            Arg::new("account")
                .long("account")
                .short('a')
                .required(true)
                .help("Account id"),
        )
        .arg(
            Arg::new("device")
                .long("device")
                .short('d')
                .action(ArgAction::Append)
                .help("Device id; repeat to match any of several"),
        )
        .arg(
            Arg::new("after")
                .long("after")
                .value_name("RFC3339")
                .help("Earliest client timestamp, inclusive"),
        )
        .arg(
            Arg::new("before")
                .long("before")
                .value_name("RFC3339")
                .help("Latest client timestamp, inclusive"),
        )
        .arg(Arg::new("type").long("type").short('t').help("Trace type"))
        .arg(
            Arg::new("limit")
                .long("limit")
                .short('n')
                .help("Page size (2-1000)"),
        )
        .arg(
            Arg::new("order")
                .long("order")
                .value_parser(["asc", "desc", "ASC", "DESC"])
                .help("Sort direction by id"),
        )
        .arg(
            Arg::new("cursor")
                .long("cursor")
                .value_name("ID")
                .help("Resume past this trace id"),
        )
        .arg(
            Arg::new("include-total")
                .long("include-total")
                .action(ArgAction::SetTrue)
                .help("Report the total number of matches"),
        )
}
