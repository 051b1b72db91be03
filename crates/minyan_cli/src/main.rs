//! Command-line entry point for the broadcast store.
//!
//! # Responsibility
//! - Drive every store operation through the JSON API so output matches the
//!   wire contract byte for byte.
//! - Resolve configuration from flags, environment and defaults.

use clap::{Args, Parser, Subcommand};
use log::error;
use minyan_core::{
    dispatch_tool, tool_declarations, ApiResponse, BroadcastApi, BroadcastService, CoreConfig,
    NearbyParams, SqliteBroadcastRepository,
};
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "minyan")]
#[command(about = "Publish and find nearby minyan broadcasts", long_about = None)]
struct Cli {
    /// SQLite database file (overrides MINYAN_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Log level: trace|debug|info|warn|error (overrides MINYAN_LOG_LEVEL)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Absolute directory for rolling log files (overrides MINYAN_LOG_DIR)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Publish a new broadcast
    Create {
        /// Latitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        /// Longitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        /// shacharit, mincha or maariv
        #[arg(long = "type")]
        minyan_type: String,
        /// Earliest time, ISO-8601 (e.g. 2025-03-26T13:00:00Z)
        #[arg(long)]
        earliest: String,
        /// Latest time, ISO-8601
        #[arg(long)]
        latest: String,
    },
    /// Show one broadcast
    Get { id: String },
    /// Find active broadcasts within a radius
    Nearby {
        #[arg(long, allow_hyphen_values = true)]
        lat: String,
        #[arg(long, allow_hyphen_values = true)]
        lon: String,
        /// Radius in miles
        #[arg(long)]
        radius: String,
        /// Only show this minyan type
        #[arg(long = "type")]
        minyan_type: Option<String>,
    },
    /// Change some fields of a broadcast
    Update(UpdateArgs),
    /// Permanently delete a broadcast
    Delete { id: String },
    /// Print function-calling declarations for createBroadcast/findNearbyBroadcasts
    Tools,
    /// Execute a function call by name with JSON arguments
    Call {
        name: String,
        /// JSON object of arguments
        args: String,
    },
}

#[derive(Args)]
struct UpdateArgs {
    id: String,
    #[arg(long, allow_hyphen_values = true)]
    lat: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    lon: Option<f64>,
    #[arg(long = "type")]
    minyan_type: Option<String>,
    #[arg(long)]
    earliest: Option<String>,
    #[arg(long)]
    latest: Option<String>,
    /// true to reopen, false to close the broadcast
    #[arg(long)]
    active: Option<bool>,
}

impl UpdateArgs {
    fn to_body(&self) -> Value {
        let mut body = Map::new();
        if let Some(lat) = self.lat {
            body.insert("latitude".to_string(), json!(lat));
        }
        if let Some(lon) = self.lon {
            body.insert("longitude".to_string(), json!(lon));
        }
        if let Some(minyan_type) = &self.minyan_type {
            body.insert("minyanType".to_string(), json!(minyan_type));
        }
        if let Some(earliest) = &self.earliest {
            body.insert("earliestTime".to_string(), json!(earliest));
        }
        if let Some(latest) = &self.latest {
            body.insert("latestTime".to_string(), json!(latest));
        }
        if let Some(active) = self.active {
            body.insert("active".to_string(), json!(active));
        }
        Value::Object(body)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match CoreConfig::from_env().and_then(|config| {
        config.with_overrides(cli.db.clone(), cli.log_level.as_deref(), cli.log_dir.clone())
    }) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = config.init_logging() {
        eprintln!("Error: {err}");
        return ExitCode::FAILURE;
    }

    match cli.command {
        Command::Tools => print_json(&json!(tool_declarations()), true),
        command => match open_api(&config) {
            Some(api) => run(&api, command),
            None => ExitCode::FAILURE,
        },
    }
}

fn open_api(config: &CoreConfig) -> Option<BroadcastApi<SqliteBroadcastRepository>> {
    match SqliteBroadcastRepository::open(&config.db_path) {
        Ok(repo) => Some(BroadcastApi::new(BroadcastService::new(repo))),
        Err(err) => {
            error!("event=cli_open module=cli status=error error={err}");
            eprintln!(
                "Error: cannot open database `{}`: {err}",
                config.db_path.display()
            );
            None
        }
    }
}

fn run(api: &BroadcastApi<SqliteBroadcastRepository>, command: Command) -> ExitCode {
    match command {
        Command::Create {
            lat,
            lon,
            minyan_type,
            earliest,
            latest,
        } => report(api.create(&json!({
            "latitude": lat,
            "longitude": lon,
            "minyanType": minyan_type,
            "earliestTime": earliest,
            "latestTime": latest,
        }))),
        Command::Get { id } => report(api.get(&id)),
        Command::Nearby {
            lat,
            lon,
            radius,
            minyan_type,
        } => {
            let mut pairs = vec![("latitude", lat), ("longitude", lon), ("radius", radius)];
            if let Some(minyan_type) = minyan_type {
                pairs.push(("minyanType", minyan_type));
            }
            report(api.nearby(&NearbyParams::from_pairs(pairs)))
        }
        Command::Update(args) => report(api.update(&args.id, &args.to_body())),
        Command::Delete { id } => report(api.delete(&id)),
        Command::Tools => print_json(&json!(tool_declarations()), true),
        Command::Call { name, args } => {
            let args: Value = match serde_json::from_str(&args) {
                Ok(args) => args,
                Err(err) => {
                    eprintln!("Error: arguments are not valid JSON: {err}");
                    return ExitCode::FAILURE;
                }
            };
            let outcome = dispatch_tool(api, &name, &args);
            print_json(&json!(outcome), outcome.success)
        }
    }
}

fn report(response: ApiResponse) -> ExitCode {
    match &response.body {
        Some(body) => print_json(body, response.is_success()),
        None if response.is_success() => ExitCode::SUCCESS,
        None => ExitCode::FAILURE,
    }
}

fn print_json(value: &Value, success: bool) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(text) if success => println!("{text}"),
        Ok(text) => eprintln!("{text}"),
        Err(err) => {
            eprintln!("Error: {err}");
            return ExitCode::FAILURE;
        }
    }

    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn update_args(argv: &[&str]) -> UpdateArgs {
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.command {
            Command::Update(args) => args,
            _ => panic!("expected the update subcommand"),
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn update_body_carries_only_supplied_flags() {
        let args = update_args(&["minyan", "update", "some-id", "--active", "false"]);
        assert_eq!(args.id, "some-id");
        assert_eq!(args.to_body(), json!({ "active": false }));

        let args = update_args(&["minyan", "update", "some-id"]);
        assert_eq!(args.to_body(), json!({}));
    }

    #[test]
    fn update_body_uses_wire_field_names() {
        let args = update_args(&[
            "minyan",
            "update",
            "some-id",
            "--lat",
            "-33.9",
            "--type",
            "maariv",
            "--latest",
            "2025-03-26T16:00:00Z",
        ]);
        assert_eq!(
            args.to_body(),
            json!({
                "latitude": -33.9,
                "minyanType": "maariv",
                "latestTime": "2025-03-26T16:00:00Z",
            })
        );
    }

    #[test]
    fn global_flags_parse_after_the_subcommand() {
        let cli = Cli::try_parse_from([
            "minyan",
            "nearby",
            "--lat",
            "40.7130",
            "--lon",
            "-74.0059",
            "--radius",
            "2",
            "--db",
            "/tmp/minyan.db",
        ])
        .unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/minyan.db")));
        assert!(matches!(
            cli.command,
            Command::Nearby { ref lon, ref minyan_type, .. }
                if lon == "-74.0059" && minyan_type.is_none()
        ));
    }
}
