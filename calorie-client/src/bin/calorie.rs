//! Command-line access to the food collection API.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use calorie_client::{ClientConfig, GatewayClient, GatewayError, RetryNotice};
use calorie_core::{FoodId, Sourced};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "calorie")]
#[command(about = "Query and edit the calorie tracker food collection")]
struct Args {
    /// TOML client configuration.
    #[arg(long, env = "CALORIE_CLIENT_CONFIG")]
    config: Option<PathBuf>,
    /// Base URL of the API; overrides `api_base_url` from the config file.
    #[arg(long, env = "CALORIE_API_URL")]
    base_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List every food item.
    List,
    /// Search food items by name.
    Search { term: String },
    /// Fetch one food item.
    Get { id: FoodId },
    /// Add a food item.
    Add { name: String, calories: i32 },
    /// Replace a food item's name and calories.
    Update {
        id: FoodId,
        name: String,
        calories: i32,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let client = match build_client(&args) {
        Ok(client) => client,
        Err(message) => {
            eprintln!("error: {}", message);
            return ExitCode::FAILURE;
        }
    };

    let outcome = match &args.command {
        Command::List => client.list_items().await.and_then(print_sourced),
        Command::Search { term } => client.search(term).await.and_then(print_sourced),
        Command::Get { id } => client.get_item(*id).await.and_then(print_sourced),
        Command::Add { name, calories } => {
            client.create(name, *calories).await.and_then(print_sourced)
        }
        Command::Update { id, name, calories } => client
            .update(*id, name, *calories)
            .await
            .and_then(print_sourced),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error [{}]: {}", err.kind, err.message);
            ExitCode::FAILURE
        }
    }
}

fn build_client(args: &Args) -> Result<GatewayClient, String> {
    let mut config = match (&args.base_url, &args.config) {
        (_, Some(path)) => ClientConfig::load(Some(path)).map_err(|e| e.to_string())?,
        (Some(url), None) => ClientConfig::new(url.clone()),
        (None, None) => return Err("set --base-url or --config".to_string()),
    };
    if let Some(url) = &args.base_url {
        config.api_base_url = url.clone();
    }
    config.validate().map_err(|e| e.to_string())?;

    let observer = Arc::new(|notice: &RetryNotice| {
        eprintln!(
            "retrying ({}/{}) in {} ms: {}",
            notice.attempt,
            notice.max_retries,
            notice.delay.as_millis(),
            notice.error
        );
    });
    let client = GatewayClient::new(&config).map_err(|e| e.to_string())?;
    Ok(client.with_observer(observer))
}

fn print_sourced<T: Serialize>(sourced: Sourced<T>) -> Result<(), GatewayError> {
    if sourced.is_fallback() {
        eprintln!("note: database unavailable, showing fallback data");
    }
    let rendered = serde_json::to_string_pretty(&sourced.data)
        .map_err(|e| GatewayError::unknown(format!("Failed to render response: {}", e)))?;
    println!("{}", rendered);
    Ok(())
}
