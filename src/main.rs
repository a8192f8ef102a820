//! CLI entry point for the Identity Center bearer-credential exchange.
//!
//! Exchanges an external identity token for temporary credentials of the
//! configured bearer role, and offers configuration and token checks.

use std::ffi::OsStr;
use std::io::Read;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use idc_bearer_exchange::{ExchangeConfig, ExchangePipeline, ExchangeRequest, token};
use serde_json::json;
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "idc_bearer_exchange")]
#[command(about = "Exchange an external identity token for scoped AWS credentials", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Exchange an identity token for temporary bearer-role credentials
    Exchange {
        /// External identity token (prefer the ID_TOKEN variable over the command line)
        #[arg(long, env = "ID_TOKEN", hide_env_values = true)]
        id_token: Option<String>,

        /// Path to a JSON request document, or "-" for stdin. Takes precedence over --id-token
        #[arg(short, long, value_name = "FILE")]
        request: Option<String>,
    },
    /// Validate configuration and print the resolved settings
    CheckConfig,
    /// Report whether a token is structurally valid and list its field names
    InspectToken {
        /// Token to inspect, or "-" to read it from stdin
        #[arg(value_name = "TOKEN")]
        token: String,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file. stdout is reserved
    // for response documents.
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/idc_bearer_exchange.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("idc_bearer_exchange.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Exchange { id_token, request } => {
            let config = ExchangeConfig::from_env()?;
            info!(region = %config.region, role_arn = %config.bearer_role_arn, "Configuration loaded");
            let pipeline = ExchangePipeline::from_config(config).await;

            let response = match (request, id_token) {
                (Some(source), _) => {
                    let raw = read_source(&source)?;
                    pipeline.handle_json(&raw).await
                }
                (None, Some(id_token)) => pipeline.handle(&ExchangeRequest::new(id_token)).await,
                (None, None) => anyhow::bail!("either --id-token (or ID_TOKEN) or --request is required"),
            };

            println!("{}", response.to_json()?);
            if !response.is_success() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::CheckConfig => {
            let config = ExchangeConfig::from_env()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::InspectToken { token: source } => {
            let raw = if source == "-" {
                read_source("-")?
            } else {
                source
            };
            let raw = raw.trim();

            // Names only: claim values may identify the caller.
            let (valid, report) = match token::decode(raw) {
                Ok(decoded) => (
                    true,
                    json!({
                        "valid": true,
                        "header": decoded.header_names().collect::<Vec<_>>(),
                        "claims": decoded.claim_names().collect::<Vec<_>>(),
                    }),
                ),
                Err(e) => (
                    false,
                    json!({
                        "valid": false,
                        "reason": e.to_string(),
                    }),
                ),
            };

            println!("{}", serde_json::to_string_pretty(&report)?);
            if !valid {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Reads a request document from a file path, or from stdin for `-`.
fn read_source(source: &str) -> Result<String> {
    if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(source).with_context(|| format!("failed to read '{source}'"))
    }
}
