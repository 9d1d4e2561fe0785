//! restql command-line compiler
//!
//! Compiles a query string for a table and prints the SQL and bind values as JSON.

use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use restql::common::config::RestqlConfig;
use restql::common::types::ApiError;
use restql::query::{validate_ddl_identifier, ParseOptions};
use restql::Restql;

#[derive(Parser, Debug)]
#[command(name = "restql")]
#[command(about = "PostgREST-style query string to SQL compiler", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "restql.toml", env = "RESTQL_CONFIG")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a query string into SQL
    Compile {
        /// Target table
        #[arg(short, long)]
        table: String,

        /// Query string, e.g. "select=id,name&status=eq.active&limit=10"
        query: String,

        /// Skip the total-results quota
        #[arg(long)]
        bypass_quota: bool,
    },
    /// Check a name against the DDL identifier rules
    Validate {
        name: String,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    // Load configuration
    let config: RestqlConfig = if args.config.exists() {
        let content = std::fs::read_to_string(&args.config)?;
        toml::from_str(&content)?
    } else {
        RestqlConfig::default()
    };

    // Initialize logging; stdout is reserved for results
    let level = args.log_level.as_deref().unwrap_or(&config.logging.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    if config.logging.json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }

    debug!("restql v{}", env!("CARGO_PKG_VERSION"));
    if !args.config.exists() {
        info!(path = %args.config.display(), "config file not found, using defaults");
    }

    let (outcome, details) = match args.command {
        Command::Compile {
            table,
            query,
            bypass_quota,
        } => {
            let outcome = Restql::new(config).and_then(|compiler| {
                let options = ParseOptions {
                    bypass_max_total_results: bypass_quota,
                };
                let compiled = compiler.compile(&table, &query, options)?;
                Ok(serde_json::to_value(compiled)?)
            });
            (outcome, json!({ "table": table, "query": query }))
        }
        Command::Validate { name } => (
            validate_ddl_identifier(&name).map(|()| json!({ "name": name, "valid": true })),
            json!({ "name": name }),
        ),
    };

    match outcome {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::error!("{}", e);
            let body = ApiError::from(&e).with_details(details);
            println!("{}", serde_json::to_string_pretty(&body)?);
            Ok(ExitCode::FAILURE)
        }
    }
}
