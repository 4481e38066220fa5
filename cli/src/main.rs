//! relq CLI - Main entry point

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use relq_cli::commands::{self, compile::CompileOptions, run::RunOptions};
use relq_cli::error::CliError;
use relq_cli::output;
use relq_core::config::{CONFIG_FILE, Config, Error as ConfigError};
use relq_core::{Dialect, Where};

/// relq - compile JSON query descriptions into SQL
#[derive(Parser, Debug)]
#[command(name = "relq")]
#[command(author, version, about = "Compile JSON query descriptions into parameterized SQL", long_about = None)]
struct Cli {
    /// Path to config file (default: relq.toml)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log at debug level (overridden by RELQ_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the SQL a query description compiles to
    Compile {
        /// Root entity
        #[arg(short, long)]
        entity: String,

        /// Query description as inline JSON
        #[arg(short, long, conflicts_with = "query_file")]
        query: Option<String>,

        /// Read the query description from a file
        #[arg(long, value_name = "PATH")]
        query_file: Option<PathBuf>,

        /// Override dialect from config
        #[arg(long, value_parser = parse_dialect)]
        dialect: Option<Dialect>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Run a query description against a SQLite database
    Run {
        /// Root entity
        #[arg(short, long)]
        entity: String,

        /// Query description as inline JSON
        #[arg(short, long, conflicts_with = "query_file")]
        query: Option<String>,

        /// Read the query description from a file
        #[arg(long, value_name = "PATH")]
        query_file: Option<PathBuf>,

        /// Override the database file from config
        #[arg(short, long, value_name = "PATH")]
        database: Option<PathBuf>,

        /// Delete the rows matching this filter (JSON) and print them
        #[arg(long, value_name = "WHERE", conflicts_with_all = ["query", "query_file"])]
        delete: Option<String>,
    },

    /// List the declared entities and relations
    Relations {
        /// Only show this entity
        #[arg(short, long)]
        entity: Option<String>,
    },

    /// Validate configuration file
    Check,
}

fn parse_dialect(s: &str) -> Result<Dialect, String> {
    s.parse()
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", output::err_line(&e.to_string()));
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_logging(verbose: bool) {
    let default = if verbose { "relq=debug" } else { "relq=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env("RELQ_LOG")
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
    let config = load_config(cli.config.as_deref())?;
    let config_name = config_path.display().to_string();

    match cli.command {
        Command::Compile {
            entity,
            query,
            query_file,
            dialect,
            json,
        } => {
            let query = commands::read_query(query.as_deref(), query_file.as_deref())?;
            commands::compile::run(
                &config,
                CompileOptions {
                    entity,
                    query,
                    dialect,
                    json,
                },
            )
        }
        Command::Run {
            entity,
            query,
            query_file,
            database,
            delete,
        } => {
            let query = commands::read_query(query.as_deref(), query_file.as_deref())?;
            let delete = delete
                .map(|text| serde_json::from_str::<Where>(&text))
                .transpose()?;
            commands::run::run(
                &config,
                &config_name,
                RunOptions {
                    entity,
                    query,
                    database,
                    delete,
                },
            )
        }
        Command::Relations { entity } => commands::relations::run(&config, entity.as_deref()),
        Command::Check => {
            // The other commands fall back to an empty registry
            if cli.config.is_none() && !config_path.exists() {
                return Err(ConfigError::NotFound(config_path).into());
            }
            commands::check::run(&config, &config_name)
        }
    }
}

/// Load the given config file, or `relq.toml` when present
fn load_config(custom_path: Option<&Path>) -> Result<Config, CliError> {
    match custom_path {
        Some(path) => Config::load_from(path).map_err(Into::into),
        None => match Config::load() {
            Err(ConfigError::NotFound(_)) => {
                tracing::debug!("no {CONFIG_FILE}, using an empty registry");
                Ok(Config::default())
            }
            other => other.map_err(Into::into),
        },
    }
}
