//! Circuit CLI - Command-line front end for the circuit breaker

use anyhow::Context;
use circuit_core::{
    split_type_urls, AuthorizeRequest, CircuitBreaker, CircuitConfig, GenesisState, ResetRequest,
    TripRequest,
};
use circuit_store::PermissionLevel;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "circuit")]
#[command(about = "Circuit breaker - disable and re-enable message types")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, default_value = "config/circuit.toml")]
    config: PathBuf,

    /// Database path, overriding the configuration file
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Authorize an account to trip the circuit breaker
    ///
    /// Levels: NONE=0, SOME_MSGS=1, ALL_MSGS=2, SUPER_ADMIN=3.
    /// Example: circuit authorize gov guardian SOME_MSGS "bank.Send,bank.MultiSend"
    Authorize {
        /// Signing account
        granter: String,
        /// Account receiving the permission
        grantee: String,
        /// Permission level, by name or code
        permission_level: String,
        /// Comma-separated type urls (SOME_MSGS only, ignored otherwise)
        limit_type_urls: Option<String>,
    },
    /// Disable message types from entering the pipeline
    ///
    /// Example: circuit trip guardian "bank.Send,bank.MultiSend"
    Trip {
        /// Signing account
        authority: String,
        /// Comma-separated type urls
        type_urls: String,
    },
    /// Re-enable previously disabled message types
    Reset {
        /// Signing account
        authority: String,
        /// Comma-separated type urls
        type_urls: String,
    },
    /// Show the permission held by an account
    Permission {
        /// Account to look up
        account: String,
    },
    /// List every account holding a permission
    Accounts,
    /// List every disabled message type
    Disabled,
    /// Run the admission check for a message type
    Check {
        /// Type url to check
        type_url: String,
    },
    /// Print the current state as genesis JSON
    ExportGenesis,
    /// Load genesis JSON into an empty database
    ImportGenesis {
        /// Genesis file path
        file: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let Some(command) = cli.command else {
        println!("Circuit v{} - Use --help for commands", env!("CARGO_PKG_VERSION"));
        return Ok(());
    };

    let config = load_config(&cli.config, cli.db)?;
    let breaker = CircuitBreaker::new(config)?;
    for line in run(&breaker, command)? {
        println!("{}", line);
    }
    breaker.flush()?;

    Ok(())
}

/// Loads the configuration file if it exists, otherwise the defaults.
fn load_config(path: &Path, db: Option<PathBuf>) -> anyhow::Result<CircuitConfig> {
    let mut config = if path.exists() {
        CircuitConfig::load(path)?
    } else {
        debug!("No config at {}, using defaults", path.display());
        CircuitConfig::default()
    };

    if let Some(db_path) = db {
        config.store.db_path = db_path;
    }
    Ok(config)
}

/// Executes one command and returns the lines to print.
fn run(breaker: &CircuitBreaker, command: Commands) -> anyhow::Result<Vec<String>> {
    let lines = match command {
        Commands::Authorize {
            granter,
            grantee,
            permission_level,
            limit_type_urls,
        } => {
            let level: PermissionLevel = permission_level.parse()?;
            // Only SOME_MSGS carries an allow-list; other levels ignore it.
            let type_urls = match limit_type_urls {
                Some(list) if level == PermissionLevel::SomeMsgs => split_type_urls(&list)?,
                _ => Vec::new(),
            };
            let request = AuthorizeRequest::new(granter, grantee, level, type_urls);
            let event = breaker.authorize(&request)?;
            vec![serde_json::to_string_pretty(&event)?]
        }
        Commands::Trip {
            authority,
            type_urls,
        } => {
            let request = TripRequest::new(authority, split_type_urls(&type_urls)?);
            let event = breaker.trip(&request)?;
            vec![serde_json::to_string_pretty(&event)?]
        }
        Commands::Reset {
            authority,
            type_urls,
        } => {
            let request = ResetRequest::new(authority, split_type_urls(&type_urls)?);
            let event = breaker.reset(&request)?;
            vec![serde_json::to_string_pretty(&event)?]
        }
        Commands::Permission { account } => {
            vec![format!("{}: {}", account, breaker.permission(&account)?)]
        }
        Commands::Accounts => breaker
            .accounts()?
            .into_iter()
            .map(|(account, permission)| format!("{}: {}", account, permission))
            .collect(),
        Commands::Disabled => breaker.disabled_list()?,
        Commands::Check { type_url } => {
            breaker.check_admission(&type_url)?;
            vec![format!("{}: admitted", type_url)]
        }
        Commands::ExportGenesis => vec![breaker.export_genesis()?.to_json()?],
        Commands::ImportGenesis { file } => {
            let source = std::fs::read_to_string(&file)
                .with_context(|| format!("reading genesis file {}", file.display()))?;
            let genesis = GenesisState::from_json(&source)?;
            breaker.init_genesis(&genesis)?;
            vec![format!(
                "Imported {} accounts and {} disabled types",
                genesis.accounts.len(),
                genesis.disabled_type_urls.len()
            )]
        }
    };
    Ok(lines)
}
