use std::{path::Path, sync::Arc, time::Duration};

use clap::Parser;
use scim_provisioner::{
    AppState, build_app,
    config::AppConfig,
    db::DbPool,
    models::CreateOrganization,
    observability,
    services::{OrganizationService, ScimTokenService},
};
use tokio_util::task::TaskTracker;

/// Default config path, used when `--config` is not given.
const DEFAULT_CONFIG_PATH: &str = "scim.toml";

/// How long shutdown waits for background tasks before giving up.
const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// CLI arguments for the SCIM provisioning service
#[derive(Parser, Debug)]
#[command(version, about = "SCIM 2.0 provisioning service", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to config file. If the default `scim.toml` does not exist,
    /// built-in defaults are used.
    #[arg(short, long, global = true)]
    config: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Start the SCIM server (default)
    Serve,
    /// Run database migrations and exit
    Migrate,
    /// Manage organizations
    #[command(subcommand)]
    Org(OrgCommand),
    /// Manage SCIM bearer tokens
    #[command(subcommand)]
    Token(TokenCommand),
}

#[derive(clap::Subcommand, Debug)]
enum OrgCommand {
    /// Create an organization and print its id
    Create {
        #[arg(long)]
        name: String,
    },
    /// List organizations
    List,
}

#[derive(clap::Subcommand, Debug)]
enum TokenCommand {
    /// Mint a SCIM bearer token. The token is printed once and never stored.
    Create {
        /// Organization id
        #[arg(long)]
        org: i64,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        expires_in_days: Option<i64>,
    },
    /// List an organization's tokens (prefixes only)
    List {
        #[arg(long)]
        org: i64,
    },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let config = load_config(args.config.as_deref());

    if let Err(e) = observability::init_tracing(&config.observability) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    match args.command {
        Some(Command::Migrate) => run_migrate(&config).await,
        Some(Command::Org(cmd)) => run_org(&config, cmd).await,
        Some(Command::Token(cmd)) => run_token(&config, cmd).await,
        Some(Command::Serve) | None => run_server(config).await,
    }
}

fn load_config(explicit_path: Option<&str>) -> AppConfig {
    let path = explicit_path.unwrap_or(DEFAULT_CONFIG_PATH);

    if explicit_path.is_none() && !Path::new(path).exists() {
        return AppConfig::default();
    }

    match AppConfig::from_file(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config from {path}: {e}");
            std::process::exit(1);
        }
    }
}

async fn run_server(config: AppConfig) {
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        database = %config.database.path,
        "Starting SCIM provisioning service"
    );

    let state = match AppState::new(config.clone()).await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize application state");
            std::process::exit(1);
        }
    };
    let task_tracker = state.task_tracker.clone();

    let app = build_app(&config, state);

    let addr = std::net::SocketAddr::from((config.server.host, config.server.port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "Failed to bind");
            std::process::exit(1);
        }
    };

    tracing::info!(
        %addr,
        scim_base_url = %config.scim_base_url(),
        "Listening"
    );

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(task_tracker))
        .await
    {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

async fn shutdown_signal(task_tracker: TaskTracker) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, waiting for background tasks to complete...");

    // No new tasks after this point
    task_tracker.close();

    match tokio::time::timeout(SHUTDOWN_DRAIN_TIMEOUT, task_tracker.wait()).await {
        Ok(()) => tracing::info!("All background tasks completed"),
        Err(_) => tracing::warn!(
            remaining = task_tracker.len(),
            "Timed out waiting for background tasks"
        ),
    }
}

/// Open the database for a one-shot CLI command, applying migrations so the
/// command works against a fresh file.
async fn open_database(config: &AppConfig) -> Arc<DbPool> {
    let db = match DbPool::from_config(&config.database).await {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Failed to open database {}: {e}", config.database.path);
            std::process::exit(1);
        }
    };

    if config.database.run_migrations
        && let Err(e) = db.run_migrations().await
    {
        eprintln!("Failed to run migrations: {e}");
        std::process::exit(1);
    }

    Arc::new(db)
}

async fn run_migrate(config: &AppConfig) {
    tracing::info!(database = %config.database.path, "Running database migrations");

    let db = match DbPool::from_config(&config.database).await {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Failed to open database {}: {e}", config.database.path);
            std::process::exit(1);
        }
    };

    match db.run_migrations().await {
        Ok(()) => println!("Migrations applied to {}", config.database.path),
        Err(e) => {
            eprintln!("Migration failed: {e}");
            std::process::exit(1);
        }
    }
}

async fn run_org(config: &AppConfig, cmd: OrgCommand) {
    let service = OrganizationService::new(open_database(config).await);

    match cmd {
        OrgCommand::Create { name } => match service.create(CreateOrganization { name }).await {
            Ok(org) => println!("{}", org.id),
            Err(e) => {
                eprintln!("Failed to create organization: {e}");
                std::process::exit(1);
            }
        },
        OrgCommand::List => match service.list().await {
            Ok(orgs) => {
                for org in orgs {
                    println!("{}\t{}\t{}", org.id, org.name, org.created_at.to_rfc3339());
                }
            }
            Err(e) => {
                eprintln!("Failed to list organizations: {e}");
                std::process::exit(1);
            }
        },
    }
}

async fn run_token(config: &AppConfig, cmd: TokenCommand) {
    let task_tracker = TaskTracker::new();
    let service = ScimTokenService::new(open_database(config).await, task_tracker);

    match cmd {
        TokenCommand::Create {
            org,
            description,
            expires_in_days,
        } => match service.create(org, description, expires_in_days).await {
            Ok(created) => {
                println!("{}", created.token);
                eprintln!(
                    "Token {} ({}...) created for organization {}. Store it now; it cannot be shown again.",
                    created.record.id, created.record.token_prefix, created.record.org_id
                );
                eprintln!(
                    "Configure your identity provider with base URL {}",
                    config.scim_base_url()
                );
            }
            Err(e) => {
                eprintln!("Failed to create token: {e}");
                std::process::exit(1);
            }
        },
        TokenCommand::List { org } => match service.list(org).await {
            Ok(tokens) => {
                for token in tokens {
                    let expires = token
                        .expires_at
                        .map(|at| at.to_rfc3339())
                        .unwrap_or_else(|| "never".to_string());
                    let last_used = token
                        .last_used_at
                        .map(|at| at.to_rfc3339())
                        .unwrap_or_else(|| "never".to_string());
                    println!(
                        "{}\t{}...\t{}\texpires={}\tlast_used={}",
                        token.id,
                        token.token_prefix,
                        token.description.as_deref().unwrap_or("-"),
                        expires,
                        last_used
                    );
                }
            }
            Err(e) => {
                eprintln!("Failed to list tokens: {e}");
                std::process::exit(1);
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_default_command_is_serve() {
        let args = Args::try_parse_from(["scim-provisioner"]).unwrap();
        assert!(args.command.is_none());
        assert!(args.config.is_none());
    }

    #[test]
    fn test_token_create_args() {
        let args = Args::try_parse_from([
            "scim-provisioner",
            "--config",
            "/etc/scim.toml",
            "token",
            "create",
            "--org",
            "7",
            "--expires-in-days",
            "90",
        ])
        .unwrap();

        assert_eq!(args.config.as_deref(), Some("/etc/scim.toml"));
        match args.command {
            Some(Command::Token(TokenCommand::Create {
                org,
                description,
                expires_in_days,
            })) => {
                assert_eq!(org, 7);
                assert_eq!(description, None);
                assert_eq!(expires_in_days, Some(90));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
