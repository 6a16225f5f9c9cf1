// Crewbase server entry point: bootstrap, CLI commands, and initialization.
// Handlers, routes, and business logic live in the library modules.

pub use crewbase_server::*;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use crewbase_core::{config::AppConfig, db::Database, user::UserStore};
use crewbase_server::utils::db::run_migrations;
use dotenvy::{Error as DotenvError, dotenv};
use std::path::{Path, PathBuf};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Crewbase server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP server
    Serve,
    /// Run database migrations
    Migrate,
    /// Register a user with a default workspace
    CreateUser {
        /// Email for the new user
        email: String,
        /// Display name for the new user
        name: String,
        /// Password for the new user
        password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_status = load_env_file();
    init_tracing();
    report_env_status(&env_status);

    let cli = Cli::parse();
    let config = AppConfig::load()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => run_serve(config).await,
        Command::Migrate => run_migrate(config).await,
        Command::CreateUser {
            email,
            name,
            password,
        } => run_create_user(config, email, name, password).await,
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

async fn run_serve(config: AppConfig) -> anyhow::Result<()> {
    info!(
        database_path = %config.database_path,
        database_max_connections = config.database_max_connections,
        "starting server"
    );

    let database = Database::connect(&config).await?;
    run_migrations(database.pool()).await?;
    let state = build_state(&database);

    let app = router::build_router(state);

    let listener = TcpListener::bind(config.bind_address)
        .await
        .context("failed to bind socket")?;
    let actual_addr = listener
        .local_addr()
        .context("failed to read local address")?;

    info!("listening on {actual_addr}");

    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(?err, "server terminated with error");
    }

    Ok(())
}

async fn run_migrate(config: AppConfig) -> anyhow::Result<()> {
    let database = Database::connect(&config).await?;
    run_migrations(database.pool()).await?;
    info!("migrations completed");
    Ok(())
}

async fn run_create_user(
    config: AppConfig,
    email: String,
    name: String,
    password: String,
) -> anyhow::Result<()> {
    if email.trim().is_empty() {
        bail!("email must not be empty");
    }
    if name.trim().is_empty() {
        bail!("name must not be empty");
    }
    if password.is_empty() {
        bail!("password must not be empty");
    }

    let database = Database::connect(&config).await?;
    run_migrations(database.pool()).await?;
    let state = build_state(&database);

    let registered = state
        .identity_service
        .register_user(&email, &name, &password)
        .await
        .map_err(|err| anyhow::anyhow!("failed to register user: {err}"))?;

    let user_store = UserStore::new(&database);
    let user = user_store
        .find_by_id(&registered.user_id)
        .await?
        .context("registered user not found")?;

    info!(user_id = %user.id, workspace_id = %registered.workspace_id, "created user");
    println!(
        "Created user '{}' ({}) with workspace {}",
        user.email, user.id, registered.workspace_id
    );

    Ok(())
}

enum EnvLoadStatus {
    Loaded(PathBuf),
    NotFound,
    Failed(DotenvError),
}

fn load_env_file() -> EnvLoadStatus {
    match dotenv() {
        Ok(path) => {
            let display_path = make_relative(&path).unwrap_or(path);
            EnvLoadStatus::Loaded(display_path)
        }
        Err(DotenvError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
            EnvLoadStatus::NotFound
        }
        Err(err) => EnvLoadStatus::Failed(err),
    }
}

fn report_env_status(status: &EnvLoadStatus) {
    match status {
        EnvLoadStatus::Loaded(path) => {
            info!("Loaded environment variables from {}", path.display());
        }
        EnvLoadStatus::NotFound => {
            info!("No .env file found; using process environment only");
        }
        EnvLoadStatus::Failed(err) => {
            warn!("Failed to load .env file: {err:?}");
        }
    }
}

fn make_relative(path: &Path) -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    path.strip_prefix(&cwd).map(|p| p.to_path_buf()).ok()
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        let mut int = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");

        tokio::select! {
            _ = term.recv() => {},
            _ = int.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
