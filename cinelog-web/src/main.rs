//! cinelog - movie catalog service
//!
//! `serve` runs the HTTP service; `initdb`, `forge` and `admin` prepare the
//! database from the command line.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use cinelog_common::auth::hash_password;
use cinelog_common::config::{ServiceConfig, TomlConfig};
use cinelog_common::db::{self, users};
use cinelog_common::seed;
use cinelog_web::{build_router, AppState};
use clap::{Parser, Subcommand};
use dialoguer::Password;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "cinelog")]
#[command(about = "Movie and actor catalog with box-office analytics")]
#[command(version)]
struct Args {
    /// Folder holding cinelog.db
    #[arg(short, long, env = "CINELOG_ROOT_FOLDER", global = true)]
    root_folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the web service
    Serve {
        /// Address to bind
        #[arg(short, long)]
        bind: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Create the database schema
    Initdb {
        /// Drop all tables first
        #[arg(long)]
        drop: bool,
    },
    /// Fill the database with the bundled sample catalog
    Forge,
    /// Create the admin account, or reset its credentials
    Admin {
        #[arg(long)]
        username: String,

        /// Prompted for (hidden, with confirmation) when not given
        #[arg(long, env = "CINELOG_ADMIN_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
}

fn init_tracing(log_level: &str) {
    let default_filter = format!(
        "cinelog={level},cinelog_web={level},cinelog_common={level},tower_http={level}",
        level = log_level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let toml = TomlConfig::load();

    let (cli_bind, cli_port) = match &args.command {
        Command::Serve { bind, port } => (bind.as_deref(), *port),
        _ => (None, None),
    };
    let config = ServiceConfig::resolve(args.root_folder.as_deref(), cli_bind, cli_port, &toml);

    init_tracing(&config.log_level);

    config
        .ensure_root_folder()
        .context("Failed to create root folder")?;
    let db_path = config.database_path();
    info!("Database path: {}", db_path.display());

    let pool = db::init_database(&db_path)
        .await
        .context("Failed to open database")?;

    match args.command {
        Command::Serve { .. } => serve(pool, &config).await,
        Command::Initdb { drop } => {
            if drop {
                db::drop_schema(&pool).await?;
                db::create_schema(&pool).await?;
            }
            println!("Initialized database.");
            Ok(())
        }
        Command::Forge => {
            let data = seed::bundled()?;
            seed::forge(&pool, &data).await?;
            println!("Done.");
            Ok(())
        }
        Command::Admin { username, password } => {
            let password = admin_password(password)?;
            let hash = hash_password(&password);
            match users::first_user(&pool).await? {
                Some(user) => {
                    println!("Updating user...");
                    users::update_credentials(&pool, user.id, &username, &hash).await?;
                }
                None => {
                    println!("Creating user...");
                    users::insert_user(&pool, Some("Admin"), Some(&username), Some(&hash)).await?;
                }
            }
            println!("Done.");
            Ok(())
        }
    }
}

/// Password from the command line or environment, else an interactive prompt
fn admin_password(given: Option<String>) -> Result<String> {
    let password = match given {
        Some(password) => password,
        None => Password::new()
            .with_prompt("Password")
            .with_confirmation("Repeat password", "Passwords do not match")
            .interact()
            .context("Failed to read password")?,
    };
    if password.is_empty() {
        bail!("Password must not be empty");
    }
    Ok(password)
}

async fn serve(pool: sqlx::SqlitePool, config: &ServiceConfig) -> Result<()> {
    info!(
        "Starting cinelog v{} (root folder {})",
        env!("CARGO_PKG_VERSION"),
        config.root_folder.display()
    );

    if users::first_user(&pool).await?.is_none() {
        info!("No account yet; run `cinelog admin` to enable editing");
    }

    let state = AppState::new(pool, config.session_timeout_secs);
    let app = build_router(state);

    let addr = format!("{}:{}", config.bind, config.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            return Err(e).context("Failed to bind to address");
        }
    };
    info!("cinelog listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_password_from_flag() {
        let args =
            Args::try_parse_from(["cinelog", "admin", "--username", "u", "--password", "p"]).unwrap();
        let Command::Admin { username, password } = args.command else {
            panic!("expected admin command");
        };
        assert_eq!(username, "u");
        assert_eq!(admin_password(password).unwrap(), "p");
    }

    #[test]
    fn test_empty_admin_password_rejected() {
        assert!(admin_password(Some(String::new())).is_err());
    }
}
