mod admin;
mod app;
mod bootstrap;
mod db;
mod error;
mod routes;
mod services;
mod state;
#[cfg(test)]
mod testing;

use crate::admin::templates::AdminTemplates;
use crate::bootstrap::config::AppConfig;
use crate::state::AppState;
use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use sea_orm::Database;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "tokendesk")]
#[command(about = "API token administration service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Create an account, e.g. the first staff user
    CreateUser {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Grant access to the admin panel
        #[arg(long)]
        staff: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    let db = Database::connect(&config.db_url)
        .await
        .with_context(|| format!("failed to connect to {}", config.db_url))?;
    db::initialize::initial(&db)
        .await
        .context("failed to run migrations")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let templates = AdminTemplates::new().context("failed to load admin templates")?;
            serve(AppState {
                db,
                config,
                templates,
            })
            .await
        }
        Command::CreateUser {
            username,
            email,
            password,
            staff,
        } => {
            let user =
                services::auth::staff::create_account(&db, &username, &email, &password, staff)
                    .await
                    .map_err(|e| anyhow::anyhow!("failed to create user: {e}"))?;
            println!("created user {} ({})", user.username, user.id);
            Ok(())
        }
    }
}

async fn serve(state: AppState) -> anyhow::Result<()> {
    let addr = state.config.addr;
    let app = app::axum_app(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("tokendesk listening on http://{addr}/admin/");
    axum::serve(listener, app)
        .await
        .context("server error")?;
    Ok(())
}
