//! wardrobe-server - digital closet and virtual try-on service
//!
//! `serve` runs the HTTP API. `issue-session` and `grant-credits` are
//! operator commands run against the same database: the first mints a
//! session token for a user already identified by the sign-in provider, the
//! second credits a purchase once payment has cleared.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use wardrobe_common::config::{ConfigResolver, WardrobeConfig};

use wardrobe_server::services::{
    CheckoutProvider, CloudinaryClient, FalClient, ImageHost, StripeClient, TryOnModel,
};
use wardrobe_server::workflow::PipelineSettings;
use wardrobe_server::AppState;

#[derive(Parser, Debug)]
#[command(name = "wardrobe-server")]
#[command(about = "Digital closet and virtual try-on service")]
#[command(version)]
struct Args {
    /// Configuration file (overrides WARDROBE_CONFIG and default locations)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Create or refresh a user and print a new session token
    IssueSession {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// Add purchased credits to a user's balance
    GrantCredits {
        #[arg(long)]
        email: String,
        #[arg(long)]
        amount: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = wardrobe_server::logging::init();

    info!(
        "Starting wardrobe-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config = ConfigResolver::new(args.config.clone())
        .load()
        .context("Failed to load configuration")?;
    if let Err(e) = log_level.apply_configured_level(&config.logging.level) {
        warn!("{}", e);
    }

    let db_path = config.database_path();
    info!("Database: {}", db_path.display());
    let pool = wardrobe_common::db::init_database_pool(&db_path).await?;

    match args.command.unwrap_or(Command::Serve { port: None }) {
        Command::Serve { port } => serve(config, pool, port).await,
        Command::IssueSession { email, name } => {
            let user = wardrobe_common::auth::upsert_user(&pool, &email, name.as_deref()).await?;
            let max_age = chrono::Duration::days(config.session.max_age_days);
            let token = wardrobe_common::auth::create_session(&pool, &user.id, max_age).await?;
            info!(user_id = %user.id, "Session issued");
            println!("{}", token);
            Ok(())
        }
        Command::GrantCredits { email, amount } => {
            let user = wardrobe_server::db::users::get_user_by_email(&pool, &email)
                .await?
                .with_context(|| format!("No user with email {}", email))?;
            let balance = wardrobe_server::db::users::add_credits(&pool, &user.id, amount).await?;
            info!(user_id = %user.id, amount, balance, "Credits granted");
            println!("{}", balance);
            Ok(())
        }
    }
}

async fn serve(config: WardrobeConfig, pool: sqlx::SqlitePool, port: Option<u16>) -> Result<()> {
    let purged = wardrobe_common::auth::purge_expired_sessions(&pool).await?;
    if purged > 0 {
        info!("Removed {} expired sessions", purged);
    }

    let fal = FalClient::from_config(&config.fal)?;
    let media = CloudinaryClient::from_config(&config.media)?;
    let stripe = StripeClient::from_config(&config.checkout)?;
    for (service, configured) in [
        ("try-on model", fal.is_configured()),
        ("media host", media.is_configured()),
        ("checkout", stripe.is_configured()),
    ] {
        if !configured {
            warn!("No credentials for {}; its endpoints will return 503", service);
        }
    }

    let state = AppState::new(pool, Arc::new(fal), Arc::new(media), Arc::new(stripe))
        .with_pipeline_settings(PipelineSettings::from(&config.tryon))
        .with_public_base_url(config.checkout.public_base_url.clone());

    let app = wardrobe_server::build_router(state);

    let addr = format!("{}:{}", config.server.host, port.unwrap_or(config.server.port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("wardrobe-server stopped");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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
