use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wiki_server::config::AppConfig;
use wiki_server::cooldown::Cooldown;
use wiki_server::state::AppState;
use wiki_server::{build_router, database, seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wiki_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load config")?;

    let db = database::init_db(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to initialize database")?;
    seed::seed_role_permissions(&db)
        .await
        .context("Failed to seed roles")?;
    seed::ensure_indexes(&db)
        .await
        .context("Failed to create indexes")?;
    info!("Database ready");

    let cooldown = Cooldown::new();
    // Runs until process exit.
    let _cleanup_handle =
        cooldown.spawn_cleanup_task(Duration::from_secs(config.cooldown.cleanup_interval_secs));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server.host / server.port")?;

    let app = build_router(AppState {
        db,
        config,
        cooldown,
    });

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
