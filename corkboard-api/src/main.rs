//! # Corkboard API Server
//!
//! Collaborative Kanban service: projects, boards, tasks, comments,
//! notifications, and a WebSocket room layer relaying applied mutations to
//! other clients.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p corkboard-api
//! ```

use corkboard_api::app::{build_router, AppState};
use corkboard_api::config::Config;
use corkboard_shared::db::migrations::run_migrations;
use corkboard_shared::db::pool::{create_pool, DatabaseConfig};
use corkboard_shared::realtime::RedisFanout;
use corkboard_shared::redis::{RedisClient, RedisConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "corkboard_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Corkboard API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let pool = create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;

    run_migrations(&pool).await?;

    // Redis is optional: without it, broadcasts stay instance-local.
    let fanout = match &config.redis_url {
        Some(url) => {
            let client = RedisClient::new(RedisConfig {
                url: url.clone(),
                command_timeout_secs: 10,
            })
            .await?;
            Some(RedisFanout::new(client))
        }
        None => {
            tracing::info!("REDIS_URL not set; room fan-out disabled");
            None
        }
    };

    let state = AppState::new(pool, config.clone(), fanout.clone());

    if let Some(fanout) = fanout {
        let rooms = state.rooms.clone();
        tokio::spawn(fanout.run_subscriber(rooms));
    }

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    tracing::info!("Server listening on http://{}", config.bind_address());

    axum::serve(listener, app).await?;

    Ok(())
}
