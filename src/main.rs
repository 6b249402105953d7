use anyhow::Context;
use std::net::SocketAddr;
use vicebank::{api, build_state, open_stores, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = Config::from_env().context("Configuration error")?;
    let port = config.port;

    let stores = open_stores(&config).await?;
    let app = api::create_router(build_state(stores, config.storage));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!(storage = %config.storage, "Server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
