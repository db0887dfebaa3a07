use anyhow::Result;
use tracing::info;

use homeval::config::AppConfig;
use homeval::web;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "homeval=info,tower_http=info".into()),
        )
        .init();

    info!("Loading configuration...");
    let config = AppConfig::load()?;
    info!("Secrets present: {:?}", config.secrets);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let app_state = web::state::AppState::new(config);
    let router = web::create_router(app_state);

    info!("Starting web server at http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {:#}", e);
            }
            info!("Shutting down");
        })
        .await?;

    Ok(())
}
