use internconnect::{AppState, Config, app, config::ChatSync};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("internconnect=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    info!(
        endpoint = %config.http_endpoint,
        live = matches!(config.chat_sync, ChatSync::Subscribe),
        poll_secs = config.poll_interval.as_secs(),
        "starting"
    );

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app(AppState::new(config))).await?;
    Ok(())
}
