use anyhow::Context;
use orgdesk_api::app::{build_app, AppServices};
use orgdesk_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    orgdesk_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    if config.uses_insecure_secret() {
        tracing::warn!("JWT_SECRET not set; using insecure dev default");
    }

    let services = AppServices::from_config(&config)
        .await
        .context("failed to initialize storage")?;
    let app = build_app(services);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
