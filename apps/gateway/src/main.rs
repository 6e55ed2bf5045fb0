//! SMS relay gateway: receives carrier webhooks, bridges each message to a
//! Direct Line bot conversation, and answers with TwiML.

use std::sync::Arc;

use anyhow::Result;
use smsrelay_gateway::config::RelayConfig;
use smsrelay_gateway::http::build_router;
use smsrelay_gateway::relay::Relay;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = RelayConfig::from_env()?;
    let bind = config.bind;
    let relay = Arc::new(Relay::new(config, smsrelay_session::shared_memory_store()));
    let router = build_router(relay);

    let listener = TcpListener::bind(bind).await?;
    info!("smsrelay-gateway listening on {bind}");
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;
    Ok(())
}
