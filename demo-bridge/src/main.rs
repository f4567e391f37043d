use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use oauth2_bridge::{
    BridgeConfig, HttpIdentityProvider, IdentityMapper, MemoryIdentityMapper, SqlxIdentityMapper,
};
use oauth2_bridge_axum::{AuthBridge, bridge_router};

mod handlers;
mod server;

use crate::{
    handlers::{complete, index, session, signin},
    server::{Ports, TlsFiles, spawn_http_server, spawn_https_server},
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // reqwest and axum-server both pull in rustls; pick the provider once
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| "Failed to install default CryptoProvider")?;

    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "{}=debug,oauth2_bridge=debug,oauth2_bridge_axum=debug,tower_http=info",
                    env!("CARGO_CRATE_NAME")
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = BridgeConfig::from_env()?;
    let provider = Arc::new(HttpIdentityProvider::new(config.provider().clone())?);
    let mapper: Arc<dyn IdentityMapper> = match std::env::var("DATABASE_URL") {
        Ok(url) if !url.is_empty() => {
            let mapper = SqlxIdentityMapper::connect(&url).await?;
            mapper.init().await?;
            Arc::new(mapper)
        }
        _ => {
            tracing::warn!("DATABASE_URL not set, users are kept in memory");
            Arc::new(MemoryIdentityMapper::new())
        }
    };
    let bridge = Arc::new(AuthBridge::new(config, provider, mapper)?);

    let app = Router::new()
        .route("/", get(index))
        .route("/auth/complete", get(complete))
        .route("/auth/signin", get(signin))
        .route("/demo/session", post(session))
        .with_state(bridge.clone())
        .merge(bridge_router(bridge));

    let ports = Ports::from_env()?;
    let http_server = spawn_http_server(ports.http, app.clone());
    match (ports.https, TlsFiles::from_env()) {
        (Some(port), Some(tls)) => {
            let https_server = spawn_https_server(port, tls, app).await?;
            let (http, https) = tokio::try_join!(http_server, https_server)?;
            http?;
            https?;
        }
        _ => http_server.await??,
    }
    Ok(())
}
