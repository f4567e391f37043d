use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use std::{net::SocketAddr, path::PathBuf};
use tokio::task::JoinHandle;

#[derive(Clone, Copy)]
pub(crate) struct Ports {
    pub(crate) http: u16,
    pub(crate) https: Option<u16>,
}

impl Ports {
    pub(crate) fn from_env() -> Result<Self, String> {
        let port = |key: &str, default: Option<u16>| match std::env::var(key) {
            Ok(v) => v
                .parse::<u16>()
                .map(Some)
                .map_err(|e| format!("Invalid {key}: {e}")),
            Err(_) => Ok(default),
        };
        Ok(Self {
            http: port("PORT", Some(3001))?.unwrap_or(3001),
            https: port("HTTPS_PORT", Some(3443))?,
        })
    }
}

pub(crate) struct TlsFiles {
    cert: PathBuf,
    key: PathBuf,
}

impl TlsFiles {
    /// Both `TLS_CERT_PATH` and `TLS_KEY_PATH` must be set to serve HTTPS.
    pub(crate) fn from_env() -> Option<Self> {
        Some(Self {
            cert: std::env::var("TLS_CERT_PATH").ok()?.into(),
            key: std::env::var("TLS_KEY_PATH").ok()?.into(),
        })
    }
}

pub(crate) fn spawn_http_server(port: u16, app: Router) -> JoinHandle<std::io::Result<()>> {
    tokio::spawn(async move {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        tracing::info!("HTTP server listening on {}", addr);
        axum_server::bind(addr).serve(app.into_make_service()).await
    })
}

pub(crate) async fn spawn_https_server(
    port: u16,
    tls: TlsFiles,
    app: Router,
) -> std::io::Result<JoinHandle<std::io::Result<()>>> {
    let config = RustlsConfig::from_pem_file(tls.cert, tls.key).await?;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("HTTPS server listening on {}", addr);
    Ok(tokio::spawn(async move {
        axum_server::bind_rustls(addr, config)
            .serve(app.into_make_service())
            .await
    }))
}
