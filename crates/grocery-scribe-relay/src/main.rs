//! Grocery-scribe relay: server-side extraction endpoint.
//!
//! Exposes the extraction contract over `POST /api/grocery-list` for clients
//! that must not embed model credentials. The handler reuses the core
//! extraction client, so the relayed and direct paths behave identically.

mod routes;
#[cfg(test)]
mod tests;

use crate::routes::{AppState, router};

use std::net::SocketAddr;

use grocery_scribe_core::extraction::{DirectConfig, DirectTransport, ItemExtractor};
use tracing::{error, info, warn};

const DEFAULT_BIND_ADDR: ([u8; 4], u16) = ([0, 0, 0, 0], 8787);

/// Relay configuration, built once from the environment in `main` and
/// passed down explicitly — no ambient lookups past this point.
struct RelayEnv {
    bind_addr: SocketAddr,
    api_key: String,
    model: Option<String>,
}

impl RelayEnv {
    fn from_env() -> Self {
        let bind_addr = std::env::var("RELAY_BIND_ADDR")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(DEFAULT_BIND_ADDR));

        Self {
            bind_addr,
            api_key: std::env::var("EXTRACTION_API_KEY").unwrap_or_default(),
            model: std::env::var("EXTRACTION_MODEL").ok(),
        }
    }

    /// Build the shared extractor. A missing API key leaves the service
    /// running but answering with a configuration error, mirroring the
    /// direct transport's `MissingCredentials`.
    fn extractor(&self) -> Option<ItemExtractor> {
        let mut config = DirectConfig::new(self.api_key.clone());
        if let Some(model) = &self.model {
            config = config.with_model(model.clone());
        }

        match DirectTransport::new(config) {
            Ok(transport) => Some(ItemExtractor::new(Box::new(transport))),
            Err(e) => {
                error!(error = ?e, "EXTRACTION_API_KEY is not set; requests will fail");
                None
            }
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter("grocery_scribe_relay=debug")
        .init();

    let env = RelayEnv::from_env();
    let extractor = env.extractor();
    if extractor.is_some() {
        info!("Extraction service configured");
    } else {
        warn!("Serving without extraction credentials");
    }

    let app = router(AppState::new(extractor));

    let listener = match tokio::net::TcpListener::bind(env.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = %env.bind_addr, error = %e, "Failed to bind");
            std::process::exit(1);
        }
    };

    info!(addr = %env.bind_addr, "Relay listening");

    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
