use std::sync::Arc;

use casework_api::auth::{JwksVerifier, TokenVerifier};
use casework_api::config;
use casework_api::identity::{HostedIdentityProvider, IdentityProvider};
use casework_api::routes;
use casework_api::state::AppState;
use casework_api::store::{EntityStore, MemoryStore};

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up PORT, CASEWORK_AUTH_ISSUER, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = config::config().clone();
    tracing::info!(
        issuer = %config.auth.issuer,
        page_size = config.pagination.page_size,
        "starting casework API"
    );

    let store: Arc<dyn EntityStore> = Arc::new(MemoryStore::new());
    let verifier: Arc<dyn TokenVerifier> = Arc::new(JwksVerifier::new(&config.auth));
    let identity: Arc<dyn IdentityProvider> =
        Arc::new(HostedIdentityProvider::new(&config.auth, &config.identity));

    let port = config.server.port;
    let app = routes::app(AppState::new(store, verifier, identity, config));

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    println!("Casework API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}
