use std::sync::Arc;

use crate::auth::TokenVerifier;
use crate::config::AppConfig;
use crate::identity::IdentityProvider;
use crate::store::EntityStore;

/// Explicitly constructed dependencies handed to every handler. Nothing in
/// the request path reaches for process-wide state; tests build one of these
/// around an in-memory store and stub collaborators.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EntityStore>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub identity: Arc<dyn IdentityProvider>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn EntityStore>,
        verifier: Arc<dyn TokenVerifier>,
        identity: Arc<dyn IdentityProvider>,
        config: AppConfig,
    ) -> Self {
        Self { store, verifier, identity, config: Arc::new(config) }
    }
}
