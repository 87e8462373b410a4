use std::sync::Arc;

use notewall_catalog::CatalogClient;
use notewall_protocol::{CookiePolicy, IdentitySigner, SessionManager};
use notewall_state::RateLimiter;

use crate::config::ServerConfig;
use crate::store::MessageStore;

/// Shared handler state. Cloned per request; everything inside is shared.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub limiter: RateLimiter,
    pub store: Arc<dyn MessageStore>,
    pub catalog: Arc<CatalogClient>,
}

impl AppState {
    pub fn new(
        sessions: SessionManager,
        limiter: RateLimiter,
        store: Arc<dyn MessageStore>,
        catalog: CatalogClient,
    ) -> Self {
        Self {
            sessions: Arc::new(sessions),
            limiter,
            store,
            catalog: Arc::new(catalog),
        }
    }

    /// Build every component from configuration. Fails when no signing secret
    /// is configured and the development fallback is disabled.
    pub fn from_config(config: &ServerConfig, store: Arc<dyn MessageStore>) -> anyhow::Result<Self> {
        let signer = IdentitySigner::from_config(&config.signing)?;
        let sessions = SessionManager::new(Arc::new(signer), CookiePolicy::new(config.production));
        let limiter = RateLimiter::new(config.rate_limit.clone());
        let catalog = CatalogClient::new(config.catalog.clone())?;
        Ok(Self::new(sessions, limiter, store, catalog))
    }
}
