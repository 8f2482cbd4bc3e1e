//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor. Holds the ledger and the engine/service
//! values constructed over it; everything is cheap to clone and clones
//! share the same underlying store.

use std::sync::Arc;

use escrowd_core::{Clock, SystemClock};
use escrowd_crypto::OtpIssuer;
use escrowd_engine::{DisputeEngine, Ledger, OrderEngine};

use crate::auth::TokenStore;
use crate::identity::IdentityService;

/// Environment-derived configuration for the API binary.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// TCP port to listen on.
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Binary configuration.
    pub config: AppConfig,
    /// The persistence gateway. Exposed for bootstrap and tests.
    pub ledger: Ledger,
    /// The order lifecycle engine.
    pub orders: OrderEngine,
    /// The dispute resolution engine.
    pub disputes: DisputeEngine,
    /// The identity provider.
    pub identity: IdentityService,
}

impl AppState {
    /// Create state with default configuration and the system clock.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    /// Create state with explicit configuration.
    pub fn with_config(config: AppConfig) -> Self {
        let ledger = Ledger::new();
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let tokens = TokenStore::new();
        Self {
            config,
            orders: OrderEngine::new(ledger.clone(), OtpIssuer::new(), clock.clone()),
            disputes: DisputeEngine::new(ledger.clone(), clock.clone()),
            identity: IdentityService::new(ledger.clone(), tokens, clock),
            ledger,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
