// =============================================================================
// Application State
// =============================================================================
//
// Shared across handlers via `Arc<AppState>`. Holds no per-request data: the
// market service owns the gateway and its guard, the auth service owns the
// injected credential store and the token issuer.
// =============================================================================

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::auth::{AuthService, CredentialStore, InMemoryCredentialStore, TokenIssuer};
use crate::config::ServiceConfig;
use crate::exchange::{ExchangeGateway, GatewayGuard};
use crate::market_data::MarketService;

pub struct AppState {
    pub config: ServiceConfig,
    pub market: MarketService,
    pub auth: AuthService,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Wire the services together with an in-memory account store.
    pub fn new(config: ServiceConfig, gateway: Arc<dyn ExchangeGateway>) -> Self {
        Self::with_store(config, gateway, Arc::new(InMemoryCredentialStore::new()))
    }

    pub fn with_store(
        config: ServiceConfig,
        gateway: Arc<dyn ExchangeGateway>,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        let guard = Arc::new(GatewayGuard::new(&config.gateway));
        let market = MarketService::new(gateway, guard, &config);

        let secret = match config.token_secret.as_deref() {
            Some(secret) if !secret.is_empty() => secret.to_string(),
            _ => {
                warn!("no token secret configured; generated an ephemeral one, tokens will not survive a restart");
                format!(
                    "{}{}",
                    uuid::Uuid::new_v4().simple(),
                    uuid::Uuid::new_v4().simple()
                )
            }
        };
        let auth = AuthService::new(store, TokenIssuer::new(secret, config.token_ttl_secs));

        Self {
            config,
            market,
            auth,
            started_at: Utc::now(),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("bind_addr", &self.config.bind_addr)
            .field("auth", &self.auth)
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}
