//! Application state

use std::sync::Arc;

use quickmemo_billing::BillingService;
use sqlx::PgPool;

use crate::{auth::JwtManager, config::Config};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub jwt: JwtManager,
    pub billing: Arc<BillingService>,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        let jwt = JwtManager::new(&config.jwt_secret);
        let billing = Arc::new(BillingService::new(pool.clone()));
        tracing::info!("Billing service initialized");

        Self {
            pool,
            config,
            jwt,
            billing,
        }
    }
}
