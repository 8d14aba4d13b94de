//! Application state

use sqlx::PgPool;

use crate::config::Config;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Payment processor credentials and endpoints
#[derive(Clone)]
pub struct PspKeys {
    pub secret_key: String,
    pub webhook_secret: String,
    pub api_base: String,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool
    pub pool: PgPool,
    /// JWT secret for API authentication
    pub jwt_secret: String,
    /// Payment processor access
    pub psp: PspKeys,
    /// URL to redirect after successful hosted checkout
    pub checkout_success_url: String,
    /// URL to redirect after cancelled hosted checkout
    pub checkout_cancel_url: String,
}

impl AppState {
    /// Create a new AppState
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let pool = PgPool::connect(&config.database_url).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self {
            pool,
            jwt_secret: config.jwt_secret.clone(),
            psp: PspKeys {
                secret_key: config.psp_secret_key.clone(),
                webhook_secret: config.psp_webhook_secret.clone(),
                api_base: config.psp_api_base.clone(),
            },
            checkout_success_url: config.checkout_success_url.clone(),
            checkout_cancel_url: config.checkout_cancel_url.clone(),
        })
    }
}
