//! Service configuration

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Service configuration, loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// HTTP port
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// JWT secret for API authentication
    pub jwt_secret: String,
    /// Payment processor secret key
    pub psp_secret_key: String,
    /// Payment processor webhook signing secret
    pub psp_webhook_secret: String,
    /// Payment processor API base URL
    pub psp_api_base: String,
    /// URL to redirect after a successful hosted checkout
    pub checkout_success_url: String,
    /// URL to redirect after a cancelled hosted checkout
    pub checkout_cancel_url: String,
    /// Seconds between settlement reconciliation sweeps
    pub reconcile_interval_secs: u64,
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            jwt_secret: Self::require_secret("JWT_SECRET", &environment)?,
            psp_secret_key: Self::require_secret("PSP_SECRET_KEY", &environment)?,
            psp_webhook_secret: Self::require_secret("PSP_WEBHOOK_SECRET", &environment)?,
            psp_api_base: std::env::var("PSP_API_BASE")
                .unwrap_or_else(|_| "https://api.stripe.com".into()),
            checkout_success_url: std::env::var("CHECKOUT_SUCCESS_URL")
                .unwrap_or_else(|_| "https://reefmarket.app/checkout/success".into()),
            checkout_cancel_url: std::env::var("CHECKOUT_CANCEL_URL")
                .unwrap_or_else(|_| "https://reefmarket.app/checkout/cancel".into()),
            reconcile_interval_secs: std::env::var("RECONCILE_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
            environment,
        })
    }
}
