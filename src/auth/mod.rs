//! JWT authentication for the API
//!
//! The auth/session system itself is an external collaborator; this module
//! only verifies its tokens and exposes the authenticated identity to
//! handlers as a request extension.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, ErrorCode};
use crate::state::AppState;

/// JWT claims for API authentication
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: i64,
    /// User email
    pub email: String,
    /// Role: "buyer" | "retailer"
    pub role: String,
    /// Retailer ID (retailer accounts only)
    pub retailer_id: Option<i64>,
    /// Expiration (Unix timestamp seconds)
    pub exp: usize,
    /// Issued at (Unix timestamp seconds)
    pub iat: usize,
}

/// Authenticated identity extracted from JWT
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: i64,
    pub email: String,
    pub role: Role,
    pub retailer_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Buyer,
    Retailer,
}

impl Identity {
    /// Retailer-only surfaces: returns the caller's retailer id or denies
    pub fn require_retailer(&self) -> Result<i64, AppError> {
        match (self.role, self.retailer_id) {
            (Role::Retailer, Some(id)) => Ok(id),
            _ => Err(AppError::new(ErrorCode::RetailerRequired)),
        }
    }
}

const JWT_EXPIRY_HOURS: i64 = 24;

/// Create a JWT token (used by the auth collaborator and by tests)
pub fn create_token(
    user_id: i64,
    email: &str,
    role: &str,
    retailer_id: Option<i64>,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now();
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        role: role.to_string(),
        retailer_id,
        exp: (now + chrono::Duration::hours(JWT_EXPIRY_HOURS)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Middleware that extracts and verifies the JWT from the Authorization header
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, Response> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::not_authenticated().into_response())?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::not_authenticated().into_response())?;

    let validation = Validation::default();
    let token_data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::debug!("JWT validation failed: {e}");
        AppError::new(ErrorCode::TokenInvalid).into_response()
    })?;

    let role = match token_data.claims.role.as_str() {
        "retailer" => Role::Retailer,
        _ => Role::Buyer,
    };

    let identity = Identity {
        user_id: token_data.claims.sub,
        email: token_data.claims.email,
        role,
        retailer_id: token_data.claims.retailer_id,
    };

    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_retailer() {
        let retailer = Identity {
            user_id: 1,
            email: "r@example.com".into(),
            role: Role::Retailer,
            retailer_id: Some(77),
        };
        assert_eq!(retailer.require_retailer().unwrap(), 77);

        let buyer = Identity {
            user_id: 2,
            email: "b@example.com".into(),
            role: Role::Buyer,
            retailer_id: None,
        };
        let err = buyer.require_retailer().unwrap_err();
        assert_eq!(err.code, ErrorCode::RetailerRequired);
    }

    #[test]
    fn test_token_roundtrip() {
        let token = create_token(42, "u@example.com", "retailer", Some(7), "test-secret").unwrap();
        let data = jsonwebtoken::decode::<Claims>(
            &token,
            &DecodingKey::from_secret("test-secret".as_bytes()),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(data.claims.sub, 42);
        assert_eq!(data.claims.role, "retailer");
        assert_eq!(data.claims.retailer_id, Some(7));
    }
}
