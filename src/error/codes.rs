//! Unified error codes for the marketplace service
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 4xxx: Order errors
//! - 5xxx: Settlement/payment errors
//! - 6xxx: Product/stock errors (65xx: promotion errors)
//! - 7xxx: Payout errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Value out of range
    ValueOutOfRange = 8,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Retailer role required
    RetailerRequired = 2002,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Cart is empty
    CartEmpty = 4002,
    /// Order status transition not allowed
    InvalidStatusTransition = 4003,
    /// Order has already been cancelled
    OrderAlreadyCancelled = 4004,

    // ==================== 5xxx: Settlement ====================
    /// Checkout session creation failed
    PaymentSessionFailed = 5001,
    /// Webhook signature verification failed
    SignatureInvalid = 5002,
    /// Retailer has no charge-enabled destination account
    PaymentAccountIneligible = 5003,

    // ==================== 6xxx: Product ====================
    /// Product not found
    ProductNotFound = 6001,
    /// Product is not active
    ProductInactive = 6002,
    /// Product is out of stock
    ProductOutOfStock = 6003,

    // ==================== 65xx: Promotion ====================
    /// Discount code not found or inactive
    DiscountInvalid = 6501,
    /// Discount code outside its validity window
    DiscountExpired = 6502,
    /// Cart total below the code's minimum purchase
    DiscountMinPurchase = 6503,
    /// Discount code usage limit reached
    DiscountUsageExhausted = 6504,
    /// Points redemption exceeds balance
    PointsInsufficient = 6505,

    // ==================== 7xxx: Payout ====================
    /// Requested payout exceeds available balance
    InsufficientBalance = 7001,
    /// Requested currency is not supported
    CurrencyUnsupported = 7002,
    /// External funds transfer failed
    TransferFailed = 7003,
    /// Payout not found
    PayoutNotFound = 7004,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Network error
    NetworkError = 9003,
    /// Concurrent modification conflict, retry later
    Conflict = 9006,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// System errors (9xxx) get logged at error level on response
    #[inline]
    pub const fn is_system(&self) -> bool {
        self.code() >= 9000
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::ValueOutOfRange => "Value is out of range",

            // Auth
            ErrorCode::NotAuthenticated => "User is not authenticated",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::RetailerRequired => "Retailer role is required",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::CartEmpty => "Cart is empty",
            ErrorCode::InvalidStatusTransition => "Order status transition not allowed",
            ErrorCode::OrderAlreadyCancelled => "Order has already been cancelled",

            // Settlement
            ErrorCode::PaymentSessionFailed => "Checkout session creation failed",
            ErrorCode::SignatureInvalid => "Webhook signature verification failed",
            ErrorCode::PaymentAccountIneligible => "Retailer payment account is not eligible",

            // Product
            ErrorCode::ProductNotFound => "Product not found",
            ErrorCode::ProductInactive => "Product is not active",
            ErrorCode::ProductOutOfStock => "Product is out of stock",

            // Promotion
            ErrorCode::DiscountInvalid => "Discount code is invalid",
            ErrorCode::DiscountExpired => "Discount code has expired",
            ErrorCode::DiscountMinPurchase => "Cart total below minimum purchase for this code",
            ErrorCode::DiscountUsageExhausted => "Discount code usage limit reached",
            ErrorCode::PointsInsufficient => "Not enough points for this redemption",

            // Payout
            ErrorCode::InsufficientBalance => "Requested payout exceeds available balance",
            ErrorCode::CurrencyUnsupported => "Currency is not supported",
            ErrorCode::TransferFailed => "Funds transfer failed",
            ErrorCode::PayoutNotFound => "Payout not found",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::NetworkError => "Network error",
            ErrorCode::Conflict => "Concurrent modification, please retry",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            8 => Ok(ErrorCode::ValueOutOfRange),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),
            2002 => Ok(ErrorCode::RetailerRequired),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::CartEmpty),
            4003 => Ok(ErrorCode::InvalidStatusTransition),
            4004 => Ok(ErrorCode::OrderAlreadyCancelled),

            // Settlement
            5001 => Ok(ErrorCode::PaymentSessionFailed),
            5002 => Ok(ErrorCode::SignatureInvalid),
            5003 => Ok(ErrorCode::PaymentAccountIneligible),

            // Product
            6001 => Ok(ErrorCode::ProductNotFound),
            6002 => Ok(ErrorCode::ProductInactive),
            6003 => Ok(ErrorCode::ProductOutOfStock),

            // Promotion
            6501 => Ok(ErrorCode::DiscountInvalid),
            6502 => Ok(ErrorCode::DiscountExpired),
            6503 => Ok(ErrorCode::DiscountMinPurchase),
            6504 => Ok(ErrorCode::DiscountUsageExhausted),
            6505 => Ok(ErrorCode::PointsInsufficient),

            // Payout
            7001 => Ok(ErrorCode::InsufficientBalance),
            7002 => Ok(ErrorCode::CurrencyUnsupported),
            7003 => Ok(ErrorCode::TransferFailed),
            7004 => Ok(ErrorCode::PayoutNotFound),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::NetworkError),
            9006 => Ok(ErrorCode::Conflict),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::ValidationFailed.code(), 2);
        assert_eq!(ErrorCode::NotAuthenticated.code(), 1001);
        assert_eq!(ErrorCode::PermissionDenied.code(), 2001);
        assert_eq!(ErrorCode::OrderNotFound.code(), 4001);
        assert_eq!(ErrorCode::CartEmpty.code(), 4002);
        assert_eq!(ErrorCode::SignatureInvalid.code(), 5002);
        assert_eq!(ErrorCode::ProductOutOfStock.code(), 6003);
        assert_eq!(ErrorCode::DiscountUsageExhausted.code(), 6504);
        assert_eq!(ErrorCode::InsufficientBalance.code(), 7001);
        assert_eq!(ErrorCode::InternalError.code(), 9001);
        assert_eq!(ErrorCode::Conflict.code(), 9006);
    }

    #[test]
    fn test_is_system() {
        assert!(ErrorCode::InternalError.is_system());
        assert!(ErrorCode::DatabaseError.is_system());
        assert!(!ErrorCode::InsufficientBalance.is_system());
        assert!(!ErrorCode::ValidationFailed.is_system());
    }

    #[test]
    fn test_try_from_roundtrip() {
        let codes = [
            ErrorCode::Success,
            ErrorCode::NotAuthenticated,
            ErrorCode::OrderNotFound,
            ErrorCode::ProductOutOfStock,
            ErrorCode::DiscountExpired,
            ErrorCode::InsufficientBalance,
            ErrorCode::SignatureInvalid,
            ErrorCode::InternalError,
        ];
        for code in codes {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(code));
        }
    }

    #[test]
    fn test_try_from_invalid() {
        assert_eq!(ErrorCode::try_from(999), Err(InvalidErrorCode(999)));
        assert_eq!(ErrorCode::try_from(10000), Err(InvalidErrorCode(10000)));
    }

    #[test]
    fn test_serialize_as_u16() {
        assert_eq!(
            serde_json::to_string(&ErrorCode::InsufficientBalance).unwrap(),
            "7001"
        );
        let code: ErrorCode = serde_json::from_str("6003").unwrap();
        assert_eq!(code, ErrorCode::ProductOutOfStock);
    }
}
