//! Unified error codes for the Grabbi backend
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 3xxx: Franchise errors
//! - 4xxx: Order and cart errors
//! - 6xxx: Product and media errors
//! - 7xxx: Batch job errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// Codes are serialized as `u16` so clients can branch on them without
/// parsing the human-readable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
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
    /// Request body too large
    PayloadTooLarge = 9,
    /// Rate limit exceeded
    TooManyRequests = 10,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Invalid credentials (email/password)
    InvalidCredentials = 1002,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,
    /// Account is blocked
    AccountBlocked = 1007,
    /// Password too short
    PasswordTooShort = 1008,
    /// Password reset token invalid, used or expired
    ResetTokenInvalid = 1009,
    /// Email already registered
    EmailTaken = 1010,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Admin role required
    AdminRequired = 2003,
    /// Franchise membership required
    FranchiseRequired = 2006,
    /// Franchise owner role required
    FranchiseOwnerRequired = 2007,
    /// Resource belongs to another franchise
    FranchiseMismatch = 2008,

    // ==================== 3xxx: Franchise ====================
    /// Franchise not found
    FranchiseNotFound = 3002,
    /// Franchise slug already taken
    FranchiseSlugExists = 3003,
    /// Store hours must cover every day of the week exactly once
    InvalidStoreHours = 3004,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Cart is empty
    CartEmpty = 4007,
    /// Requested status transition is not allowed
    InvalidStatusTransition = 4008,
    /// Not enough stock for an order line
    InsufficientStock = 4009,
    /// Cart mixes items from several franchises
    MixedFranchiseCart = 4010,
    /// Product cannot be ordered right now
    ProductUnavailable = 4011,

    // ==================== 6xxx: Product ====================
    /// Product not found
    ProductNotFound = 6001,
    /// Product has invalid price
    ProductInvalidPrice = 6002,
    /// Product is referenced by historical orders
    ProductReferenced = 6004,
    /// SKU already in use
    SkuExists = 6005,
    /// Barcode already in use
    BarcodeExists = 6006,
    /// Category not found
    CategoryNotFound = 6101,
    /// Image is referenced by historical orders
    ImageReferenced = 6201,
    /// Unsupported upload content type
    UnsupportedMediaType = 6202,
    /// Image fetch or upload failed
    ImageUploadFailed = 6203,

    // ==================== 7xxx: Batch job ====================
    /// Batch job not found
    JobNotFound = 7001,
    /// Batch contains too many rows
    BatchTooLarge = 7002,
    /// Batch contains no rows
    BatchEmpty = 7003,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Object storage error
    StorageError = 9003,
    /// Configuration error
    ConfigError = 9005,
}

impl ErrorCode {
    /// Every defined code, used for `u16` decoding
    pub const ALL: &'static [ErrorCode] = &[
        ErrorCode::Unknown,
        ErrorCode::ValidationFailed,
        ErrorCode::NotFound,
        ErrorCode::AlreadyExists,
        ErrorCode::InvalidRequest,
        ErrorCode::PayloadTooLarge,
        ErrorCode::TooManyRequests,
        ErrorCode::NotAuthenticated,
        ErrorCode::InvalidCredentials,
        ErrorCode::TokenExpired,
        ErrorCode::TokenInvalid,
        ErrorCode::AccountBlocked,
        ErrorCode::PasswordTooShort,
        ErrorCode::ResetTokenInvalid,
        ErrorCode::EmailTaken,
        ErrorCode::PermissionDenied,
        ErrorCode::AdminRequired,
        ErrorCode::FranchiseRequired,
        ErrorCode::FranchiseOwnerRequired,
        ErrorCode::FranchiseMismatch,
        ErrorCode::FranchiseNotFound,
        ErrorCode::FranchiseSlugExists,
        ErrorCode::InvalidStoreHours,
        ErrorCode::OrderNotFound,
        ErrorCode::CartEmpty,
        ErrorCode::InvalidStatusTransition,
        ErrorCode::InsufficientStock,
        ErrorCode::MixedFranchiseCart,
        ErrorCode::ProductUnavailable,
        ErrorCode::ProductNotFound,
        ErrorCode::ProductInvalidPrice,
        ErrorCode::ProductReferenced,
        ErrorCode::SkuExists,
        ErrorCode::BarcodeExists,
        ErrorCode::CategoryNotFound,
        ErrorCode::ImageReferenced,
        ErrorCode::UnsupportedMediaType,
        ErrorCode::ImageUploadFailed,
        ErrorCode::JobNotFound,
        ErrorCode::BatchTooLarge,
        ErrorCode::BatchEmpty,
        ErrorCode::InternalError,
        ErrorCode::DatabaseError,
        ErrorCode::StorageError,
        ErrorCode::ConfigError,
    ];

    /// Numeric value of the code
    #[inline]
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Default human-readable message
    pub fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Unknown => "Unknown error",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::PayloadTooLarge => "Payload too large",
            ErrorCode::TooManyRequests => "Too many requests, try again later",

            // Auth
            ErrorCode::NotAuthenticated => "Authentication required",
            ErrorCode::InvalidCredentials => "Invalid email or password",
            ErrorCode::TokenExpired => "Token expired",
            ErrorCode::TokenInvalid => "Invalid token",
            ErrorCode::AccountBlocked => "Account is blocked",
            ErrorCode::PasswordTooShort => "password must be at least 8 characters",
            ErrorCode::ResetTokenInvalid => "Reset token is invalid or expired",
            ErrorCode::EmailTaken => "email is already registered",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::AdminRequired => "Admin role required",
            ErrorCode::FranchiseRequired => "Franchise membership required",
            ErrorCode::FranchiseOwnerRequired => "Franchise owner role required",
            ErrorCode::FranchiseMismatch => "Resource belongs to another franchise",

            // Franchise
            ErrorCode::FranchiseNotFound => "Franchise not found",
            ErrorCode::FranchiseSlugExists => "Franchise slug already exists",
            ErrorCode::InvalidStoreHours => "Store hours must list each day of the week once",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::CartEmpty => "Cart is empty",
            ErrorCode::InvalidStatusTransition => "Invalid order status transition",
            ErrorCode::InsufficientStock => "Insufficient stock",
            ErrorCode::MixedFranchiseCart => "Cart contains items from several franchises",
            ErrorCode::ProductUnavailable => "Product is not available",

            // Product
            ErrorCode::ProductNotFound => "Product not found",
            ErrorCode::ProductInvalidPrice => "Product has invalid price",
            ErrorCode::ProductReferenced => "Product is referenced by existing orders",
            ErrorCode::SkuExists => "sku already exists",
            ErrorCode::BarcodeExists => "barcode already exists",
            ErrorCode::CategoryNotFound => "Category not found",
            ErrorCode::ImageReferenced => "Image is referenced by existing orders",
            ErrorCode::UnsupportedMediaType => "Unsupported file type",
            ErrorCode::ImageUploadFailed => "Image upload failed",

            // Job
            ErrorCode::JobNotFound => "Job not found",
            ErrorCode::BatchTooLarge => "products must contain at most 5000 items",
            ErrorCode::BatchEmpty => "products must contain at least 1 item",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::StorageError => "Storage error",
            ErrorCode::ConfigError => "Configuration error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
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
        Self::ALL
            .iter()
            .copied()
            .find(|code| code.code() == value)
            .ok_or(InvalidErrorCode(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u16_roundtrip_for_every_code() {
        for code in ErrorCode::ALL {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(*code));
        }
    }

    #[test]
    fn test_unknown_value_rejected() {
        assert_eq!(ErrorCode::try_from(4242), Err(InvalidErrorCode(4242)));
    }

    #[test]
    fn test_display_is_zero_padded() {
        assert_eq!(ErrorCode::NotFound.to_string(), "E0003");
        assert_eq!(ErrorCode::InvalidStatusTransition.to_string(), "E4008");
    }

    #[test]
    fn test_serde_as_number() {
        let json = serde_json::to_string(&ErrorCode::CartEmpty).unwrap();
        assert_eq!(json, "4007");
        let back: ErrorCode = serde_json::from_str("4007").unwrap();
        assert_eq!(back, ErrorCode::CartEmpty);
    }
}
