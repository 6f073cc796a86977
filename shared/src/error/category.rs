//! Error category classification

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Error category classification based on error code ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// General errors (0xxx)
    General,
    /// Authentication errors (1xxx)
    Auth,
    /// Permission errors (2xxx)
    Permission,
    /// Franchise errors (3xxx)
    Franchise,
    /// Order and cart errors (4xxx)
    Order,
    /// Product and media errors (6xxx)
    Product,
    /// Batch job errors (7xxx)
    Job,
    /// System errors (9xxx)
    System,
}

impl ErrorCategory {
    /// Determine category from error code value
    pub fn from_code(code: u16) -> Self {
        match code {
            0..1000 => Self::General,
            1000..2000 => Self::Auth,
            2000..3000 => Self::Permission,
            3000..4000 => Self::Franchise,
            4000..6000 => Self::Order,
            6000..7000 => Self::Product,
            7000..8000 => Self::Job,
            _ => Self::System,
        }
    }
}

impl ErrorCode {
    /// Category of this code
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_ranges() {
        assert_eq!(ErrorCode::ValidationFailed.category(), ErrorCategory::General);
        assert_eq!(ErrorCode::TokenExpired.category(), ErrorCategory::Auth);
        assert_eq!(ErrorCode::FranchiseMismatch.category(), ErrorCategory::Permission);
        assert_eq!(ErrorCode::FranchiseNotFound.category(), ErrorCategory::Franchise);
        assert_eq!(ErrorCode::InvalidStatusTransition.category(), ErrorCategory::Order);
        assert_eq!(ErrorCode::ProductReferenced.category(), ErrorCategory::Product);
        assert_eq!(ErrorCode::JobNotFound.category(), ErrorCategory::Job);
        assert_eq!(ErrorCode::DatabaseError.category(), ErrorCategory::System);
    }
}
