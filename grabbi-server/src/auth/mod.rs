//! Identity, admission and authorization

pub mod account;
pub mod jwt;
pub mod policy;
pub mod rate_limit;

pub use jwt::TokenService;
pub use policy::CurrentUser;
pub use rate_limit::RateLimiter;
