//! Shared types for the Grabbi backend
//!
//! Domain models, the unified error system and small helpers used by the
//! server crate and its tests.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use axum::{Json, body};
pub use http;
pub use serde::{Deserialize, Serialize};
