// Test code patterns:
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! QuickMemo API Library
//!
//! This crate contains the API server components for QuickMemo: tenant
//! authentication, the quota-gated shop endpoints, invoice payments, and
//! notifications.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use state::AppState;
