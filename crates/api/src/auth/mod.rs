//! Authentication module for the QuickMemo API
//!
//! Validates bearer tokens and resolves the calling tenant. Token issuance
//! lives in the account service; this side only verifies.

pub mod jwt;
pub mod middleware;

pub use jwt::{Claims, JwtManager};
pub use middleware::{require_auth, AuthTenant};
