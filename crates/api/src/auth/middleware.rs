//! Authentication middleware for Axum

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated tenant, inserted as a request extension.
#[derive(Debug, Clone, Copy)]
pub struct AuthTenant {
    pub tenant_id: Uuid,
}

fn extract_bearer(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Require a valid tenant bearer token; 401 otherwise.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token =
        extract_bearer(&request).ok_or(ApiError::Unauthorized("missing bearer token"))?;
    let tenant_id = state.jwt.verify_tenant(token)?;

    request.extensions_mut().insert(AuthTenant { tenant_id });
    Ok(next.run(request).await)
}
