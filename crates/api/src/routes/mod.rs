//! HTTP routes

pub mod catalog;
pub mod notifications;
pub mod orders;
pub mod payments;
pub mod subscription;

use axum::{
    middleware,
    routing::{delete, get, post},
    Json, Router,
};
use quickmemo_billing::QuotaDecision;
use quickmemo_shared::ResourceKind;
use uuid::Uuid;

use crate::{auth::require_auth, error::ApiError, state::AppState};

/// Run the quota gate and turn a denial into its HTTP error.
pub(crate) async fn enforce_quota(
    state: &AppState,
    tenant_id: Uuid,
    kind: ResourceKind,
) -> Result<(), ApiError> {
    match state.billing.quota.check(tenant_id, kind).await? {
        QuotaDecision::Allow => Ok(()),
        QuotaDecision::Deny(denial) => Err(ApiError::QuotaDenied(denial)),
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/categories", post(catalog::create_category))
        .route("/products", post(catalog::create_product))
        .route("/products/{id}/image", post(catalog::set_product_image))
        .route("/orders", post(orders::create_order))
        .route("/subscription", get(subscription::get_subscription))
        .route(
            "/invoices/{id}/payments",
            get(payments::list_payments).post(payments::add_payment),
        )
        .route("/payments/{id}", delete(payments::delete_payment))
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/{id}/read", post(notifications::mark_read))
        .route("/notifications/read-all", post(notifications::mark_all_read))
        .route("/notifications/read", delete(notifications::delete_read))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .with_state(state)
}
