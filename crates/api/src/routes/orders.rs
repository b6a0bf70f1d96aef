//! Order routes

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use quickmemo_shared::ResourceKind;
use serde::Deserialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{auth::AuthTenant, error::ApiError, routes::enforce_quota, state::AppState};

#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub customer_name: Option<String>,
    pub total: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub order_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub customer_name: Option<String>,
    pub total: f64,
    /// Defaults to now; back-dated orders still count against the month
    /// they fall in.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub order_date: Option<OffsetDateTime>,
}

pub async fn create_order(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthTenant>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    if !req.total.is_finite() || req.total < 0.0 {
        return Err(ApiError::Validation(
            "Order total must be zero or greater.".to_string(),
        ));
    }

    enforce_quota(&state, auth.tenant_id, ResourceKind::Order).await?;

    let order_date = req.order_date.unwrap_or_else(OffsetDateTime::now_utc);
    let order: Order = sqlx::query_as(
        r#"
        INSERT INTO orders (tenant_id, customer_name, total, order_date)
        VALUES ($1, $2, $3, $4)
        RETURNING id, tenant_id, customer_name, total, order_date, created_at
        "#,
    )
    .bind(auth.tenant_id)
    .bind(&req.customer_name)
    .bind(req.total)
    .bind(order_date)
    .fetch_one(&state.pool)
    .await
    .map_err(|e| ApiError::Database(e.to_string()))?;

    Ok((StatusCode::CREATED, Json(order)))
}
