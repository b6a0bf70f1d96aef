//! Subscription status route
//!
//! The dashboard's "your plan" panel: the latest subscription row, its plan
//! limits, and live usage so the UI can render "X of Y used".

use axum::{
    extract::{Extension, State},
    Json,
};
use quickmemo_billing::UsageCounts;
use quickmemo_shared::Limit;
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{auth::AuthTenant, error::ApiError, state::AppState};

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    status: String,
    start_date: OffsetDateTime,
    end_date: OffsetDateTime,
    grace_period_end: Option<OffsetDateTime>,
    plan_name: String,
    max_categories: i32,
    max_products: i32,
    max_orders_per_month: i32,
    can_upload_images: bool,
}

#[derive(Debug, Serialize)]
pub struct PlanLimitsInfo {
    pub max_categories: Limit,
    pub max_products: Limit,
    pub max_orders_per_month: Limit,
    pub can_upload_images: bool,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionInfo {
    pub id: Uuid,
    pub status: String,
    pub plan: String,
    #[serde(with = "time::serde::rfc3339")]
    pub start_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub grace_period_end: Option<OffsetDateTime>,
    pub limits: PlanLimitsInfo,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionStatusResponse {
    pub subscription: Option<SubscriptionInfo>,
    pub usage: UsageCounts,
}

pub async fn get_subscription(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthTenant>,
) -> Result<Json<SubscriptionStatusResponse>, ApiError> {
    let row: Option<SubscriptionRow> = sqlx::query_as(
        r#"
        SELECT
            s.id,
            s.status,
            s.start_date,
            s.end_date,
            s.grace_period_end,
            p.name AS plan_name,
            p.max_categories,
            p.max_products,
            p.max_orders_per_month,
            p.can_upload_images
        FROM subscriptions s
        JOIN subscription_plans p ON p.id = s.plan_id
        WHERE s.tenant_id = $1
        ORDER BY s.created_at DESC
        LIMIT 1
        "#,
    )
    .bind(auth.tenant_id)
    .fetch_optional(&state.pool)
    .await
    .map_err(|e| ApiError::Database(e.to_string()))?;

    let usage = state.billing.usage.count(auth.tenant_id).await?;

    let subscription = row.map(|r| SubscriptionInfo {
        id: r.id,
        status: r.status,
        plan: r.plan_name,
        start_date: r.start_date,
        end_date: r.end_date,
        grace_period_end: r.grace_period_end,
        limits: PlanLimitsInfo {
            max_categories: Limit::from_raw(r.max_categories),
            max_products: Limit::from_raw(r.max_products),
            max_orders_per_month: Limit::from_raw(r.max_orders_per_month),
            can_upload_images: r.can_upload_images,
        },
    });

    Ok(Json(SubscriptionStatusResponse { subscription, usage }))
}
