//! Notification routes

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use quickmemo_billing::Notification;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{auth::AuthTenant, error::ApiError, state::AppState};

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct NotificationListResponse {
    pub notifications: Vec<Notification>,
    pub unread_count: i64,
}

pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthTenant>,
    Query(query): Query<ListQuery>,
) -> Result<Json<NotificationListResponse>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let notifications = state
        .billing
        .notifications
        .list(auth.tenant_id, limit)
        .await?;
    let unread_count = state
        .billing
        .notifications
        .unread_count(auth.tenant_id)
        .await?;

    Ok(Json(NotificationListResponse {
        notifications,
        unread_count,
    }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthTenant>,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let updated = state
        .billing
        .notifications
        .mark_read(auth.tenant_id, notification_id)
        .await?;

    if !updated {
        return Err(ApiError::NotFound("notification"));
    }
    Ok(Json(serde_json::json!({ "read": true })))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthTenant>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let updated = state
        .billing
        .notifications
        .mark_all_read(auth.tenant_id)
        .await?;
    Ok(Json(serde_json::json!({ "updated": updated })))
}

pub async fn delete_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthTenant>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let deleted = state
        .billing
        .notifications
        .delete_read(auth.tenant_id)
        .await?;
    Ok(Json(serde_json::json!({ "deleted": deleted })))
}
