//! Category and product routes
//!
//! Creates are quota-gated: the gate decides before any row is written, and
//! a denial surfaces as 403 with the denial code and numbers.

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use quickmemo_shared::ResourceKind;
use serde::Deserialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{auth::AuthTenant, error::ApiError, routes::enforce_quota, state::AppState};

#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub price: f64,
    pub image_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
}

pub async fn create_category(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthTenant>,
    Json(req): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("Category name is required.".to_string()));
    }

    enforce_quota(&state, auth.tenant_id, ResourceKind::Category).await?;

    let category: Category = sqlx::query_as(
        r#"
        INSERT INTO categories (tenant_id, name)
        VALUES ($1, $2)
        RETURNING id, tenant_id, name, created_at
        "#,
    )
    .bind(auth.tenant_id)
    .bind(name)
    .fetch_one(&state.pool)
    .await
    .map_err(|e| ApiError::Database(e.to_string()))?;

    Ok((StatusCode::CREATED, Json(category)))
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub price: f64,
    pub category_id: Option<Uuid>,
}

pub async fn create_product(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthTenant>,
    Json(req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("Product name is required.".to_string()));
    }
    if !req.price.is_finite() || req.price < 0.0 {
        return Err(ApiError::Validation(
            "Product price must be zero or greater.".to_string(),
        ));
    }

    enforce_quota(&state, auth.tenant_id, ResourceKind::Product).await?;

    if let Some(category_id) = req.category_id {
        let owner: Option<Uuid> =
            sqlx::query_scalar("SELECT tenant_id FROM categories WHERE id = $1")
                .bind(category_id)
                .fetch_optional(&state.pool)
                .await
                .map_err(|e| ApiError::Database(e.to_string()))?;
        match owner {
            Some(owner) if owner == auth.tenant_id => {}
            Some(_) => return Err(ApiError::Forbidden),
            None => {
                return Err(ApiError::Validation("Unknown category.".to_string()));
            }
        }
    }

    let product: Product = sqlx::query_as(
        r#"
        INSERT INTO products (tenant_id, category_id, name, price)
        VALUES ($1, $2, $3, $4)
        RETURNING id, tenant_id, category_id, name, price, image_url, created_at
        "#,
    )
    .bind(auth.tenant_id)
    .bind(req.category_id)
    .bind(name)
    .bind(req.price)
    .fetch_one(&state.pool)
    .await
    .map_err(|e| ApiError::Database(e.to_string()))?;

    Ok((StatusCode::CREATED, Json(product)))
}

#[derive(Debug, Deserialize)]
pub struct SetProductImageRequest {
    pub image_url: String,
}

/// Attach an uploaded image to a product. Byte handling happens at the
/// upload proxy; this endpoint gates the permission and records the URL.
pub async fn set_product_image(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthTenant>,
    Path(product_id): Path<Uuid>,
    Json(req): Json<SetProductImageRequest>,
) -> Result<Json<Product>, ApiError> {
    if req.image_url.trim().is_empty() {
        return Err(ApiError::Validation("Image URL is required.".to_string()));
    }

    enforce_quota(&state, auth.tenant_id, ResourceKind::ImageUpload).await?;

    let product: Option<Product> = sqlx::query_as(
        r#"
        UPDATE products
        SET image_url = $3
        WHERE id = $1 AND tenant_id = $2
        RETURNING id, tenant_id, category_id, name, price, image_url, created_at
        "#,
    )
    .bind(product_id)
    .bind(auth.tenant_id)
    .bind(req.image_url.trim())
    .fetch_optional(&state.pool)
    .await
    .map_err(|e| ApiError::Database(e.to_string()))?;

    product.map(Json).ok_or(ApiError::NotFound("product"))
}
