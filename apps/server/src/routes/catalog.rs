//! Categories and products.
//!
//! Every role may read the catalog; only managers and admins change it.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use comptoir_core::{Area, Category, CategoryInput, Product, ProductInput, StockMovement};
use serde::Deserialize;

use super::created;
use crate::error::{ApiError, ApiResult};
use crate::session::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/categories", get(list_categories).post(create_category))
        .route(
            "/api/categories/{id}",
            get(get_category).put(update_category).delete(delete_category),
        )
        .route("/api/products", get(list_products).post(create_product))
        .route("/api/products/low-stock", get(low_stock))
        .route(
            "/api/products/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/api/products/{id}/movements", get(movements))
}

// =============================================================================
// Categories
// =============================================================================

async fn list_categories(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<Vec<Category>>> {
    user.require(Area::Catalog)?;
    Ok(Json(state.db.categories().list().await?))
}

async fn get_category(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Category>> {
    user.require(Area::Catalog)?;
    let category = state
        .db
        .categories()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Category", &id))?;
    Ok(Json(category))
}

async fn create_category(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<CategoryInput>,
) -> ApiResult<impl IntoResponse> {
    user.require(Area::Catalog)?;
    user.require_catalog_write()?;

    let category = state.db.categories().create(&body).await?;
    state
        .audit(&user, "create", "category", Some(&category.id), Some(category.name.clone()))
        .await;
    Ok(created(category))
}

async fn update_category(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<CategoryInput>,
) -> ApiResult<Json<Category>> {
    user.require(Area::Catalog)?;
    user.require_catalog_write()?;

    let category = state.db.categories().update(&id, &body).await?;
    state.audit(&user, "update", "category", Some(&id), None).await;
    Ok(Json(category))
}

async fn delete_category(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    user.require(Area::Catalog)?;
    user.require_catalog_write()?;

    state.db.categories().delete(&id).await?;
    state.audit(&user, "delete", "category", Some(&id), None).await;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Products
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub category_id: Option<String>,
}

async fn list_products(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(filter): Query<ProductFilter>,
) -> ApiResult<Json<Vec<Product>>> {
    user.require(Area::Catalog)?;
    let products = state
        .db
        .products()
        .list(filter.search.as_deref(), filter.category_id.as_deref())
        .await?;
    Ok(Json(products))
}

async fn low_stock(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<Vec<Product>>> {
    user.require(Area::Catalog)?;
    Ok(Json(state.db.products().low_stock().await?))
}

async fn get_product(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Product>> {
    user.require(Area::Catalog)?;
    let product = state
        .db
        .products()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", &id))?;
    Ok(Json(product))
}

async fn movements(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<StockMovement>>> {
    user.require(Area::Catalog)?;
    if state.db.products().get_by_id(&id).await?.is_none() {
        return Err(ApiError::not_found("Product", &id));
    }
    Ok(Json(state.db.products().movements(&id).await?))
}

async fn create_product(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<ProductInput>,
) -> ApiResult<impl IntoResponse> {
    user.require(Area::Catalog)?;
    user.require_catalog_write()?;

    let product = state.db.products().create(&body, Some(&user.id)).await?;
    state
        .audit(&user, "create", "product", Some(&product.id), Some(product.reference.clone()))
        .await;
    Ok(created(product))
}

async fn update_product(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<ProductInput>,
) -> ApiResult<Json<Product>> {
    user.require(Area::Catalog)?;
    user.require_catalog_write()?;

    let product = state.db.products().update(&id, &body, Some(&user.id)).await?;
    state
        .audit(&user, "update", "product", Some(&id), Some(format!("stock {}", product.stock)))
        .await;
    Ok(Json(product))
}

async fn delete_product(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    user.require(Area::Catalog)?;
    user.require_catalog_write()?;

    state.db.products().delete(&id).await?;
    state.audit(&user, "delete", "product", Some(&id), None).await;
    Ok(StatusCode::NO_CONTENT)
}
