//! 商品相关的 HTTP 处理器

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::dto::{ApiResponse, PriceInput, ProductInput, ProductResponse};
use crate::error::Result;
use crate::state::AppState;

/// GET /api/v1/product
pub async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ProductResponse>>>> {
    let products = state.products.list().await?;
    Ok(Json(ApiResponse::success(products)))
}

/// POST /api/v1/product
pub async fn create_product(
    State(state): State<AppState>,
    Json(input): Json<ProductInput>,
) -> Result<(StatusCode, Json<ApiResponse<ProductResponse>>)> {
    let product = state.products.create(input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(product))))
}

/// PUT /api/v1/product/{id}/price
pub async fn update_product_price(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<PriceInput>,
) -> Result<Json<ApiResponse<ProductResponse>>> {
    let product = state.products.update_price(id, input).await?;
    Ok(Json(ApiResponse::success(product)))
}
