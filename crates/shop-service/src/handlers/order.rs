//! 订单相关的 HTTP 处理器
//!
//! 读接口经过响应缓存；写接口在成功后失效相关缓存

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::dto::{
    ApiResponse, OrderInput, OrderResponse, OrderWithAddressResponse,
    OrderWithItemsAndAddressResponse, OrderWithItemsResponse,
};
use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::models::OrderStatus;
use crate::state::AppState;

/// 当前用户的订单列表
///
/// GET /api/v1/order
pub async fn list_orders(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ApiResponse<Vec<OrderResponse>>>> {
    let orders = state.orders.list(user.id).await?;
    Ok(Json(ApiResponse::success(orders)))
}

/// GET /api/v1/order/{id}
pub async fn get_order(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<OrderResponse>>> {
    let order = state.orders.get(id, user.id).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// GET /api/v1/order/{id}/items
pub async fn get_order_items(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<OrderWithItemsResponse>>> {
    let order = state.orders.get_with_items(id, user.id).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// GET /api/v1/order/{id}/address
pub async fn get_order_address(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<OrderWithAddressResponse>>> {
    let order = state.orders.get_with_address(id, user.id).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// GET /api/v1/order/{id}/items-address
pub async fn get_order_items_address(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<OrderWithItemsAndAddressResponse>>> {
    let order = state.orders.get_with_items_and_address(id, user.id).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// 下单
///
/// POST /api/v1/order
pub async fn create_order(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<OrderInput>,
) -> Result<(StatusCode, Json<ApiResponse<OrderWithItemsAndAddressResponse>>)> {
    let order = state.orders.save(user.id, input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(order))))
}

/// 退款并删除订单
///
/// DELETE /api/v1/order/{id}
pub async fn refund_order(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    state.orders.refund(id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// 变更订单状态（管理员），请求体为状态字符串，如 `"PAID"`
///
/// PUT /api/v1/order/{id}
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(status): Json<OrderStatus>,
) -> Result<Json<ApiResponse<OrderResponse>>> {
    let order = state.orders.update_status(id, status).await?;
    Ok(Json(ApiResponse::success(order)))
}
