//! 用户相关的 HTTP 处理器

use axum::{
    Json,
    extract::{OriginalUri, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use super::auth::{request_url, token_response};
use crate::dto::{
    AddressInput, ApiResponse, UserAddressResponse, UserDetailResponse, UserInput,
    UserWithRolesResponse,
};
use crate::error::{RefreshDenied, Result};
use crate::middleware::{CurrentUser, bearer_token};
use crate::state::AppState;

/// 所有用户（含角色、地址和订单）
///
/// GET /api/v1/user
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<UserDetailResponse>>>> {
    let users = state.users.list().await?;
    Ok(Json(ApiResponse::success(users)))
}

/// 注册
///
/// POST /api/v1/user
pub async fn create_user(
    State(state): State<AppState>,
    Json(input): Json<UserInput>,
) -> Result<(StatusCode, Json<ApiResponse<UserWithRolesResponse>>)> {
    let user = state.users.register(input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

/// DELETE /api/v1/user/{id}
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    state.users.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// 用 Refresh Token 换取新的 Access Token
///
/// GET /api/v1/user/refreshToken
///
/// 任何失败都返回 403 和 `{"error_message": ...}`
pub async fn refresh_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    OriginalUri(uri): OriginalUri,
) -> Response {
    let Some(token) = bearer_token(&headers) else {
        return RefreshDenied("Refresh token is missing".to_string()).into_response();
    };

    let issuer = request_url(&headers, &uri);
    match state.auth.refresh(token, &issuer).await {
        Ok(pair) => token_response(pair),
        Err(reason) => RefreshDenied(reason).into_response(),
    }
}

/// 为当前用户保存收货地址
///
/// POST /api/v1/user/address
pub async fn add_address(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<AddressInput>,
) -> Result<(StatusCode, Json<ApiResponse<UserAddressResponse>>)> {
    let saved = state.users.add_address(user.id, input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(saved))))
}
