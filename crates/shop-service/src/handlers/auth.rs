//! 登录处理器
//!
//! 表单登录，Token 同时写入响应头和响应体

use axum::{
    Form, Json,
    extract::{OriginalUri, State},
    http::{HeaderMap, HeaderValue, Uri, header},
    response::{IntoResponse, Response},
};

use crate::dto::{ApiResponse, LoginForm, TokenPairResponse};
use crate::error::Result;
use crate::state::AppState;

pub const ACCESS_TOKEN_HEADER: &str = "access_token";
pub const REFRESH_TOKEN_HEADER: &str = "refresh_token";

/// 还原请求的完整 URL，作为 Token 的签发者
///
/// scheme 取自 `x-forwarded-proto`（默认 http），host 取自 Host 头
pub fn request_url(headers: &HeaderMap, uri: &Uri) -> String {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| uri.authority().map(|a| a.as_str()))
        .unwrap_or("localhost");

    format!("{}://{}{}", scheme, host, uri.path())
}

/// Token 对写入 `access_token` / `refresh_token` 响应头，并作为响应体返回
pub fn token_response(pair: TokenPairResponse) -> Response {
    let access = HeaderValue::from_str(&pair.access_token);
    let refresh = HeaderValue::from_str(&pair.refresh_token);

    let mut response = Json(ApiResponse::success(pair)).into_response();
    let headers = response.headers_mut();
    if let Ok(value) = access {
        headers.insert(ACCESS_TOKEN_HEADER, value);
    }
    if let Ok(value) = refresh {
        headers.insert(REFRESH_TOKEN_HEADER, value);
    }
    response
}

/// 登录
///
/// POST /api/v1/login（application/x-www-form-urlencoded: username, password）
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    OriginalUri(uri): OriginalUri,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let issuer = request_url(&headers, &uri);
    let pair = state
        .auth
        .login(&form.username, &form.password, &issuer)
        .await?;
    Ok(token_response(pair))
}
