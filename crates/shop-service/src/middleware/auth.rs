//! JWT 认证中间件
//!
//! 验证请求中的 Bearer Token，并把调用方身份作为 `CurrentUser` 注入请求扩展

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{Method, Request, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;
use crate::models::roles;
use crate::state::AppState;

/// 公开路由（方法 + 路径），无需 Access Token
const PUBLIC_ROUTES: &[(&str, &str)] = &[
    ("POST", "/api/v1/login"),
    ("POST", "/api/v1/user"),
    // 刷新接口携带的是 Refresh Token，由处理器自行验证
    ("GET", "/api/v1/user/refreshToken"),
    ("GET", "/health"),
    ("GET", "/ready"),
];

fn is_public(method: &Method, path: &str) -> bool {
    PUBLIC_ROUTES
        .iter()
        .any(|(m, p)| *m == method.as_str() && *p == path)
}

/// 当前调用方身份
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: i64,
    pub email: String,
    pub roles: Vec<String>,
}

impl CurrentUser {
    /// ROLE_ADMIN 满足所有角色要求
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role || r == roles::ADMIN)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized("未认证".to_string()))
    }
}

/// 从 Authorization header 中取出 Bearer Token
pub fn bearer_token(request_headers: &axum::http::HeaderMap) -> Option<&str> {
    request_headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
}

/// 认证中间件
///
/// 公开路由直接放行；其余路由要求有效的 Access Token。
/// Refresh Token 不携带用户 ID，不能用于访问业务接口。
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if is_public(request.method(), request.uri().path()) {
        return next.run(request).await;
    }

    let Some(token) = bearer_token(request.headers()) else {
        return ApiError::Unauthorized("缺少认证 Token".to_string()).into_response();
    };

    let claims = match state.auth.tokens().verify(token) {
        Ok(claims) => claims,
        Err(e) => return ApiError::Token(e).into_response(),
    };

    let Some(id) = claims.id else {
        return ApiError::Unauthorized("需要 Access Token".to_string()).into_response();
    };

    request.extensions_mut().insert(CurrentUser {
        id,
        email: claims.sub,
        roles: claims.roles.unwrap_or_default(),
    });
    next.run(request).await
}
