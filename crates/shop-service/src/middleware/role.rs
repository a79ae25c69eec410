//! 角色检查中间件
//!
//! 检查调用方是否拥有指定角色

use axum::{
    body::Body,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::future::Future;
use std::pin::Pin;

use super::auth::CurrentUser;
use crate::error::ApiError;

/// 角色检查中间件工厂
///
/// # 示例
/// ```ignore
/// .route("/user", get(list_users).route_layer(axum::middleware::from_fn(require_role(roles::ADMIN))))
/// ```
pub fn require_role(
    role: &'static str,
) -> impl Fn(Request<Body>, Next) -> Pin<Box<dyn Future<Output = Response> + Send>> + Clone + Send {
    move |request: Request<Body>, next: Next| Box::pin(check_role(request, next, role))
}

async fn check_role(request: Request<Body>, next: Next, role: &'static str) -> Response {
    // CurrentUser 由 auth_middleware 注入
    let Some(user) = request.extensions().get::<CurrentUser>() else {
        return ApiError::Unauthorized("未认证".to_string()).into_response();
    };

    if !user.has_role(role) {
        return ApiError::Forbidden(format!("缺少角色: {}", role)).into_response();
    }

    next.run(request).await
}
