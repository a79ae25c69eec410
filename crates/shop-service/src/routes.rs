//! 路由配置模块
//!
//! 定义所有 REST API 端点的路由映射；角色检查以 route_layer 挂在各分组上

use axum::{
    Router,
    middleware,
    routing::{delete, get, post, put},
};
use shop_shared::observability::middleware as obs_middleware;

use crate::middleware::{auth_middleware, require_role};
use crate::models::roles;
use crate::{handlers, state::AppState};

/// 公开路由（无需认证）
fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(handlers::auth::login))
        .route("/user", post(handlers::user::create_user))
        .route("/user/refreshToken", get(handlers::user::refresh_token))
}

/// 普通用户路由，要求 ROLE_USER（管理员同样放行）
fn customer_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/order",
            get(handlers::order::list_orders).post(handlers::order::create_order),
        )
        .route(
            "/order/{id}",
            get(handlers::order::get_order).delete(handlers::order::refund_order),
        )
        .route("/order/{id}/items", get(handlers::order::get_order_items))
        .route("/order/{id}/address", get(handlers::order::get_order_address))
        .route(
            "/order/{id}/items-address",
            get(handlers::order::get_order_items_address),
        )
        .route("/user/address", post(handlers::user::add_address))
        .route("/product", get(handlers::product::list_products))
        .route_layer(middleware::from_fn(require_role(roles::USER)))
}

/// 管理员路由，要求 ROLE_ADMIN
fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/order/{id}", put(handlers::order::update_order_status))
        .route("/user", get(handlers::user::list_users))
        .route("/user/{id}", delete(handlers::user::delete_user))
        .route("/product", post(handlers::product::create_product))
        .route(
            "/product/{id}/price",
            put(handlers::product::update_product_price),
        )
        .route_layer(middleware::from_fn(require_role(roles::ADMIN)))
}

/// `/api/v1` 下的全部业务路由
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(public_routes())
        .merge(customer_routes())
        .merge(admin_routes())
}

/// 构建完整应用
///
/// 中间件顺序（外到内）：request_id -> http_tracing -> auth -> handler
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_routes())
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .with_state(state)
}
