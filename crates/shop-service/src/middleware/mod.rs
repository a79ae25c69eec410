//! 中间件模块
//!
//! 提供认证和角色检查中间件

mod auth;
mod role;

pub use auth::{CurrentUser, auth_middleware, bearer_token};
pub use role::require_role;
