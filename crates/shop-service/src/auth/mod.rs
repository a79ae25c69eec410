//! 认证模块
//!
//! 提供 JWT Token 签发、验证和密码处理功能

mod jwt;
mod password;

pub use jwt::{TokenClaims, TokenError, TokenIssuer};
pub use password::{hash_password, hash_password_with_cost, verify_password};
