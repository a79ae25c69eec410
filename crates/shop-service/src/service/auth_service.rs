//! 认证服务
//!
//! 登录签发 Access/Refresh Token，以及用 Refresh Token 换取新的 Access Token

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::auth::{TokenIssuer, verify_password};
use crate::dto::TokenPairResponse;
use crate::error::{ApiError, Result};
use crate::repository::UserRepository;

/// 认证服务
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    tokens: TokenIssuer,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, tokens: TokenIssuer) -> Self {
        Self { users, tokens }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// 邮箱 + 密码登录
    ///
    /// `issuer` 为本次登录请求的 URL，写入 Token 的 iss
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str, issuer: &str) -> Result<TokenPairResponse> {
        let Some(user) = self.users.find_by_email(email).await? else {
            warn!("登录失败：用户不存在");
            return Err(ApiError::InvalidCredentials);
        };

        if !verify_password(password, &user.password_hash)? {
            warn!(user_id = user.id, "登录失败：密码错误");
            return Err(ApiError::InvalidCredentials);
        }

        let access_token = self
            .tokens
            .issue_access(&user.email, user.id, &user.roles, issuer)?;
        let refresh_token = self.tokens.issue_refresh(&user.email, issuer)?;

        info!(user_id = user.id, "登录成功");
        Ok(TokenPairResponse {
            access_token,
            refresh_token,
        })
    }

    /// 用 Refresh Token 换取新的 Access Token
    ///
    /// 失败时返回可直接展示给调用方的原因；原 Refresh Token 原样返回
    #[instrument(skip_all)]
    pub async fn refresh(
        &self,
        refresh_token: &str,
        issuer: &str,
    ) -> std::result::Result<TokenPairResponse, String> {
        let claims = self
            .tokens
            .verify(refresh_token)
            .map_err(|e| e.to_string())?;

        let user = self
            .users
            .find_by_email(&claims.sub)
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("用户不存在: {}", claims.sub))?;

        let access_token = self
            .tokens
            .issue_access(&user.email, user.id, &user.roles, issuer)
            .map_err(|e| e.to_string())?;

        info!(user_id = user.id, "Access Token 已刷新");
        Ok(TokenPairResponse {
            access_token,
            refresh_token: refresh_token.to_string(),
        })
    }
}
