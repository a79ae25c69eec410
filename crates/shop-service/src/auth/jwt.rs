//! JWT Token 处理
//!
//! 提供 Access Token / Refresh Token 的签发和验证功能。
//!
//! 过期判断不依赖 jsonwebtoken 内置的时钟和 leeway，而是由调用方传入当前时间，
//! 方便在测试中精确控制时间点。

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shop_shared::config::JwtConfig;

/// Token 相关错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Token 签名无效")]
    Invalid,
    #[error("Token 已过期")]
    Expired,
    #[error("Token 格式错误: {0}")]
    Malformed(String),
    #[error("Token 签名密钥未配置")]
    SigningKeyUnavailable,
}

/// JWT Claims（Token 载荷）
///
/// Refresh Token 只携带 sub/exp/iss，`roles` 和 `id` 仅出现在 Access Token 中
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// 用户邮箱
    pub sub: String,
    /// 过期时间（Unix 秒）
    pub exp: i64,
    /// 签发者（签发请求的 URL）
    pub iss: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

#[derive(Clone)]
struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// Token 签发器
///
/// 签名密钥缺失时所有签发和验证都会失败，不会产出未签名的 Token
#[derive(Clone)]
pub struct TokenIssuer {
    keys: Option<SigningKeys>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(config: &JwtConfig) -> Self {
        let keys = config
            .secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|secret| SigningKeys {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
            });

        Self {
            keys,
            access_ttl: Duration::seconds(config.access_token_ttl_secs),
            refresh_ttl: Duration::seconds(config.refresh_token_ttl_secs),
        }
    }

    /// 是否已配置签名密钥
    pub fn has_signing_key(&self) -> bool {
        self.keys.is_some()
    }

    fn keys(&self) -> Result<&SigningKeys, TokenError> {
        self.keys.as_ref().ok_or(TokenError::SigningKeyUnavailable)
    }

    /// 签发 Access Token（携带角色和用户 ID）
    pub fn issue_access(
        &self,
        email: &str,
        user_id: i64,
        roles: &[String],
        issuer: &str,
    ) -> Result<String, TokenError> {
        self.issue_access_at(email, user_id, roles, issuer, Utc::now())
    }

    pub fn issue_access_at(
        &self,
        email: &str,
        user_id: i64,
        roles: &[String],
        issuer: &str,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = TokenClaims {
            sub: email.to_string(),
            exp: (now + self.access_ttl).timestamp(),
            iss: issuer.to_string(),
            roles: Some(roles.to_vec()),
            id: Some(user_id),
        };
        self.sign(&claims)
    }

    /// 签发 Refresh Token（只有 sub/exp/iss）
    pub fn issue_refresh(&self, email: &str, issuer: &str) -> Result<String, TokenError> {
        self.issue_refresh_at(email, issuer, Utc::now())
    }

    pub fn issue_refresh_at(
        &self,
        email: &str,
        issuer: &str,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = TokenClaims {
            sub: email.to_string(),
            exp: (now + self.refresh_ttl).timestamp(),
            iss: issuer.to_string(),
            roles: None,
            id: None,
        };
        self.sign(&claims)
    }

    fn sign(&self, claims: &TokenClaims) -> Result<String, TokenError> {
        let keys = self.keys()?;
        encode(&Header::new(Algorithm::HS256), claims, &keys.encoding)
            .map_err(|e| TokenError::Malformed(e.to_string()))
    }

    /// 验证 Token 并返回载荷
    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        let keys = self.keys()?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["sub", "exp"]);

        let data = decode::<TokenClaims>(token, &keys.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => TokenError::Invalid,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed(e.to_string()),
            }
        })?;

        if now.timestamp() >= data.claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(data.claims)
    }
}
