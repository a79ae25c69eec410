//! 服务错误类型定义
//!
//! 业务错误到 HTTP 状态码、错误码和响应体的统一映射

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use shop_shared::error::ShopError;

use crate::auth::TokenError;
use crate::models::OrderStatus;

/// 字段级错误详情
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// 服务错误类型
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // 资源错误
    #[error("资源不存在: {}", describe_fields(.fields))]
    NotFound { fields: Vec<FieldError> },
    #[error("资源已存在: {0}")]
    AlreadyExists(String),

    // 验证错误
    #[error("参数验证失败: {0}")]
    Validation(String),

    // 认证错误
    #[error("用户名或密码错误")]
    InvalidCredentials,
    #[error("未授权: {0}")]
    Unauthorized(String),
    #[error("{0}")]
    Token(#[from] TokenError),
    #[error("禁止访问: {0}")]
    Forbidden(String),

    // 业务错误
    #[error("订单状态不允许从 {from} 变更为 {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("操作冲突: {0}")]
    Conflict(String),
    #[error("支付服务错误: {0}")]
    PaymentProvider(String),

    // 系统错误
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),
    #[error("内部错误: {0}")]
    Internal(String),
}

fn describe_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| format!("{}: {}", f.field, f.message))
        .collect::<Vec<_>>()
        .join(", ")
}

impl ApiError {
    /// 单字段的资源不存在错误
    pub fn not_found(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound {
            fields: vec![FieldError::new(field, message)],
        }
    }

    /// 订单不存在（或不属于当前用户）
    pub fn order_not_found() -> Self {
        Self::not_found("orderId", "Id given do not match")
    }

    /// 用户不存在
    pub fn user_not_found() -> Self {
        Self::not_found("userId", "Id given do not match")
    }

    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::AlreadyExists(_) | Self::InvalidTransition { .. } | Self::Conflict(_) => {
                StatusCode::CONFLICT
            }
            Self::Validation(_) => StatusCode::BAD_REQUEST,

            Self::InvalidCredentials | Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Token(TokenError::SigningKeyUnavailable) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Token(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,

            Self::PaymentProvider(_) => StatusCode::BAD_GATEWAY,

            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 返回错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::AlreadyExists(_) => "ALREADY_EXISTS",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Token(TokenError::SigningKeyUnavailable) => "INTERNAL_ERROR",
            Self::Token(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::InvalidTransition { .. } => "INVALID_STATUS_TRANSITION",
            Self::Conflict(_) => "CONFLICT",
            Self::PaymentProvider(_) => "PAYMENT_PROVIDER_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息仅记录日志
        let message = match &self {
            Self::Database(e) => {
                tracing::error!(error = %e, "数据库操作失败");
                "服务内部错误，请稍后重试".to_string()
            }
            Self::Internal(e) => {
                tracing::error!(error = %e, "内部错误");
                "服务内部错误，请稍后重试".to_string()
            }
            Self::Token(e @ TokenError::SigningKeyUnavailable) => {
                tracing::error!(error = %e, "Token 签发失败");
                "服务内部错误，请稍后重试".to_string()
            }
            other => other.to_string(),
        };

        let mut body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": serde_json::Value::Null
        });

        if let Self::NotFound { fields } = &self {
            body["fields"] = json!(fields);
        }

        (status, axum::Json(body)).into_response()
    }
}

/// 从基础设施错误转换
impl From<ShopError> for ApiError {
    fn from(err: ShopError) -> Self {
        match err {
            ShopError::Database(e) => Self::Database(e),
            other => Self::Internal(other.to_string()),
        }
    }
}

/// 从 validator 错误转换
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

/// 从 JSON 序列化错误转换
impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON 处理错误: {}", err))
    }
}

/// Token 刷新失败的响应
///
/// 刷新接口直接把失败原因以 `{"error_message": ...}` 返回给调用方，状态码固定为 403
#[derive(Debug)]
pub struct RefreshDenied(pub String);

impl IntoResponse for RefreshDenied {
    fn into_response(self) -> Response {
        (
            StatusCode::FORBIDDEN,
            axum::Json(json!({ "error_message": self.0 })),
        )
            .into_response()
    }
}

/// 服务层 Result 类型别名
pub type Result<T> = std::result::Result<T, ApiError>;
