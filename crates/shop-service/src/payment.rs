//! 支付平台集成
//!
//! 通过 `PaymentGateway` trait 抽象退款调用，服务层不直接依赖具体支付平台。
//! `StripeGateway` 调用 Stripe REST API 的 `/v1/refunds` 接口。

use async_trait::async_trait;
use serde::Deserialize;
use shop_shared::config::PaymentConfig;
use std::time::Duration;
use tracing::{info, warn};

/// 支付错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentError {
    #[error("支付平台密钥未配置")]
    NotConfigured,
    #[error("支付平台请求失败: {0}")]
    Transport(String),
    #[error("支付平台拒绝退款 (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },
}

/// 退款回执
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RefundReceipt {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// 支付网关接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// 按 payment intent 全额退款
    async fn refund(&self, payment_intent: &str) -> Result<RefundReceipt, PaymentError>;
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
    code: Option<String>,
}

/// 从 Stripe 错误响应中提取可读的错误信息
fn extract_error_message(body: &str) -> String {
    match serde_json::from_str::<StripeErrorBody>(body) {
        Ok(parsed) => match (parsed.error.message, parsed.error.code) {
            (Some(message), _) => message,
            (None, Some(code)) => code,
            (None, None) => "unknown error".to_string(),
        },
        Err(_) if body.is_empty() => "empty response".to_string(),
        Err(_) => body.to_string(),
    }
}

/// Stripe 退款网关
pub struct StripeGateway {
    client: reqwest::Client,
    api_base: String,
    secret_key: Option<String>,
}

impl StripeGateway {
    pub fn new(config: &PaymentConfig) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| PaymentError::Transport(format!("创建 HTTP 客户端失败: {e}")))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone().filter(|k| !k.is_empty()),
        })
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn refund(&self, payment_intent: &str) -> Result<RefundReceipt, PaymentError> {
        let secret_key = self.secret_key.as_deref().ok_or(PaymentError::NotConfigured)?;

        let resp = self
            .client
            .post(format!("{}/v1/refunds", self.api_base))
            .bearer_auth(secret_key)
            .form(&[("payment_intent", payment_intent)])
            .send()
            .await
            .map_err(|e| PaymentError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = extract_error_message(&body);
            warn!(payment_intent, status = status.as_u16(), %message, "Stripe 退款失败");
            return Err(PaymentError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let receipt: RefundReceipt = resp
            .json()
            .await
            .map_err(|e| PaymentError::Transport(format!("解析退款响应失败: {e}")))?;

        info!(payment_intent, refund_id = %receipt.id, "Stripe 退款成功");
        Ok(receipt)
    }
}
