//! 订单通知
//!
//! 订单状态变更后通知下单用户。`OrderNotifier` 抽象发送行为，
//! 当前的邮件实现为模拟发送（仅记录日志）。

use async_trait::async_trait;
use shop_shared::config::NotificationConfig;
use tracing::info;
use uuid::Uuid;

use crate::models::{Order, OrderStatus};

/// 通知发送错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotificationError {
    #[error("通知发送失败: {0}")]
    SendFailed(String),
}

/// 订单状态变更通知
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderNotifier: Send + Sync {
    async fn status_changed(
        &self,
        recipient: &str,
        order: &Order,
        previous: OrderStatus,
    ) -> Result<(), NotificationError>;
}

/// 模拟邮件通知
///
/// 生产环境中替换为 SMTP 或邮件服务商的 API 调用
pub struct EmailNotifier {
    enabled: bool,
    from_address: String,
}

impl EmailNotifier {
    pub fn new(config: &NotificationConfig) -> Self {
        Self {
            enabled: config.enabled,
            from_address: config.from_address.clone(),
        }
    }
}

#[async_trait]
impl OrderNotifier for EmailNotifier {
    async fn status_changed(
        &self,
        recipient: &str,
        order: &Order,
        previous: OrderStatus,
    ) -> Result<(), NotificationError> {
        if !self.enabled {
            return Ok(());
        }

        if recipient.is_empty() {
            return Err(NotificationError::SendFailed("收件人为空".to_string()));
        }

        let message_id = Uuid::now_v7().to_string();
        info!(
            channel = "EMAIL",
            message_id = %message_id,
            from = %self.from_address,
            to = %recipient,
            order_id = order.id,
            previous = %previous,
            status = %order.status,
            "模拟发送订单状态邮件"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn order() -> Order {
        Order {
            id: 1,
            user_id: 1,
            stripe_id: "pi_1".into(),
            status: OrderStatus::Paid,
            created_at: Utc::now(),
            items: None,
            address: None,
        }
    }

    #[tokio::test]
    async fn test_email_notifier_sends() {
        let notifier = EmailNotifier::new(&NotificationConfig::default());
        assert!(notifier
            .status_changed("a@shop.local", &order(), OrderStatus::Created)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_email_notifier_rejects_empty_recipient() {
        let notifier = EmailNotifier::new(&NotificationConfig::default());
        assert!(notifier
            .status_changed("", &order(), OrderStatus::Created)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_disabled_notifier_is_noop() {
        let notifier = EmailNotifier::new(&NotificationConfig {
            enabled: false,
            ..Default::default()
        });
        assert!(notifier
            .status_changed("", &order(), OrderStatus::Created)
            .await
            .is_ok());
    }
}
