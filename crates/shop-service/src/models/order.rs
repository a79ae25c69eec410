//! 订单模型
//!
//! 订单、订单项、收货地址快照以及订单状态机

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Address;

/// 订单状态
///
/// 状态只能沿 CREATED → PAID → SHIPPED → DELIVERED 单向推进，
/// 尚未发货前可以取消
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// 已创建 - 等待支付
    #[default]
    Created,
    /// 已支付
    Paid,
    /// 已发货
    Shipped,
    /// 已签收
    Delivered,
    /// 已取消
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        Self::Created,
        Self::Paid,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Paid => "PAID",
            Self::Shipped => "SHIPPED",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// 终态不允许再变更
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// 是否允许从当前状态变更到目标状态
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Created, Paid)
                | (Created, Cancelled)
                | (Paid, Shipped)
                | (Paid, Cancelled)
                | (Shipped, Delivered)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 订单项
///
/// 单价为下单时的快照，之后商品调价不影响已有订单
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// 订单实体
///
/// `items` 和 `address` 只有在按需加载时才为 `Some`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    /// 支付平台的 payment intent ID
    pub stripe_id: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub items: Option<Vec<OrderItem>>,
    pub address: Option<Address>,
}

/// 订单查询的加载计划
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderFetch {
    pub items: bool,
    pub address: bool,
}

impl OrderFetch {
    pub const BARE: Self = Self {
        items: false,
        address: false,
    };
    pub const ITEMS: Self = Self {
        items: true,
        address: false,
    };
    pub const ADDRESS: Self = Self {
        items: false,
        address: true,
    };
    pub const FULL: Self = Self {
        items: true,
        address: true,
    };
}

/// 待持久化的订单项（价格已快照）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// 待持久化的订单
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub user_id: i64,
    pub stripe_id: String,
    pub status: OrderStatus,
    pub items: Vec<NewOrderItem>,
    pub address: Address,
}
