//! 响应 DTO 定义
//!
//! 每种订单视图都有独立的响应类型和显式的映射函数。
//! 订单视图同时实现 Deserialize，以便序列化后写入响应缓存。

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{Address, Order, OrderItem, OrderStatus, Product, User, UserAddress};

/// 统一 API 响应格式
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// 创建成功响应
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: "操作成功".to_string(),
            data: Some(data),
        }
    }

    /// 创建成功响应（自定义消息）
    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: message.into(),
            data: Some(data),
        }
    }
}

// ==================== 订单视图 ====================

/// 订单（不含订单项和地址）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: i64,
    pub user_id: i64,
    pub stripe_id: String,
    pub status: OrderStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderWithItemsResponse {
    pub id: i64,
    pub user_id: i64,
    pub stripe_id: String,
    pub status: OrderStatus,
    pub items: Vec<OrderItemResponse>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderWithAddressResponse {
    pub id: i64,
    pub user_id: i64,
    pub stripe_id: String,
    pub status: OrderStatus,
    pub address: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderWithItemsAndAddressResponse {
    pub id: i64,
    pub user_id: i64,
    pub stripe_id: String,
    pub status: OrderStatus,
    pub items: Vec<OrderItemResponse>,
    pub address: Option<Address>,
}

impl From<&OrderItem> for OrderItemResponse {
    fn from(item: &OrderItem) -> Self {
        Self {
            id: item.id,
            product_id: item.product_id,
            product_name: item.product_name.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
        }
    }
}

fn item_responses(order: &Order) -> Vec<OrderItemResponse> {
    order
        .items
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(OrderItemResponse::from)
        .collect()
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            stripe_id: order.stripe_id.clone(),
            status: order.status,
        }
    }
}

impl From<&Order> for OrderWithItemsResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            stripe_id: order.stripe_id.clone(),
            status: order.status,
            items: item_responses(order),
        }
    }
}

impl From<&Order> for OrderWithAddressResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            stripe_id: order.stripe_id.clone(),
            status: order.status,
            address: order.address.clone(),
        }
    }
}

impl From<&Order> for OrderWithItemsAndAddressResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            stripe_id: order.stripe_id.clone(),
            status: order.status,
            items: item_responses(order),
            address: order.address.clone(),
        }
    }
}

/// 订单视图的归属用户，用于校验缓存命中的数据是否属于调用方
pub trait OwnedByUser {
    fn owner_id(&self) -> i64;
}

macro_rules! impl_owned_by_user {
    ($($ty:ty),* $(,)?) => {
        $(impl OwnedByUser for $ty {
            fn owner_id(&self) -> i64 {
                self.user_id
            }
        })*
    };
}

impl_owned_by_user!(
    OrderResponse,
    OrderWithItemsResponse,
    OrderWithAddressResponse,
    OrderWithItemsAndAddressResponse,
);

// ==================== 用户 ====================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserWithRolesResponse {
    pub id: i64,
    pub email: String,
    pub roles: Vec<String>,
}

impl From<&User> for UserWithRolesResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            roles: user.roles.clone(),
        }
    }
}

/// 用户保存的地址
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAddressResponse {
    pub id: i64,
    #[serde(flatten)]
    pub address: Address,
}

impl From<&UserAddress> for UserAddressResponse {
    fn from(saved: &UserAddress) -> Self {
        Self {
            id: saved.id,
            address: saved.address.clone(),
        }
    }
}

/// 管理端用户列表项：角色、地址和订单
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetailResponse {
    pub id: i64,
    pub email: String,
    pub roles: Vec<String>,
    pub addresses: Vec<UserAddressResponse>,
    pub orders: Vec<OrderResponse>,
}

impl UserDetailResponse {
    pub fn new(user: &User, addresses: &[UserAddress], orders: &[Order]) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            roles: user.roles.clone(),
            addresses: addresses.iter().map(UserAddressResponse::from).collect(),
            orders: orders.iter().map(OrderResponse::from).collect(),
        }
    }
}

// ==================== 认证 ====================

/// 登录/刷新返回的 Token 对
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
}

// ==================== 商品 ====================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
}

impl From<&Product> for ProductResponse {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn full_order() -> Order {
        Order {
            id: 10,
            user_id: 3,
            stripe_id: "pi_abc".into(),
            status: OrderStatus::Paid,
            created_at: Utc::now(),
            items: Some(vec![OrderItem {
                id: 1,
                order_id: 10,
                product_id: 5,
                product_name: "Caneca".into(),
                quantity: 2,
                unit_price: Decimal::new(1000, 2),
            }]),
            address: Some(Address {
                street: "Rua A".into(),
                number: "1".into(),
                complement: None,
                district: None,
                city: "Recife".into(),
                state: "PE".into(),
                zip_code: "50000-000".into(),
            }),
        }
    }

    #[test]
    fn test_order_response_shape() {
        let json = serde_json::to_value(OrderResponse::from(&full_order())).unwrap();
        assert_eq!(json["id"], 10);
        assert_eq!(json["userId"], 3);
        assert_eq!(json["stripeId"], "pi_abc");
        assert_eq!(json["status"], "PAID");
        assert!(json.get("items").is_none());
        assert!(json.get("address").is_none());
    }

    #[test]
    fn test_items_and_address_view() {
        let view = OrderWithItemsAndAddressResponse::from(&full_order());
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].unit_price, Decimal::new(1000, 2));
        assert_eq!(view.address.as_ref().map(|a| a.city.as_str()), Some("Recife"));
        assert_eq!(view.owner_id(), 3);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["address"]["zipCode"], "50000-000");
        assert_eq!(json["items"][0]["productName"], "Caneca");
    }

    #[test]
    fn test_items_view_without_loaded_items_is_empty() {
        let mut order = full_order();
        order.items = None;
        assert!(OrderWithItemsResponse::from(&order).items.is_empty());
    }

    #[test]
    fn test_api_response_envelope() {
        let json = serde_json::to_value(ApiResponse::success(1)).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["code"], "SUCCESS");
        assert_eq!(json["data"], 1);
    }
}
