//! 仓储 Trait 定义
//!
//! 定义仓储接口，便于服务层依赖抽象而非具体实现，支持 mock 测试

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::Result;
use crate::models::{
    Address, NewOrder, NewProduct, NewUser, Order, OrderFetch, OrderStatus, Product, User,
    UserAddress,
};

/// 订单仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// 列出用户的订单（不加载订单项和地址）
    async fn find_by_user_id(&self, user_id: i64) -> Result<Vec<Order>>;
    /// 按 ID 查询且限定归属用户
    async fn find_by_id_and_user_id(
        &self,
        id: i64,
        user_id: i64,
        fetch: OrderFetch,
    ) -> Result<Option<Order>>;
    async fn find_by_id(&self, id: i64, fetch: OrderFetch) -> Result<Option<Order>>;
    /// 创建订单及其订单项、地址快照
    async fn create(&self, order: NewOrder) -> Result<Order>;
    /// 仅当当前状态仍为 `from` 时改为 `to`；订单不存在或状态已被改动时返回 None
    async fn update_status(
        &self,
        id: i64,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Option<Order>>;
    /// 删除订单，返回是否存在
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// 用户仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_all(&self) -> Result<Vec<User>>;
    async fn find_by_id(&self, id: i64) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    /// 创建用户，邮箱重复时返回 AlreadyExists
    async fn create(&self, user: NewUser) -> Result<User>;
    /// 删除用户及其角色关联、购物车，返回是否存在
    async fn delete(&self, id: i64) -> Result<bool>;

    // 保存的地址
    async fn add_address(&self, user_id: i64, address: Address) -> Result<UserAddress>;
    async fn find_address(&self, user_id: i64, address_id: i64) -> Result<Option<UserAddress>>;
    async fn list_addresses(&self, user_id: i64) -> Result<Vec<UserAddress>>;
}

/// 商品仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Product>>;
    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Product>>;
    async fn create(&self, product: NewProduct) -> Result<Product>;
    async fn update_price(&self, id: i64, price: Decimal) -> Result<Option<Product>>;
}
