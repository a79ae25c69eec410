//! 内存仓储
//!
//! 使用 DashMap 实现的进程内存储，适用于开发环境和 HTTP 集成测试。
//! 三个仓储共享同一个 `MemoryStore`，删除用户时可以级联清理地址和订单。

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use super::traits::{OrderRepository, ProductRepository, UserRepository};
use crate::error::{ApiError, Result};
use crate::models::{
    Address, NewOrder, NewProduct, NewUser, Order, OrderFetch, OrderItem, OrderStatus, Product,
    User, UserAddress,
};

/// 带自增主键的内存表
#[derive(Debug)]
struct Table<T> {
    rows: DashMap<i64, T>,
    seq: AtomicI64,
}

impl<T: Clone> Table<T> {
    fn new() -> Self {
        Self {
            rows: DashMap::new(),
            seq: AtomicI64::new(0),
        }
    }

    fn next_id(&self) -> i64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn get(&self, id: i64) -> Option<T> {
        self.rows.get(&id).map(|v| v.clone())
    }

    /// 按条件筛选，结果按主键升序
    fn list_by<F>(&self, predicate: F) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        let mut rows: Vec<(i64, T)> = self
            .rows
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        rows.sort_by_key(|(id, _)| *id);
        rows.into_iter().map(|(_, v)| v).collect()
    }
}

/// 共享内存存储
#[derive(Debug)]
pub struct MemoryStore {
    users: Table<User>,
    emails: DashMap<String, i64>,
    addresses: Table<UserAddress>,
    products: Table<Product>,
    orders: Table<Order>,
    order_item_seq: AtomicI64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            users: Table::new(),
            emails: DashMap::new(),
            addresses: Table::new(),
            products: Table::new(),
            orders: Table::new(),
            order_item_seq: AtomicI64::new(0),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

/// 按加载计划裁剪订单（内存中始终保存完整订单）
fn apply_fetch(mut order: Order, fetch: OrderFetch) -> Order {
    if !fetch.items {
        order.items = None;
    }
    if !fetch.address {
        order.address = None;
    }
    order
}

// ==================== 订单 ====================

#[derive(Debug, Clone)]
pub struct MemoryOrderRepository {
    store: Arc<MemoryStore>,
}

impl MemoryOrderRepository {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl OrderRepository for MemoryOrderRepository {
    async fn find_by_user_id(&self, user_id: i64) -> Result<Vec<Order>> {
        Ok(self
            .store
            .orders
            .list_by(|o| o.user_id == user_id)
            .into_iter()
            .map(|o| apply_fetch(o, OrderFetch::BARE))
            .collect())
    }

    async fn find_by_id_and_user_id(
        &self,
        id: i64,
        user_id: i64,
        fetch: OrderFetch,
    ) -> Result<Option<Order>> {
        Ok(self
            .store
            .orders
            .get(id)
            .filter(|o| o.user_id == user_id)
            .map(|o| apply_fetch(o, fetch)))
    }

    async fn find_by_id(&self, id: i64, fetch: OrderFetch) -> Result<Option<Order>> {
        Ok(self.store.orders.get(id).map(|o| apply_fetch(o, fetch)))
    }

    async fn create(&self, new_order: NewOrder) -> Result<Order> {
        let id = self.store.orders.next_id();
        let items = new_order
            .items
            .into_iter()
            .map(|item| OrderItem {
                id: self.store.order_item_seq.fetch_add(1, Ordering::SeqCst) + 1,
                order_id: id,
                product_id: item.product_id,
                product_name: item.product_name,
                quantity: item.quantity,
                unit_price: item.unit_price,
            })
            .collect();

        let order = Order {
            id,
            user_id: new_order.user_id,
            stripe_id: new_order.stripe_id,
            status: new_order.status,
            created_at: Utc::now(),
            items: Some(items),
            address: Some(new_order.address),
        };
        self.store.orders.rows.insert(id, order.clone());
        Ok(order)
    }

    async fn update_status(
        &self,
        id: i64,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Option<Order>> {
        // 比较和写入都在同一个分片写锁内
        let Some(mut order) = self.store.orders.rows.get_mut(&id) else {
            return Ok(None);
        };
        if order.status != from {
            return Ok(None);
        }
        order.status = to;
        Ok(Some(apply_fetch(order.clone(), OrderFetch::BARE)))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        Ok(self.store.orders.rows.remove(&id).is_some())
    }
}

// ==================== 用户 ====================

#[derive(Debug, Clone)]
pub struct MemoryUserRepository {
    store: Arc<MemoryStore>,
}

impl MemoryUserRepository {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_all(&self) -> Result<Vec<User>> {
        Ok(self.store.users.list_by(|_| true))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        Ok(self.store.users.get(id))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let id = self.store.emails.get(email).map(|id| *id);
        Ok(id.and_then(|id| self.store.users.get(id)))
    }

    async fn create(&self, new_user: NewUser) -> Result<User> {
        // 邮箱索引的 entry 锁保证并发注册同一邮箱时只有一个成功
        match self.store.emails.entry(new_user.email.clone()) {
            Entry::Occupied(_) => Err(ApiError::AlreadyExists(new_user.email)),
            Entry::Vacant(slot) => {
                let id = self.store.users.next_id();
                let mut roles = new_user.roles;
                roles.sort();
                let user = User {
                    id,
                    email: new_user.email,
                    password_hash: new_user.password_hash,
                    roles,
                    created_at: Utc::now(),
                };
                self.store.users.rows.insert(id, user.clone());
                slot.insert(id);
                Ok(user)
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let Some((_, user)) = self.store.users.rows.remove(&id) else {
            return Ok(false);
        };

        self.store.emails.remove(&user.email);
        self.store.addresses.rows.retain(|_, a| a.user_id != id);
        self.store.orders.rows.retain(|_, o| o.user_id != id);
        Ok(true)
    }

    async fn add_address(&self, user_id: i64, address: Address) -> Result<UserAddress> {
        let id = self.store.addresses.next_id();
        let saved = UserAddress {
            id,
            user_id,
            address,
        };
        self.store.addresses.rows.insert(id, saved.clone());
        Ok(saved)
    }

    async fn find_address(&self, user_id: i64, address_id: i64) -> Result<Option<UserAddress>> {
        Ok(self
            .store
            .addresses
            .get(address_id)
            .filter(|a| a.user_id == user_id))
    }

    async fn list_addresses(&self, user_id: i64) -> Result<Vec<UserAddress>> {
        Ok(self.store.addresses.list_by(|a| a.user_id == user_id))
    }
}

// ==================== 商品 ====================

#[derive(Debug, Clone)]
pub struct MemoryProductRepository {
    store: Arc<MemoryStore>,
}

impl MemoryProductRepository {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ProductRepository for MemoryProductRepository {
    async fn list(&self) -> Result<Vec<Product>> {
        Ok(self.store.products.list_by(|_| true))
    }

    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Product>> {
        Ok(self.store.products.list_by(|p| ids.contains(&p.id)))
    }

    async fn create(&self, product: NewProduct) -> Result<Product> {
        let id = self.store.products.next_id();
        let product = Product {
            id,
            name: product.name,
            description: product.description,
            price: product.price,
        };
        self.store.products.rows.insert(id, product.clone());
        Ok(product)
    }

    async fn update_price(&self, id: i64, price: Decimal) -> Result<Option<Product>> {
        Ok(self.store.products.rows.get_mut(&id).map(|mut product| {
            product.price = price;
            product.clone()
        }))
    }
}
