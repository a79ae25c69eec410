//! 应用状态定义
//!
//! 包含 Axum 路由共享的服务实例和基础设施句柄

use std::sync::Arc;

use shop_shared::cache::ResponseCache;
use shop_shared::database::Database;

use crate::auth::TokenIssuer;
use crate::notification::OrderNotifier;
use crate::payment::PaymentGateway;
use crate::repository::{
    MemoryOrderRepository, MemoryProductRepository, MemoryStore, MemoryUserRepository,
    OrderRepository, PgOrderRepository, PgProductRepository, PgUserRepository, ProductRepository,
    UserRepository,
};
use crate::service::{AuthService, OrderService, ProductService, UserService};

/// 仓储集合
#[derive(Clone)]
pub struct Repositories {
    pub orders: Arc<dyn OrderRepository>,
    pub users: Arc<dyn UserRepository>,
    pub products: Arc<dyn ProductRepository>,
}

impl Repositories {
    /// PostgreSQL 仓储
    pub fn postgres(database: &Database) -> Self {
        let pool = database.pool().clone();
        Self {
            orders: Arc::new(PgOrderRepository::new(pool.clone())),
            users: Arc::new(PgUserRepository::new(pool.clone())),
            products: Arc::new(PgProductRepository::new(pool)),
        }
    }

    /// 进程内仓储，三个仓储共享同一份存储
    pub fn memory() -> Self {
        let store = MemoryStore::shared();
        Self {
            orders: Arc::new(MemoryOrderRepository::new(store.clone())),
            users: Arc::new(MemoryUserRepository::new(store.clone())),
            products: Arc::new(MemoryProductRepository::new(store)),
        }
    }
}

/// 外部协作方
#[derive(Clone)]
pub struct Collaborators {
    pub payments: Arc<dyn PaymentGateway>,
    pub notifier: Arc<dyn OrderNotifier>,
}

/// Axum 应用共享状态
///
/// 通过 Arc 在 handler 间共享；没有全局可变状态，调用方身份通过请求扩展传递
#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<OrderService>,
    pub users: Arc<UserService>,
    pub auth: Arc<AuthService>,
    pub products: Arc<ProductService>,
    pub cache: Arc<ResponseCache>,
    /// 内存存储模式下为 None
    pub database: Option<Database>,
}

impl AppState {
    /// 组装应用状态
    pub fn new(
        repos: Repositories,
        collaborators: Collaborators,
        tokens: TokenIssuer,
        cache: Arc<ResponseCache>,
        database: Option<Database>,
    ) -> Self {
        let orders = OrderService::new(
            repos.orders.clone(),
            repos.products.clone(),
            repos.users.clone(),
            collaborators.payments,
            collaborators.notifier,
            cache.clone(),
        );
        let users = UserService::new(repos.users.clone(), repos.orders, cache.clone());
        let auth = AuthService::new(repos.users, tokens);
        let products = ProductService::new(repos.products);

        Self {
            orders: Arc::new(orders),
            users: Arc::new(users),
            auth: Arc::new(auth),
            products: Arc::new(products),
            cache,
            database,
        }
    }

    /// 替换用户服务（测试中注入低 cost 的密码哈希）
    pub fn with_user_service(mut self, users: UserService) -> Self {
        self.users = Arc::new(users);
        self
    }
}
