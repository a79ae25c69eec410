//! 数据库仓储层
//!
//! 提供所有实体的数据访问接口，封装 SQL 操作细节。
//!
//! ## 设计原则
//!
//! - 仓储只负责数据持久化，不包含业务逻辑
//! - PostgreSQL 实现使用 SQLx，内存实现使用 DashMap
//! - 定义 trait 接口以支持 mock 测试

mod memory;
mod order_repo;
mod product_repo;
mod traits;
mod user_repo;

pub use memory::{MemoryOrderRepository, MemoryProductRepository, MemoryStore, MemoryUserRepository};
pub use order_repo::PgOrderRepository;
pub use product_repo::PgProductRepository;
pub use traits::*;
pub use user_repo::PgUserRepository;
