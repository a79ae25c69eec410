//! 领域模型模块
//!
//! 用户、商品、订单实体以及订单状态机

pub mod order;
pub mod product;
pub mod user;

// 重新导出常用类型
pub use order::{NewOrder, NewOrderItem, Order, OrderFetch, OrderItem, OrderStatus};
pub use product::{NewProduct, Product};
pub use user::{Address, NewUser, User, UserAddress, roles};
