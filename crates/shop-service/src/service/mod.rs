//! 业务服务层
//!
//! 服务只依赖仓储、支付和通知的 trait，具体实现由启动代码注入

mod auth_service;
mod order_service;
mod product_service;
mod user_service;

pub use auth_service::AuthService;
pub use order_service::OrderService;
pub use product_service::ProductService;
pub use user_service::UserService;
