//! 电商订单服务
//!
//! 提供用户注册登录、商品、订单下单/查询/退款/状态流转等 REST API。
//!
//! ## 核心功能
//!
//! - **认证**：表单登录签发 Access/Refresh Token，Refresh Token 换取新的 Access Token
//! - **订单**：按用户隔离的订单查询，多种视图（明细、地址、明细+地址）
//! - **退款**：先调用支付服务退款，成功后才删除订单
//! - **状态流转**：管理员推进订单状态，并通知订单所属用户
//! - **响应缓存**：订单读接口缓存，写操作成功后失效
//!
//! ## 模块结构
//!
//! - `auth`: Token 签发校验与密码哈希
//! - `dto`: 请求和响应的数据传输对象
//! - `models`: 领域实体
//! - `repository`: 仓储接口及 PostgreSQL / 内存实现
//! - `service`: 业务逻辑
//! - `payment` / `notification`: 外部协作方
//! - `handlers` / `routes` / `middleware`: HTTP 层
//! - `state`: 应用状态

pub mod auth;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod notification;
pub mod payment;
pub mod repository;
pub mod routes;
pub mod service;
pub mod state;

pub use error::{ApiError, Result};
pub use models::{Order, OrderStatus, Product, User};
pub use state::{AppState, Collaborators, Repositories};
