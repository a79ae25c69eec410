//! 用户与地址模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 角色名称
pub mod roles {
    pub const USER: &str = "ROLE_USER";
    pub const ADMIN: &str = "ROLE_ADMIN";
}

/// 用户实体
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub roles: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// 收货地址
///
/// 既用于用户保存的地址，也用于订单上的地址快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: String,
    pub number: String,
    pub complement: Option<String>,
    pub district: Option<String>,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

/// 用户保存的地址
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAddress {
    pub id: i64,
    pub user_id: i64,
    pub address: Address,
}

/// 待创建的用户
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub roles: Vec<String>,
}
