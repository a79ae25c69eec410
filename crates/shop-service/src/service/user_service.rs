//! 用户服务
//!
//! 注册、管理端用户列表、删除用户、保存收货地址以及初始管理员创建
//!
//! 删除用户会级联删除其订单，成功后失效订单列表和这些订单的全部缓存视图。

use std::sync::Arc;

use futures::future::try_join_all;
use shop_shared::cache::{CacheKey, ORDERS_NAMESPACE, ResponseCache};
use tracing::{info, instrument};
use validator::Validate;

use crate::auth::hash_password;
use crate::dto::{AddressInput, UserAddressResponse, UserDetailResponse, UserInput, UserWithRolesResponse};
use crate::error::{ApiError, Result};
use crate::models::{NewUser, User, roles};
use crate::repository::{OrderRepository, UserRepository};

/// 用户服务
pub struct UserService {
    users: Arc<dyn UserRepository>,
    orders: Arc<dyn OrderRepository>,
    cache: Arc<ResponseCache>,
    /// 密码哈希函数，测试中替换为低 cost 实现
    hasher: fn(&str) -> Result<String>,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        orders: Arc<dyn OrderRepository>,
        cache: Arc<ResponseCache>,
    ) -> Self {
        Self {
            users,
            orders,
            cache,
            hasher: hash_password,
        }
    }

    pub fn with_hasher(mut self, hasher: fn(&str) -> Result<String>) -> Self {
        self.hasher = hasher;
        self
    }

    /// 注册新用户，默认授予 ROLE_USER
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: UserInput) -> Result<UserWithRolesResponse> {
        input.validate()?;

        if self.users.find_by_email(&input.email).await?.is_some() {
            return Err(ApiError::AlreadyExists(input.email));
        }

        let user = self
            .users
            .create(NewUser {
                email: input.email,
                password_hash: (self.hasher)(&input.password)?,
                roles: vec![roles::USER.to_string()],
            })
            .await?;

        info!(user_id = user.id, "用户已注册");
        Ok(UserWithRolesResponse::from(&user))
    }

    /// 所有用户及其角色、地址和订单
    pub async fn list(&self) -> Result<Vec<UserDetailResponse>> {
        let users = self.users.find_all().await?;

        try_join_all(users.iter().map(|user| self.detail(user))).await
    }

    async fn detail(&self, user: &User) -> Result<UserDetailResponse> {
        let (addresses, orders) = tokio::try_join!(
            self.users.list_addresses(user.id),
            self.orders.find_by_user_id(user.id),
        )?;
        Ok(UserDetailResponse::new(user, &addresses, &orders))
    }

    /// 删除用户（角色关联、购物车和订单一并删除）
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<()> {
        // 级联删除之后就查不到订单号了，先记下来
        let order_ids: Vec<i64> = self
            .orders
            .find_by_user_id(id)
            .await?
            .iter()
            .map(|order| order.id)
            .collect();

        if !self.users.delete(id).await? {
            return Err(ApiError::user_not_found());
        }

        self.cache.evict_namespace(ORDERS_NAMESPACE);
        for order_id in &order_ids {
            self.cache.evict_all(CacheKey::order_variants(*order_id));
        }
        info!(user_id = id, orders = order_ids.len(), "用户已删除");
        Ok(())
    }

    /// 为当前用户保存收货地址
    pub async fn add_address(&self, user_id: i64, input: AddressInput) -> Result<UserAddressResponse> {
        input.validate()?;
        let saved = self.users.add_address(user_id, input.into_address()).await?;
        Ok(UserAddressResponse::from(&saved))
    }

    /// 创建初始管理员
    ///
    /// 邮箱已存在时不做任何修改，返回是否新建
    pub async fn bootstrap_admin(&self, email: &str, password: &str) -> Result<bool> {
        if self.users.find_by_email(email).await?.is_some() {
            return Ok(false);
        }

        let admin = self
            .users
            .create(NewUser {
                email: email.to_string(),
                password_hash: (self.hasher)(password)?,
                roles: vec![roles::USER.to_string(), roles::ADMIN.to_string()],
            })
            .await?;

        info!(user_id = admin.id, email, "初始管理员已创建");
        Ok(true)
    }
}
