//! 用户仓储（PostgreSQL）
//!
//! 用户、角色关联以及用户保存的收货地址

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::order_repo::AddressRow;
use super::traits::UserRepository;
use crate::error::{ApiError, Result};
use crate::models::{Address, NewUser, User, UserAddress};

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i64,
    email: String,
    password_hash: String,
    roles: Vec<String>,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            roles: row.roles,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserAddressRow {
    id: i64,
    user_id: i64,
    #[sqlx(flatten)]
    address: AddressRow,
}

impl From<UserAddressRow> for UserAddress {
    fn from(row: UserAddressRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            address: row.address.into(),
        }
    }
}

/// 用户与角色聚合查询，角色名聚合为 text[]
const SELECT_USER_WITH_ROLES: &str = r#"
    SELECT u.id, u.email, u.password_hash, u.created_at,
           COALESCE(
               array_agg(r.name::text ORDER BY r.name) FILTER (WHERE r.name IS NOT NULL),
               ARRAY[]::text[]
           ) AS roles
    FROM users u
    LEFT JOIN user_roles ur ON ur.user_id = u.id
    LEFT JOIN roles r ON r.id = ur.role_id
"#;

/// 用户仓储
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_all(&self) -> Result<Vec<User>> {
        let sql = format!("{} GROUP BY u.id ORDER BY u.id ASC", SELECT_USER_WITH_ROLES);
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("{} WHERE u.id = $1 GROUP BY u.id", SELECT_USER_WITH_ROLES);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(User::from))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("{} WHERE u.email = $1 GROUP BY u.id", SELECT_USER_WITH_ROLES);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(User::from))
    }

    async fn create(&self, user: NewUser) -> Result<User> {
        let mut tx = self.pool.begin().await?;

        let inserted: std::result::Result<(i64, DateTime<Utc>), sqlx::Error> = sqlx::query_as(
            r#"
            INSERT INTO users (email, password_hash, created_at)
            VALUES ($1, $2, NOW())
            RETURNING id, created_at
            "#,
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&mut *tx)
        .await;

        let (id, created_at) = match inserted {
            Ok(row) => row,
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                return Err(ApiError::AlreadyExists(user.email));
            }
            Err(e) => return Err(e.into()),
        };

        for role in &user.roles {
            sqlx::query(
                r#"
                INSERT INTO user_roles (user_id, role_id)
                SELECT $1, id FROM roles WHERE name = $2
                "#,
            )
            .bind(id)
            .bind(role)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        let mut roles = user.roles;
        roles.sort();
        Ok(User {
            id,
            email: user.email,
            password_hash: user.password_hash,
            roles,
            created_at,
        })
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        // 角色关联和购物车没有级联外键，需要先显式删除
        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    async fn add_address(&self, user_id: i64, address: Address) -> Result<UserAddress> {
        let row = sqlx::query_as::<_, UserAddressRow>(
            r#"
            INSERT INTO user_addresses
                (user_id, street, number, complement, district, city, state, zip_code)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, user_id, street, number, complement, district, city, state, zip_code
            "#,
        )
        .bind(user_id)
        .bind(&address.street)
        .bind(&address.number)
        .bind(&address.complement)
        .bind(&address.district)
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.zip_code)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn find_address(&self, user_id: i64, address_id: i64) -> Result<Option<UserAddress>> {
        let row = sqlx::query_as::<_, UserAddressRow>(
            r#"
            SELECT id, user_id, street, number, complement, district, city, state, zip_code
            FROM user_addresses
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(address_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserAddress::from))
    }

    async fn list_addresses(&self, user_id: i64) -> Result<Vec<UserAddress>> {
        let rows = sqlx::query_as::<_, UserAddressRow>(
            r#"
            SELECT id, user_id, street, number, complement, district, city, state, zip_code
            FROM user_addresses
            WHERE user_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(UserAddress::from).collect())
    }
}
