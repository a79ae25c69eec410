//! 订单仓储（PostgreSQL）
//!
//! 订单项和地址快照按加载计划单独查询，列表查询只返回订单本身

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use super::traits::OrderRepository;
use crate::error::Result;
use crate::models::{Address, NewOrder, Order, OrderFetch, OrderItem, OrderStatus};

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i64,
    user_id: i64,
    stripe_id: String,
    status: OrderStatus,
    created_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            stripe_id: row.stripe_id,
            status: row.status,
            created_at: row.created_at,
            items: None,
            address: None,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: i64,
    order_id: i64,
    product_id: i64,
    product_name: String,
    quantity: i32,
    unit_price: Decimal,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            product_name: row.product_name,
            quantity: row.quantity,
            unit_price: row.unit_price,
        }
    }
}

/// 地址行（订单快照和用户地址共用列结构）
#[derive(Debug, sqlx::FromRow)]
pub(super) struct AddressRow {
    pub street: String,
    pub number: String,
    pub complement: Option<String>,
    pub district: Option<String>,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

impl From<AddressRow> for Address {
    fn from(row: AddressRow) -> Self {
        Self {
            street: row.street,
            number: row.number,
            complement: row.complement,
            district: row.district,
            city: row.city,
            state: row.state,
            zip_code: row.zip_code,
        }
    }
}

/// 订单仓储
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_items(&self, order_id: i64) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query_as::<_, OrderItemRow>(
            r#"
            SELECT id, order_id, product_id, product_name, quantity, unit_price
            FROM order_items
            WHERE order_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(OrderItem::from).collect())
    }

    async fn load_address(&self, order_id: i64) -> Result<Option<Address>> {
        let row = sqlx::query_as::<_, AddressRow>(
            r#"
            SELECT street, number, complement, district, city, state, zip_code
            FROM order_addresses
            WHERE order_id = $1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Address::from))
    }

    /// 按加载计划补全订单项和地址
    async fn hydrate(&self, row: Option<OrderRow>, fetch: OrderFetch) -> Result<Option<Order>> {
        let Some(row) = row else {
            return Ok(None);
        };

        let mut order = Order::from(row);
        if fetch.items {
            order.items = Some(self.load_items(order.id).await?);
        }
        if fetch.address {
            order.address = self.load_address(order.id).await?;
        }
        Ok(Some(order))
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn find_by_user_id(&self, user_id: i64) -> Result<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, user_id, stripe_id, status, created_at
            FROM orders
            WHERE user_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Order::from).collect())
    }

    async fn find_by_id_and_user_id(
        &self,
        id: i64,
        user_id: i64,
        fetch: OrderFetch,
    ) -> Result<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, user_id, stripe_id, status, created_at
            FROM orders
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        self.hydrate(row, fetch).await
    }

    async fn find_by_id(&self, id: i64, fetch: OrderFetch) -> Result<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, user_id, stripe_id, status, created_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        self.hydrate(row, fetch).await
    }

    async fn create(&self, new_order: NewOrder) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            INSERT INTO orders (user_id, stripe_id, status, created_at)
            VALUES ($1, $2, $3, NOW())
            RETURNING id, user_id, stripe_id, status, created_at
            "#,
        )
        .bind(new_order.user_id)
        .bind(&new_order.stripe_id)
        .bind(new_order.status)
        .fetch_one(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(new_order.items.len());
        for item in &new_order.items {
            let item_row = sqlx::query_as::<_, OrderItemRow>(
                r#"
                INSERT INTO order_items (order_id, product_id, product_name, quantity, unit_price)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, order_id, product_id, product_name, quantity, unit_price
                "#,
            )
            .bind(row.id)
            .bind(item.product_id)
            .bind(&item.product_name)
            .bind(item.quantity)
            .bind(item.unit_price)
            .fetch_one(&mut *tx)
            .await?;
            items.push(OrderItem::from(item_row));
        }

        let address = &new_order.address;
        sqlx::query(
            r#"
            INSERT INTO order_addresses
                (order_id, street, number, complement, district, city, state, zip_code)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(row.id)
        .bind(&address.street)
        .bind(&address.number)
        .bind(&address.complement)
        .bind(&address.district)
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.zip_code)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let mut order = Order::from(row);
        order.items = Some(items);
        order.address = Some(new_order.address);
        Ok(order)
    }

    async fn update_status(
        &self,
        id: i64,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            UPDATE orders SET status = $2
            WHERE id = $1 AND status = $3
            RETURNING id, user_id, stripe_id, status, created_at
            "#,
        )
        .bind(id)
        .bind(to)
        .bind(from)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Order::from))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        // order_items / order_addresses 通过外键级联删除
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
