//! 订单服务
//!
//! 订单查询（经过响应缓存）、下单、状态流转和退款。
//!
//! ## 缓存一致性
//!
//! - 下单：失效整个 `orders` 命名空间
//! - 退款：失效 `orders` 命名空间和该订单的四个 `order:{id}*` 视图
//! - 状态变更：同退款
//!
//! 状态变更以读到的旧状态为条件写入；同一订单的并发退款只放行一个。
//!
//! 失效只在写操作成功之后执行。`order:{id}` 键不区分用户，
//! 命中缓存后仍需校验订单归属。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;
use serde::de::DeserializeOwned;
use shop_shared::cache::{CacheKey, ORDERS_NAMESPACE, ResponseCache};
use shop_shared::observability::metrics;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::dto::{
    OrderInput, OrderResponse, OrderWithAddressResponse, OrderWithItemsAndAddressResponse,
    OrderWithItemsResponse, OwnedByUser,
};
use crate::error::{ApiError, Result};
use crate::models::{NewOrder, NewOrderItem, Order, OrderFetch, OrderStatus};
use crate::notification::OrderNotifier;
use crate::payment::PaymentGateway;
use crate::repository::{OrderRepository, ProductRepository, UserRepository};

/// 订单服务
pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    products: Arc<dyn ProductRepository>,
    users: Arc<dyn UserRepository>,
    payments: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn OrderNotifier>,
    cache: Arc<ResponseCache>,
    /// 正在退款的订单
    refunds_in_flight: DashMap<i64, ()>,
}

/// 同一订单同一时刻只允许一个退款请求，释放时移除标记
struct RefundGuard<'a> {
    in_flight: &'a DashMap<i64, ()>,
    id: i64,
}

impl<'a> RefundGuard<'a> {
    fn acquire(in_flight: &'a DashMap<i64, ()>, id: i64) -> Option<Self> {
        match in_flight.entry(id) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(());
                Some(Self { in_flight, id })
            }
        }
    }
}

impl Drop for RefundGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.remove(&self.id);
    }
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        products: Arc<dyn ProductRepository>,
        users: Arc<dyn UserRepository>,
        payments: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn OrderNotifier>,
        cache: Arc<ResponseCache>,
    ) -> Self {
        Self {
            orders,
            products,
            users,
            payments,
            notifier,
            cache,
            refunds_in_flight: DashMap::new(),
        }
    }

    // ==================== 查询 ====================

    /// 当前用户的订单列表
    #[instrument(skip(self))]
    pub async fn list(&self, user_id: i64) -> Result<Vec<OrderResponse>> {
        let orders = &self.orders;
        self.cache
            .get_or_load(&CacheKey::orders(user_id), || async move {
                let list = orders.find_by_user_id(user_id).await?;
                Ok::<_, ApiError>(list.iter().map(OrderResponse::from).collect())
            })
            .await
    }

    pub async fn get(&self, id: i64, user_id: i64) -> Result<OrderResponse> {
        self.cached_view(CacheKey::order(id), id, user_id, OrderFetch::BARE)
            .await
    }

    pub async fn get_with_items(&self, id: i64, user_id: i64) -> Result<OrderWithItemsResponse> {
        self.cached_view(CacheKey::order_items(id), id, user_id, OrderFetch::ITEMS)
            .await
    }

    pub async fn get_with_address(
        &self,
        id: i64,
        user_id: i64,
    ) -> Result<OrderWithAddressResponse> {
        self.cached_view(CacheKey::order_address(id), id, user_id, OrderFetch::ADDRESS)
            .await
    }

    pub async fn get_with_items_and_address(
        &self,
        id: i64,
        user_id: i64,
    ) -> Result<OrderWithItemsAndAddressResponse> {
        self.cached_view(
            CacheKey::order_items_address(id),
            id,
            user_id,
            OrderFetch::FULL,
        )
        .await
    }

    /// 读取单个订单视图
    ///
    /// 未命中时按归属用户加载；命中的缓存值属于其他用户时视为不存在
    async fn cached_view<T>(
        &self,
        key: String,
        id: i64,
        user_id: i64,
        fetch: OrderFetch,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned + OwnedByUser + for<'a> From<&'a Order>,
    {
        let orders = &self.orders;
        let view: T = self
            .cache
            .get_or_load(&key, || async move {
                let order = orders
                    .find_by_id_and_user_id(id, user_id, fetch)
                    .await?
                    .ok_or_else(ApiError::order_not_found)?;
                Ok::<_, ApiError>(T::from(&order))
            })
            .await?;

        if view.owner_id() != user_id {
            return Err(ApiError::order_not_found());
        }
        Ok(view)
    }

    // ==================== 写操作 ====================

    /// 下单
    ///
    /// 商品单价和收货地址在此刻快照，订单初始状态为 CREATED
    #[instrument(skip(self, input), fields(items = input.items.len()))]
    pub async fn save(
        &self,
        user_id: i64,
        input: OrderInput,
    ) -> Result<OrderWithItemsAndAddressResponse> {
        input.validate()?;

        let product_ids: Vec<i64> = input
            .items
            .iter()
            .map(|i| i.product_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let products: HashMap<i64, _> = self
            .products
            .find_by_ids(&product_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let items = input
            .items
            .iter()
            .map(|item| {
                let product = products.get(&item.product_id).ok_or_else(|| {
                    ApiError::Validation(format!("商品不存在: {}", item.product_id))
                })?;
                Ok(NewOrderItem {
                    product_id: product.id,
                    product_name: product.name.clone(),
                    quantity: item.quantity,
                    unit_price: product.price,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let address = self
            .users
            .find_address(user_id, input.address_id)
            .await?
            .ok_or_else(|| ApiError::Validation(format!("收货地址不存在: {}", input.address_id)))?
            .address;

        let order = self
            .orders
            .create(NewOrder {
                user_id,
                stripe_id: input.stripe_id,
                status: OrderStatus::Created,
                items,
                address,
            })
            .await?;

        self.cache.evict_namespace(ORDERS_NAMESPACE);
        metrics::record_order_created();
        info!(order_id = order.id, user_id, "订单已创建");

        Ok(OrderWithItemsAndAddressResponse::from(&order))
    }

    /// 变更订单状态（管理员）
    ///
    /// 状态持久化后通知下单用户，通知失败不回滚状态
    #[instrument(skip(self))]
    pub async fn update_status(&self, id: i64, next: OrderStatus) -> Result<OrderResponse> {
        let current = self
            .orders
            .find_by_id(id, OrderFetch::BARE)
            .await?
            .ok_or_else(ApiError::order_not_found)?;

        let previous = current.status;
        if !previous.can_transition_to(next) {
            return Err(ApiError::InvalidTransition {
                from: previous,
                to: next,
            });
        }

        // 以读到的状态为条件写入，并发变更只有一个能成功
        let Some(updated) = self.orders.update_status(id, previous, next).await? else {
            let current = self
                .orders
                .find_by_id(id, OrderFetch::BARE)
                .await?
                .ok_or_else(ApiError::order_not_found)?;
            warn!(order_id = id, expected = %previous, actual = %current.status, "订单状态已被并发修改");
            return Err(ApiError::InvalidTransition {
                from: current.status,
                to: next,
            });
        };

        self.evict_order(id);
        metrics::record_order_status_update(previous.as_str(), next.as_str());
        info!(order_id = id, from = %previous, to = %next, "订单状态已变更");

        self.notify_owner(&updated, previous).await;

        Ok(OrderResponse::from(&updated))
    }

    async fn notify_owner(&self, order: &Order, previous: OrderStatus) {
        let owner = match self.users.find_by_id(order.user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                warn!(order_id = order.id, user_id = order.user_id, "订单用户不存在，跳过通知");
                return;
            }
            Err(e) => {
                warn!(order_id = order.id, error = %e, "查询订单用户失败，跳过通知");
                return;
            }
        };

        if let Err(e) = self
            .notifier
            .status_changed(&owner.email, order, previous)
            .await
        {
            warn!(order_id = order.id, error = %e, "订单状态通知发送失败");
        }
    }

    /// 退款并删除订单
    ///
    /// 先调用支付平台退款，成功后才删除订单；退款失败时订单保持不变
    #[instrument(skip(self))]
    pub async fn refund(&self, id: i64, user_id: i64) -> Result<()> {
        let order = self.find_owned(id, user_id).await?;

        let _guard = RefundGuard::acquire(&self.refunds_in_flight, id)
            .ok_or_else(|| ApiError::Conflict(format!("订单 {} 正在退款", id)))?;
        // 拿到标记前订单可能已被另一个请求退款删除
        let order = match self.find_owned(id, user_id).await {
            Ok(current) => current,
            Err(e) => {
                info!(order_id = id, stripe_id = %order.stripe_id, "订单已被并发退款");
                return Err(e);
            }
        };

        if let Err(e) = self.payments.refund(&order.stripe_id).await {
            metrics::record_order_refund("failed");
            warn!(order_id = id, stripe_id = %order.stripe_id, error = %e, "订单退款失败");
            return Err(ApiError::PaymentProvider(e.to_string()));
        }

        self.orders.delete(id).await?;

        self.evict_order(id);
        metrics::record_order_refund("succeeded");
        info!(order_id = id, user_id, "订单已退款并删除");

        Ok(())
    }

    async fn find_owned(&self, id: i64, user_id: i64) -> Result<Order> {
        self.orders
            .find_by_id_and_user_id(id, user_id, OrderFetch::BARE)
            .await?
            .ok_or_else(ApiError::order_not_found)
    }

    /// 失效订单列表和该订单的全部视图
    fn evict_order(&self, id: i64) {
        self.cache.evict_namespace(ORDERS_NAMESPACE);
        self.cache.evict_all(CacheKey::order_variants(id));
    }
}
