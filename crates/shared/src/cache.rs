//! 响应缓存模块
//!
//! 进程内读穿透缓存，值为序列化后的响应（`serde_json::Value`）。
//!
//! ## 键与命名空间
//!
//! 键的形式为 `{namespace}:{id}[-{variant}]`，命名空间取第一个 `:` 之前的部分，
//! 可按单键或整个命名空间失效。
//!
//! ## 并发语义
//!
//! - 同一个键的并发未命中只会执行一次加载（single-flight），其余调用等待同一结果
//! - 加载失败不会写入缓存，下一个读取者重新加载
//! - 失效在返回前完成，之后开始的读取一定会重新加载

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

use crate::config::CacheConfig;
use crate::error::ShopError;

/// 用户订单列表的命名空间
pub const ORDERS_NAMESPACE: &str = "orders";
/// 单个订单视图的命名空间
pub const ORDER_NAMESPACE: &str = "order";

type Slot = Arc<OnceCell<Value>>;

/// 响应缓存
#[derive(Debug)]
pub struct ResponseCache {
    entries: DashMap<String, Slot>,
    enabled: bool,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

impl ResponseCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            enabled: config.enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// 读取缓存，未命中时调用 loader 加载并写入
    ///
    /// 并发调用同一个键时 loader 只会执行一次。loader 返回错误时不缓存。
    #[instrument(skip(self, loader))]
    pub async fn get_or_load<T, E, F, Fut>(&self, key: &str, loader: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<ShopError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.enabled {
            return loader().await;
        }

        let namespace = namespace_of(key);
        let slot = self.slot(key);

        if let Some(value) = slot.get() {
            metrics::counter!("cache_hits_total", "namespace" => namespace.to_string())
                .increment(1);
            debug!(key, "cache hit");
            return decode(key, value).map_err(E::from);
        }

        let value = slot
            .get_or_try_init(|| async move {
                metrics::counter!("cache_misses_total", "namespace" => namespace.to_string())
                    .increment(1);
                debug!(key, "cache miss, loading");

                let fresh = loader().await?;
                serde_json::to_value(&fresh).map_err(|source| {
                    E::from(ShopError::CacheSerialization {
                        key: key.to_string(),
                        source,
                    })
                })
            })
            .await?;

        decode(key, value).map_err(E::from)
    }

    /// 失效单个键
    pub fn evict(&self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            metrics::counter!("cache_evictions_total", "namespace" => namespace_of(key).to_string())
                .increment(1);
            debug!(key, "cache entry evicted");
        }
        removed
    }

    /// 批量失效多个键，返回实际删除的数量
    pub fn evict_all<I, S>(&self, keys: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        keys.into_iter()
            .filter(|key| self.evict(key.as_ref()))
            .count()
    }

    /// 失效整个命名空间
    pub fn evict_namespace(&self, namespace: &str) -> usize {
        let prefix = format!("{}:", namespace);
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(&prefix));
        let removed = before.saturating_sub(self.entries.len());

        metrics::counter!("cache_evictions_total", "namespace" => namespace.to_string())
            .increment(removed as u64);
        debug!(namespace, removed, "cache namespace evicted");
        removed
    }

    /// 键是否已有缓存值（加载中的不算）
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|slot| slot.initialized())
    }

    /// 已缓存的条目数
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.value().initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// 取出（或创建）键对应的槽位，不跨 await 持有分片锁
    fn slot(&self, key: &str) -> Slot {
        if let Some(slot) = self.entries.get(key) {
            return slot.value().clone();
        }
        self.entries.entry(key.to_string()).or_default().value().clone()
    }
}

fn namespace_of(key: &str) -> &str {
    key.split_once(':').map_or(key, |(namespace, _)| namespace)
}

fn decode<T: DeserializeOwned>(key: &str, value: &Value) -> Result<T, ShopError> {
    T::deserialize(value).map_err(|source| ShopError::CacheSerialization {
        key: key.to_string(),
        source,
    })
}

/// 缓存键生成器
pub struct CacheKey;

impl CacheKey {
    /// 用户订单列表：`orders:{userId}`
    pub fn orders(user_id: i64) -> String {
        format!("{}:{}", ORDERS_NAMESPACE, user_id)
    }

    /// 订单（不含明细和地址）：`order:{orderId}`
    pub fn order(order_id: i64) -> String {
        format!("{}:{}", ORDER_NAMESPACE, order_id)
    }

    /// 订单 + 明细：`order:{orderId}-items`
    pub fn order_items(order_id: i64) -> String {
        format!("{}:{}-items", ORDER_NAMESPACE, order_id)
    }

    /// 订单 + 地址：`order:{orderId}-address`
    pub fn order_address(order_id: i64) -> String {
        format!("{}:{}-address", ORDER_NAMESPACE, order_id)
    }

    /// 订单 + 明细 + 地址：`order:{orderId}-items-address`
    pub fn order_items_address(order_id: i64) -> String {
        format!("{}:{}-items-address", ORDER_NAMESPACE, order_id)
    }

    /// 某个订单的全部视图键
    pub fn order_variants(order_id: i64) -> [String; 4] {
        [
            Self::order(order_id),
            Self::order_items(order_id),
            Self::order_address(order_id),
            Self::order_items_address(order_id),
        ]
    }
}
