//! 商品服务
//!
//! 调价只影响之后的订单，已有订单项保存的是下单时的单价快照

use std::sync::Arc;

use tracing::info;
use validator::Validate;

use crate::dto::{PriceInput, ProductInput, ProductResponse};
use crate::error::{ApiError, Result};
use crate::models::NewProduct;
use crate::repository::ProductRepository;

pub struct ProductService {
    products: Arc<dyn ProductRepository>,
}

impl ProductService {
    pub fn new(products: Arc<dyn ProductRepository>) -> Self {
        Self { products }
    }

    pub async fn list(&self) -> Result<Vec<ProductResponse>> {
        let products = self.products.list().await?;
        Ok(products.iter().map(ProductResponse::from).collect())
    }

    pub async fn create(&self, input: ProductInput) -> Result<ProductResponse> {
        input.validate()?;
        let product = self
            .products
            .create(NewProduct {
                name: input.name,
                description: input.description,
                price: input.price,
            })
            .await?;

        info!(product_id = product.id, "商品已创建");
        Ok(ProductResponse::from(&product))
    }

    pub async fn update_price(&self, id: i64, input: PriceInput) -> Result<ProductResponse> {
        input.validate()?;
        let product = self
            .products
            .update_price(id, input.price)
            .await?
            .ok_or_else(|| ApiError::not_found("productId", "Id given do not match"))?;

        info!(product_id = id, price = %product.price, "商品价格已更新");
        Ok(ProductResponse::from(&product))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockProductRepository;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_update_price_missing_product() {
        let mut products = MockProductRepository::new();
        products.expect_update_price().returning(|_, _| Ok(None));

        let err = ProductService::new(Arc::new(products))
            .update_price(1, PriceInput { price: Decimal::ONE })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_create_rejects_non_positive_price() {
        let mut products = MockProductRepository::new();
        products.expect_create().never();

        let err = ProductService::new(Arc::new(products))
            .create(ProductInput {
                name: "Caneca".into(),
                description: None,
                price: Decimal::ZERO,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
