//! 请求 DTO 定义
//!
//! 包含所有 API 请求的数据结构和验证规则

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::Address;

fn validate_positive_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() || price.is_zero() {
        let mut err = ValidationError::new("positive_price");
        err.message = Some("价格必须大于 0".into());
        return Err(err);
    }
    Ok(())
}

// ==================== 订单 ====================

/// 下单请求
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderInput {
    /// 支付平台的 payment intent ID
    #[validate(length(min = 1, max = 255, message = "支付凭证不能为空"))]
    pub stripe_id: String,
    /// 用户已保存的收货地址 ID
    pub address_id: i64,
    #[validate(length(min = 1, message = "订单至少包含一个商品"), nested)]
    pub items: Vec<OrderItemInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemInput {
    pub product_id: i64,
    #[validate(range(min = 1, message = "商品数量必须大于 0"))]
    pub quantity: i32,
}

// ==================== 用户 ====================

/// 注册请求
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UserInput {
    #[validate(email(message = "邮箱格式不正确"))]
    pub email: String,
    #[validate(length(min = 6, max = 128, message = "密码长度必须在6-128个字符之间"))]
    pub password: String,
}

/// 登录表单（application/x-www-form-urlencoded）
#[derive(Debug, Clone, Deserialize)]
pub struct LoginForm {
    /// 登录邮箱
    pub username: String,
    pub password: String,
}

/// 保存收货地址请求
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddressInput {
    #[validate(length(min = 1, max = 255, message = "街道不能为空"))]
    pub street: String,
    #[validate(length(min = 1, max = 20, message = "门牌号不能为空"))]
    pub number: String,
    pub complement: Option<String>,
    pub district: Option<String>,
    #[validate(length(min = 1, max = 100, message = "城市不能为空"))]
    pub city: String,
    #[validate(length(min = 1, max = 50, message = "州/省不能为空"))]
    pub state: String,
    #[validate(length(min = 1, max = 20, message = "邮编不能为空"))]
    pub zip_code: String,
}

impl AddressInput {
    pub fn into_address(self) -> Address {
        Address {
            street: self.street,
            number: self.number,
            complement: self.complement,
            district: self.district,
            city: self.city,
            state: self.state,
            zip_code: self.zip_code,
        }
    }
}

// ==================== 商品 ====================

/// 创建商品请求
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProductInput {
    #[validate(length(min = 1, max = 100, message = "商品名称长度必须在1-100个字符之间"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(custom(function = "validate_positive_price"))]
    pub price: Decimal,
}

/// 商品调价请求
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PriceInput {
    #[validate(custom(function = "validate_positive_price"))]
    pub price: Decimal,
}
