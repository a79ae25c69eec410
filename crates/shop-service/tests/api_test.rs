//! HTTP 层集成测试
//!
//! 使用内存仓储组装完整路由，支付和通知替换为可控的测试实现

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
};
use serde_json::{Value, json};
use shop_service::{
    Collaborators, Order, OrderStatus, Repositories,
    auth::{TokenIssuer, hash_password_with_cost},
    notification::{NotificationError, OrderNotifier},
    payment::{PaymentError, PaymentGateway, RefundReceipt},
    routes,
    service::UserService,
    state::AppState,
};
use shop_shared::cache::{CacheKey, ResponseCache};
use shop_shared::config::{CacheConfig, JwtConfig};
use tower::ServiceExt;

const ADMIN_EMAIL: &str = "admin@shop.local";
const ADMIN_PASSWORD: &str = "admin-secret";

/// 可切换失败的支付网关
#[derive(Default)]
struct FakeGateway {
    fail: AtomicBool,
    refunded: Mutex<Vec<String>>,
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn refund(&self, payment_intent: &str) -> Result<RefundReceipt, PaymentError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PaymentError::Rejected {
                status: 400,
                message: "Charge has already been refunded".to_string(),
            });
        }
        self.refunded.lock().unwrap().push(payment_intent.to_string());
        Ok(RefundReceipt {
            id: format!("re_{}", payment_intent),
            status: Some("succeeded".to_string()),
        })
    }
}

/// 记录发送内容的通知
#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(String, i64, OrderStatus, OrderStatus)>>,
}

#[async_trait]
impl OrderNotifier for RecordingNotifier {
    async fn status_changed(
        &self,
        recipient: &str,
        order: &Order,
        previous: OrderStatus,
    ) -> Result<(), NotificationError> {
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), order.id, previous, order.status));
        Ok(())
    }
}

struct TestApp {
    app: Router,
    payments: Arc<FakeGateway>,
    notifier: Arc<RecordingNotifier>,
    cache: Arc<ResponseCache>,
}

fn fast_hash(password: &str) -> shop_service::Result<String> {
    hash_password_with_cost(password, 4)
}

async fn setup() -> TestApp {
    let repos = Repositories::memory();
    let payments = Arc::new(FakeGateway::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let cache = Arc::new(ResponseCache::new(&CacheConfig::default()));
    let tokens = TokenIssuer::new(&JwtConfig {
        secret: Some("integration-test-secret".to_string()),
        ..Default::default()
    });

    let users = UserService::new(repos.users.clone(), repos.orders.clone(), cache.clone())
        .with_hasher(fast_hash);
    let state = AppState::new(
        repos,
        Collaborators {
            payments: payments.clone(),
            notifier: notifier.clone(),
        },
        tokens,
        cache.clone(),
        None,
    )
    .with_user_service(users);

    state
        .users
        .bootstrap_admin(ADMIN_EMAIL, ADMIN_PASSWORD)
        .await
        .unwrap();

    TestApp {
        app: routes::app(state),
        payments,
        notifier,
        cache,
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, headers, json)
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::HOST, "shop.test")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::HOST, "shop.test");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

fn login_request(email: &str, password: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/login")
        .header(header::HOST, "shop.test")
        .header(
            header::CONTENT_TYPE,
            "application/x-www-form-urlencoded",
        )
        .body(Body::from(format!(
            "username={}&password={}",
            email, password
        )))
        .unwrap()
}

/// 登录并返回 (access_token, refresh_token)
async fn login(app: &Router, email: &str, password: &str) -> (String, String) {
    let (status, _, body) = send(app, login_request(email, password)).await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    (
        body["data"]["access_token"].as_str().unwrap().to_string(),
        body["data"]["refresh_token"].as_str().unwrap().to_string(),
    )
}

/// 注册并登录，返回 Access Token
async fn register_customer(app: &Router, email: &str) -> String {
    let (status, _, _) = send(
        app,
        json_request(
            "POST",
            "/api/v1/user",
            None,
            json!({ "email": email, "password": "customer-pass" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    login(app, email, "customer-pass").await.0
}

async fn add_address(app: &Router, token: &str) -> i64 {
    let (status, _, body) = send(
        app,
        json_request(
            "POST",
            "/api/v1/user/address",
            Some(token),
            json!({
                "street": "Rua das Flores",
                "number": "42",
                "city": "Curitiba",
                "state": "PR",
                "zipCode": "80000-000"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"]["id"].as_i64().unwrap()
}

async fn create_product(app: &Router, admin: &str, name: &str, price: &str) -> i64 {
    let (status, _, body) = send(
        app,
        json_request(
            "POST",
            "/api/v1/product",
            Some(admin),
            json!({ "name": name, "description": null, "price": price }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create product failed: {}", body);
    body["data"]["id"].as_i64().unwrap()
}

async fn place_order(app: &Router, token: &str, address_id: i64, product_id: i64) -> i64 {
    let (status, _, body) = send(
        app,
        json_request(
            "POST",
            "/api/v1/order",
            Some(token),
            json!({
                "stripeId": "pi_test_123",
                "addressId": address_id,
                "items": [{ "productId": product_id, "quantity": 2 }]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "place order failed: {}", body);
    assert_eq!(body["data"]["status"], "CREATED");
    body["data"]["id"].as_i64().unwrap()
}

/// 顾客 + 一张已下的订单
struct Fixture {
    admin: String,
    customer: String,
    product_id: i64,
    order_id: i64,
}

async fn fixture(t: &TestApp) -> Fixture {
    let (admin, _) = login(&t.app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let customer = register_customer(&t.app, "alice@shop.test").await;
    let address_id = add_address(&t.app, &customer).await;
    let product_id = create_product(&t.app, &admin, "Keyboard", "10.00").await;
    let order_id = place_order(&t.app, &customer, address_id, product_id).await;
    Fixture {
        admin,
        customer,
        product_id,
        order_id,
    }
}

#[tokio::test]
async fn test_health_is_public() {
    let t = setup().await;
    let (status, _, body) = send(&t.app, empty_request("GET", "/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, _, body) = send(&t.app, empty_request("GET", "/ready", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["storage"], "memory");
}

#[tokio::test]
async fn test_login_returns_tokens_in_headers_and_body() {
    let t = setup().await;
    let (status, headers, body) = send(&t.app, login_request(ADMIN_EMAIL, ADMIN_PASSWORD)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(
        headers["access_token"].to_str().unwrap(),
        body["data"]["access_token"].as_str().unwrap()
    );
    assert_eq!(
        headers["refresh_token"].to_str().unwrap(),
        body["data"]["refresh_token"].as_str().unwrap()
    );
}

#[tokio::test]
async fn test_login_with_wrong_password_is_rejected() {
    let t = setup().await;
    let (status, headers, body) = send(&t.app, login_request(ADMIN_EMAIL, "wrong-pass")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "INVALID_CREDENTIALS");
    assert!(headers.get("access_token").is_none());
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let t = setup().await;
    register_customer(&t.app, "bob@shop.test").await;

    let (status, _, body) = send(
        &t.app,
        json_request(
            "POST",
            "/api/v1/user",
            None,
            json!({ "email": "bob@shop.test", "password": "another-pass" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ALREADY_EXISTS");
}

#[tokio::test]
async fn test_protected_route_requires_token() {
    let t = setup().await;
    let (status, _, body) = send(&t.app, empty_request("GET", "/api/v1/order", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _, _) = send(
        &t.app,
        empty_request("GET", "/api/v1/order", Some("not-a-jwt")),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_token_cannot_call_business_routes() {
    let t = setup().await;
    let (_, refresh) = login(&t.app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let (status, _, _) = send(&t.app, empty_request("GET", "/api/v1/order", Some(&refresh))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_customer_cannot_call_admin_routes() {
    let t = setup().await;
    let customer = register_customer(&t.app, "carol@shop.test").await;

    let (status, _, body) = send(&t.app, empty_request("GET", "/api/v1/user", Some(&customer))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, _, _) = send(
        &t.app,
        json_request("PUT", "/api/v1/order/1", Some(&customer), json!("PAID")),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_refresh_reissues_access_token() {
    let t = setup().await;
    let (_, refresh) = login(&t.app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let (status, headers, body) = send(
        &t.app,
        empty_request("GET", "/api/v1/user/refreshToken", Some(&refresh)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["refresh_token"], refresh.as_str());
    assert_eq!(headers["refresh_token"].to_str().unwrap(), refresh);

    // 新的 Access Token 可以访问管理接口
    let access = body["data"]["access_token"].as_str().unwrap();
    let (status, _, _) = send(&t.app, empty_request("GET", "/api/v1/user", Some(access))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_failure_returns_error_message() {
    let t = setup().await;

    let (status, _, body) = send(
        &t.app,
        empty_request("GET", "/api/v1/user/refreshToken", Some("garbage")),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error_message"].is_string());
    assert!(body.get("success").is_none());

    let (status, _, body) = send(
        &t.app,
        empty_request("GET", "/api/v1/user/refreshToken", None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error_message"].is_string());
}

#[tokio::test]
async fn test_foreign_order_is_not_found() {
    let t = setup().await;
    let f = fixture(&t).await;
    let mallory = register_customer(&t.app, "mallory@shop.test").await;

    // 先让所有者把订单视图放进缓存
    let (status, _, _) = send(
        &t.app,
        empty_request("GET", &format!("/api/v1/order/{}", f.order_id), Some(&f.customer)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    for suffix in ["", "/items", "/address", "/items-address"] {
        let uri = format!("/api/v1/order/{}{}", f.order_id, suffix);
        let (status, _, body) = send(&t.app, empty_request("GET", &uri, Some(&mallory))).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(body["code"], "NOT_FOUND");
        assert_eq!(body["fields"][0]["field"], "orderId");
    }

    let (status, _, _) = send(
        &t.app,
        empty_request("DELETE", &format!("/api/v1/order/{}", f.order_id), Some(&mallory)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(t.payments.refunded.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_placing_order_refreshes_cached_list() {
    let t = setup().await;
    let f = fixture(&t).await;

    let (_, _, body) = send(&t.app, empty_request("GET", "/api/v1/order", Some(&f.customer))).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let address_id = add_address(&t.app, &f.customer).await;
    place_order(&t.app, &f.customer, address_id, f.product_id).await;

    let (_, _, body) = send(&t.app, empty_request("GET", "/api/v1/order", Some(&f.customer))).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_order_snapshot_survives_price_change() {
    let t = setup().await;
    let f = fixture(&t).await;

    let (status, _, _) = send(
        &t.app,
        json_request(
            "PUT",
            &format!("/api/v1/product/{}/price", f.product_id),
            Some(&f.admin),
            json!({ "price": "99.00" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, body) = send(
        &t.app,
        empty_request(
            "GET",
            &format!("/api/v1/order/{}/items-address", f.order_id),
            Some(&f.customer),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let item = &body["data"]["items"][0];
    assert_eq!(item["productName"], "Keyboard");
    assert_eq!(item["quantity"], 2);
    assert_eq!(item["unitPrice"], "10.00");
    assert_eq!(body["data"]["address"]["city"], "Curitiba");
}

#[tokio::test]
async fn test_failed_refund_keeps_order() {
    let t = setup().await;
    let f = fixture(&t).await;
    let order_uri = format!("/api/v1/order/{}", f.order_id);

    t.payments.fail.store(true, Ordering::SeqCst);
    let (status, _, body) = send(&t.app, empty_request("DELETE", &order_uri, Some(&f.customer))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "PAYMENT_PROVIDER_ERROR");

    let (status, _, _) = send(&t.app, empty_request("GET", &order_uri, Some(&f.customer))).await;
    assert_eq!(status, StatusCode::OK);

    t.payments.fail.store(false, Ordering::SeqCst);
    let (status, _, body) = send(&t.app, empty_request("DELETE", &order_uri, Some(&f.customer))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);
    assert_eq!(*t.payments.refunded.lock().unwrap(), vec!["pi_test_123"]);

    let (status, _, _) = send(&t.app, empty_request("GET", &order_uri, Some(&f.customer))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, _, body) = send(&t.app, empty_request("GET", "/api/v1/order", Some(&f.customer))).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_status_update_is_visible_in_every_view() {
    let t = setup().await;
    let f = fixture(&t).await;
    let base = format!("/api/v1/order/{}", f.order_id);
    let views = ["", "/items", "/address", "/items-address"];

    for suffix in views {
        let uri = format!("{}{}", base, suffix);
        let (_, _, body) = send(&t.app, empty_request("GET", &uri, Some(&f.customer))).await;
        assert_eq!(body["data"]["status"], "CREATED");
    }
    for key in CacheKey::order_variants(f.order_id) {
        assert!(t.cache.contains(&key), "{} not cached", key);
    }

    let (status, _, body) = send(
        &t.app,
        json_request("PUT", &base, Some(&f.admin), json!("PAID")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "PAID");

    for suffix in views {
        let uri = format!("{}{}", base, suffix);
        let (_, _, body) = send(&t.app, empty_request("GET", &uri, Some(&f.customer))).await;
        assert_eq!(body["data"]["status"], "PAID", "{}", uri);
    }

    let sent = t.notifier.sent.lock().unwrap().clone();
    assert_eq!(
        sent,
        vec![(
            "alice@shop.test".to_string(),
            f.order_id,
            OrderStatus::Created,
            OrderStatus::Paid
        )]
    );
}

#[tokio::test]
async fn test_invalid_status_transition_is_rejected() {
    let t = setup().await;
    let f = fixture(&t).await;
    let base = format!("/api/v1/order/{}", f.order_id);

    let (status, _, body) = send(
        &t.app,
        json_request("PUT", &base, Some(&f.admin), json!("DELIVERED")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_STATUS_TRANSITION");
    assert!(t.notifier.sent.lock().unwrap().is_empty());

    let (status, _, _) = send(
        &t.app,
        json_request("PUT", "/api/v1/order/9999", Some(&f.admin), json!("PAID")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_lists_users_with_orders() {
    let t = setup().await;
    let f = fixture(&t).await;

    let (status, _, body) = send(&t.app, empty_request("GET", "/api/v1/user", Some(&f.admin))).await;
    assert_eq!(status, StatusCode::OK);

    let users = body["data"].as_array().unwrap();
    let alice = users
        .iter()
        .find(|u| u["email"] == "alice@shop.test")
        .unwrap();
    assert_eq!(alice["roles"], json!(["ROLE_USER"]));
    assert_eq!(alice["addresses"].as_array().unwrap().len(), 1);
    assert_eq!(alice["orders"][0]["id"], f.order_id);
}

#[tokio::test]
async fn test_admin_deletes_user() {
    let t = setup().await;
    let f = fixture(&t).await;

    let (_, _, body) = send(&t.app, empty_request("GET", "/api/v1/user", Some(&f.admin))).await;
    let alice_id = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["email"] == "alice@shop.test")
        .unwrap()["id"]
        .as_i64()
        .unwrap();

    // 先把订单列表和订单详情读进缓存
    let order_uri = format!("/api/v1/order/{}", f.order_id);
    let (status, _, _) = send(&t.app, empty_request("GET", &order_uri, Some(&f.customer))).await;
    assert_eq!(status, StatusCode::OK);
    let (_, _, body) = send(&t.app, empty_request("GET", "/api/v1/order", Some(&f.customer))).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert!(t.cache.contains(&CacheKey::order(f.order_id)));

    let uri = format!("/api/v1/user/{}", alice_id);
    let (status, _, _) = send(&t.app, empty_request("DELETE", &uri, Some(&f.admin))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // 订单随用户删除，旧令牌也读不到缓存里的视图
    for key in CacheKey::order_variants(f.order_id) {
        assert!(!t.cache.contains(&key));
    }
    let (status, _, _) = send(&t.app, empty_request("GET", &order_uri, Some(&f.customer))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _, body) = send(&t.app, empty_request("GET", "/api/v1/order", Some(&f.customer))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());

    let (status, _, _) = send(&t.app, empty_request("DELETE", &uri, Some(&f.admin))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send(&t.app, login_request("alice@shop.test", "customer-pass")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
