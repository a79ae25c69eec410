//! 电商订单服务
//!
//! 提供用户、商品、订单等 REST API。

use std::sync::Arc;

use anyhow::bail;
use axum::{
    extract::Request,
    http::{HeaderValue, header},
    middleware::{self, Next},
    response::Response,
};
use shop_service::{
    Collaborators, Repositories,
    auth::TokenIssuer,
    notification::EmailNotifier,
    payment::StripeGateway,
    routes,
    state::AppState,
};
use shop_shared::{
    cache::ResponseCache,
    config::{AppConfig, StorageBackend},
    database::Database,
    observability,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load("shop-service")?;
    let _guard = observability::init(&config.service_name, &config.observability).await?;

    info!(
        environment = %config.environment,
        storage = ?config.storage.backend,
        "Starting shop-service on {}",
        config.server_addr()
    );

    // 签名密钥只能来自外部配置
    let tokens = TokenIssuer::new(&config.jwt);
    if !tokens.has_signing_key() {
        if config.is_production() {
            bail!("SHOP_JWT__SECRET must be set in production environment");
        }
        warn!("JWT secret is not configured, login and token refresh will fail");
    }

    let (repos, database) = match config.storage.backend {
        StorageBackend::Postgres => {
            let db = Database::connect(&config.database).await?;
            db.run_migrations(&MIGRATOR).await?;
            (Repositories::postgres(&db), Some(db))
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage, data is lost on restart");
            (Repositories::memory(), None)
        }
    };

    let payments = StripeGateway::new(&config.payment)?;
    if config.payment.secret_key.is_none() {
        warn!("Stripe secret key is not configured, refunds will fail");
    }
    let collaborators = Collaborators {
        payments: Arc::new(payments),
        notifier: Arc::new(EmailNotifier::new(&config.notification)),
    };

    let cache = Arc::new(ResponseCache::new(&config.cache));
    let state = AppState::new(repos, collaborators, tokens, cache, database.clone());

    if let (Some(email), Some(password)) = (
        config.bootstrap.admin_email.as_deref(),
        config.bootstrap.admin_password.as_deref(),
    ) {
        if state.users.bootstrap_admin(email, password).await? {
            info!(email = %email, "Bootstrap admin created");
        }
    }

    let app = routes::app(state)
        .layer(middleware::from_fn(security_headers))
        .layer(cors_layer(config.is_production()));

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    // 收到 SIGTERM 或 Ctrl+C 后停止接收新连接，等待已有请求处理完毕
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(db) = database {
        db.close().await;
    }
    info!("Server shutdown complete");

    Ok(())
}

/// CORS 配置：通过 SHOP_CORS_ORIGINS 控制允许的来源，逗号分隔
fn cors_layer(production: bool) -> CorsLayer {
    let allowed_origins = std::env::var("SHOP_CORS_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000,http://localhost:5173".to_string());

    // 浏览器需要读取登录返回的 Token 响应头
    let exposed = [
        header::HeaderName::from_static("access_token"),
        header::HeaderName::from_static("refresh_token"),
    ];

    if allowed_origins == "*" {
        if production {
            warn!("SHOP_CORS_ORIGINS=\"*\" 在生产环境中不安全，请设置为具体域名");
        }
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers(exposed);
    }

    info!("CORS allowed_origins: {}", allowed_origins);
    let origins: Vec<_> = allowed_origins
        .split(',')
        .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(exposed)
}

/// 为所有响应注入 HTTP 安全头
async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::STRICT_TRANSPORT_SECURITY,
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );
    headers.insert(header::X_XSS_PROTECTION, HeaderValue::from_static("0"));
    response
}

/// 监听关闭信号（SIGTERM / Ctrl+C）
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "注册 Ctrl+C 处理器失败");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "注册 SIGTERM 处理器失败");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}
