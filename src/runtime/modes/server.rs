//! Server mode
//!
//! This module contains the HTTP server startup logic.
//! It configures and starts the HTTP server with all necessary routes.

use actix_cors::Cors;
use actix_web::{
    App, HttpServer,
    middleware::{Compress, DefaultHeaders},
    web,
};
use anyhow::{Context, Result};
use tracing::warn;

use crate::api::constants::CSRF_HEADER_NAME;
use crate::api::middleware::RequestIdMiddleware;
use crate::api::services::{AppStartTime, api_routes, body_configs, health_routes, media_routes};
use crate::config::CorsConfig;
use crate::runtime::lifetime;
use crate::services::AppServices;

/// multipart 之外的原始 payload 上限留一点余量给表单字段
const PAYLOAD_OVERHEAD_BYTES: u64 = 1024 * 1024;

/// Validate CORS configuration at startup (runs once)
///
/// 返回发现的问题，同时写日志
fn validate_cors_config(cors_config: &CorsConfig) -> Vec<&'static str> {
    let mut issues = Vec::new();
    if !cors_config.enabled {
        return issues;
    }

    if cors_config.allowed_origins.is_empty() {
        warn!(
            "CORS enabled but allowed_origins is empty. \
            No cross-origin requests will be allowed. \
            Set allowed_origins explicitly or use '[\"*\"]' for any origin."
        );
        issues.push("allowed_origins is empty");
    }

    let is_any_origin = cors_config.allowed_origins.iter().any(|o| o == "*");
    if is_any_origin && cors_config.allow_credentials {
        tracing::error!(
            "SECURITY WARNING: allow_any_origin + allow_credentials is a dangerous combination! \
            Disabling credentials for safety."
        );
        issues.push("allow_credentials ignored for any origin");
    }
    issues
}

/// Build CORS middleware from configuration
fn build_cors_middleware(cors_config: &CorsConfig) -> Cors {
    // 未启用时保持浏览器默认的同源策略
    if !cors_config.enabled {
        return Cors::default();
    }

    let mut cors = Cors::default();
    let is_any_origin = cors_config.allowed_origins.iter().any(|o| o == "*");

    // 空列表 = 只允许同源
    if is_any_origin {
        cors = cors.allow_any_origin();
    } else {
        for origin in &cors_config.allowed_origins {
            cors = cors.allowed_origin(origin);
        }
    }

    cors = cors
        .allowed_methods(vec!["GET", "HEAD", "POST", "PUT", "DELETE", "OPTIONS"])
        .allowed_header(actix_web::http::header::CONTENT_TYPE)
        .allowed_header(actix_web::http::header::AUTHORIZATION)
        .allowed_header(actix_web::http::header::ACCEPT)
        .allowed_header(CSRF_HEADER_NAME)
        .allowed_header("X-Request-ID")
        .expose_headers(vec!["X-Request-ID"])
        .max_age(cors_config.max_age as usize);

    // any origin + credentials 会让任意站点带 cookie 跨域
    if cors_config.allow_credentials && !is_any_origin {
        cors = cors.supports_credentials();
    }

    cors
}

/// 注册共享状态和全部路由
///
/// 服务器和集成测试共用，保证两边的路由表一致。
pub fn configure_app(
    cfg: &mut web::ServiceConfig,
    services: &AppServices,
    app_start_time: &AppStartTime,
) {
    let payload_limit = services.media.max_upload_bytes() + PAYLOAD_OVERHEAD_BYTES;
    let public_prefix = services.media.public_prefix().to_string();

    cfg.app_data(web::Data::new(services.storage.clone()))
        .app_data(web::Data::new(services.media.clone()))
        .app_data(web::Data::new(services.accounts.clone()))
        .app_data(web::Data::new(services.posts.clone()))
        .app_data(web::Data::new(services.social.clone()))
        .app_data(web::Data::new(services.groups.clone()))
        .app_data(web::Data::new(app_start_time.clone()))
        .app_data(web::PayloadConfig::new(payload_limit as usize))
        .configure(body_configs)
        .service(health_routes())
        .service(media_routes(&public_prefix))
        .service(api_routes());
}

/// Run the HTTP server
///
/// This function:
/// 1. Records startup time
/// 2. Prepares server components (storage, services, upload dirs)
/// 3. Configures and starts the HTTP server
/// 4. Listens for graceful shutdown signals
///
/// **Note**: Logging system must be initialized before calling this function
pub async fn run_server() -> Result<()> {
    let app_start_time = AppStartTime::now();

    let services = lifetime::startup::prepare_server_startup()
        .await
        .inspect_err(|e| tracing::error!("Server startup failed: {:#}", e))?;

    let config = crate::config::get_config();
    let cors_config = config.cors.clone();
    validate_cors_config(&cors_config);

    let cpu_count = config.server.cpu_count.clamp(1, 32);
    warn!("Using {} CPU cores for the server", cpu_count);

    if config.auth.trusted_proxies.is_empty() {
        warn!("Login rate limiting keys on the TCP peer address (no trusted proxies configured)");
    } else {
        warn!(
            "Login rate limiting: trusted proxies configured: {:?}",
            config.auth.trusted_proxies
        );
    }

    // Clone db reference before services move into HttpServer closure
    let db_for_shutdown = services.storage.get_db().clone();

    let bind_address = format!("{}:{}", config.server.host, config.server.port);

    let server = HttpServer::new(move || {
        let cors = build_cors_middleware(&cors_config);
        let services = services.clone();
        let app_start_time = app_start_time.clone();

        App::new()
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("X-Frame-Options", "DENY")),
            )
            .wrap(Compress::default())
            .wrap(cors)
            .wrap(RequestIdMiddleware) // 最外层，后续日志都带 request_id
            .configure(move |cfg| configure_app(cfg, &services, &app_start_time))
    })
    .keep_alive(std::time::Duration::from_secs(30))
    .client_request_timeout(std::time::Duration::from_millis(5000))
    .client_disconnect_timeout(std::time::Duration::from_millis(1000))
    .workers(cpu_count);

    warn!("Starting server at http://{}", bind_address);
    let server = server
        .bind(&bind_address)
        .with_context(|| format!("Failed to bind {}", bind_address))?
        .run();

    // Wait for server or shutdown signal
    tokio::select! {
        res = server => {
            res?;
        }
        _ = lifetime::shutdown::listen_for_shutdown(&db_for_shutdown) => {
            warn!("Graceful shutdown: all tasks completed");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::{Method, header};
    use actix_web::{HttpResponse, test};

    fn cors(enabled: bool, origins: &[&str], allow_credentials: bool) -> CorsConfig {
        CorsConfig {
            enabled,
            allowed_origins: origins.iter().map(|o| o.to_string()).collect(),
            allow_credentials,
            max_age: 60,
        }
    }

    /// 发一个预检请求，返回 (Allow-Origin, 是否允许带凭据)
    async fn preflight(config: &CorsConfig, origin: &str) -> (Option<String>, bool) {
        let app = test::init_service(
            App::new()
                .wrap(build_cors_middleware(config))
                .route(
                    "/api/feed",
                    web::get().to(|| async { HttpResponse::Ok().finish() }),
                ),
        )
        .await;
        let req = test::TestRequest::default()
            .method(Method::OPTIONS)
            .uri("/api/feed")
            .insert_header((header::ORIGIN, origin))
            .insert_header((header::ACCESS_CONTROL_REQUEST_METHOD, "GET"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let allow_origin = resp
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let credentials = resp
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_CREDENTIALS);
        (allow_origin, credentials)
    }

    #[::core::prelude::v1::test]
    fn test_cors_validation_issues() {
        assert!(validate_cors_config(&cors(false, &["*"], true)).is_empty());
        assert!(validate_cors_config(&cors(true, &["https://app.example"], true)).is_empty());
        assert_eq!(
            validate_cors_config(&cors(true, &["*"], true)),
            vec!["allow_credentials ignored for any origin"]
        );
        assert_eq!(
            validate_cors_config(&cors(true, &[], false)),
            vec!["allowed_origins is empty"]
        );
    }

    #[actix_rt::test]
    async fn test_disabled_cors_keeps_same_origin() {
        let (allow_origin, credentials) =
            preflight(&cors(false, &["*"], true), "https://evil.example").await;
        assert_eq!(allow_origin, None);
        assert!(!credentials);
    }

    #[actix_rt::test]
    async fn test_cors_allows_listed_origin_with_credentials() {
        let config = cors(true, &["https://app.example"], true);
        let (allow_origin, credentials) = preflight(&config, "https://app.example").await;
        assert_eq!(allow_origin.as_deref(), Some("https://app.example"));
        assert!(credentials);

        let (allow_origin, _) = preflight(&config, "https://evil.example").await;
        assert_eq!(allow_origin, None);
    }

    #[actix_rt::test]
    async fn test_any_origin_never_sends_credentials() {
        let (allow_origin, credentials) =
            preflight(&cors(true, &["*"], true), "https://evil.example").await;
        assert!(allow_origin.is_some());
        assert!(!credentials);
    }
}
