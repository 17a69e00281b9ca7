//! 认证相关端点：注册、登录、刷新、登出、当前用户

use std::net::IpAddr;
use std::sync::Arc;

use actix_governor::{Governor, GovernorConfigBuilder, KeyExtractor, SimpleKeyExtractionError};
use actix_web::dev::ServiceRequest;
use actix_web::http::StatusCode;
use actix_web::http::header::{self, HeaderValue};
use actix_web::{HttpRequest, HttpResponse, HttpResponseBuilder, web};
use governor::NotUntil;
use governor::clock::{Clock, DefaultClock, QuantaInstant};
use governor::middleware::NoOpMiddleware;
use tracing::{debug, info, warn};

use crate::api::jwt::get_jwt_service;
use crate::api::middleware::AuthenticatedUser;
use crate::config::get_config;
use crate::errors::{AgoraError, Result};
use crate::services::{AccountService, SignupRequest};
use crate::storage::User;
use crate::utils::generate_secure_token;

use super::helpers::{
    CookieBuilder, JsonOrForm, api_result, error_from_agora, error_response, json_response,
    success_response,
};
use super::types::{AuthResponse, LoginRequest, MessageResponse, RefreshRequest};
use super::ErrorCode;

/// 基于 IP 的限流 key
///
/// 默认使用 TCP 对端地址；只有对端是配置的可信代理时才采信 X-Forwarded-For。
#[derive(Clone, Copy)]
pub struct LoginKeyExtractor;

impl KeyExtractor for LoginKeyExtractor {
    type Key = String;
    type KeyExtractionError = SimpleKeyExtractionError<&'static str>;

    fn extract(&self, req: &ServiceRequest) -> std::result::Result<Self::Key, Self::KeyExtractionError> {
        let conn_info = req.connection_info();
        let peer_ip = conn_info
            .peer_addr()
            .ok_or_else(|| SimpleKeyExtractionError::new("Unable to extract peer IP"))?;

        let config = get_config();
        if is_trusted_proxy(peer_ip, &config.auth.trusted_proxies) {
            let real_ip = conn_info.realip_remote_addr().unwrap_or(peer_ip);
            debug!("Rate limit key from trusted proxy: {}", real_ip);
            Ok(real_ip.to_string())
        } else {
            Ok(peer_ip.to_string())
        }
    }

    /// 超限时返回统一的 JSON 错误体，并带上 Retry-After
    fn exceed_rate_limit_response(
        &self,
        negative: &NotUntil<QuantaInstant>,
        _response: HttpResponseBuilder,
    ) -> HttpResponse {
        let wait_secs = negative
            .wait_time_from(DefaultClock::default().now())
            .as_secs()
            .max(1);
        let mut resp = error_response(
            StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::RateLimitExceeded,
            &format!("Too many attempts, retry in {}s", wait_secs),
        );
        resp.headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(wait_secs));
        resp
    }
}

/// 可信代理列表支持单个 IP 和 CIDR
fn is_trusted_proxy(ip: &str, trusted_proxies: &[String]) -> bool {
    let Ok(ip) = ip.parse::<IpAddr>() else {
        return false;
    };
    trusted_proxies.iter().any(|entry| match entry.split_once('/') {
        Some((network, prefix)) => in_network(ip, network, prefix),
        None => entry.parse::<IpAddr>().is_ok_and(|addr| addr == ip),
    })
}

fn in_network(ip: IpAddr, network: &str, prefix: &str) -> bool {
    let (Ok(network), Ok(prefix)) = (network.parse::<IpAddr>(), prefix.parse::<u32>()) else {
        return false;
    };
    match (ip, network) {
        (IpAddr::V4(ip), IpAddr::V4(net)) if prefix <= 32 => {
            let mask = u32::MAX.checked_shl(32 - prefix).unwrap_or(0);
            u32::from(ip) & mask == u32::from(net) & mask
        }
        (IpAddr::V6(ip), IpAddr::V6(net)) if prefix <= 128 => {
            let mask = u128::MAX.checked_shl(128 - prefix).unwrap_or(0);
            u128::from(ip) & mask == u128::from(net) & mask
        }
        _ => false,
    }
}

/// 注册和登录共用的限流器：每秒补充 1 个令牌，突发 5 次，超限返回 429
pub fn login_rate_limiter() -> Governor<LoginKeyExtractor, NoOpMiddleware> {
    let config = GovernorConfigBuilder::default()
        .seconds_per_request(1)
        .burst_size(5)
        .key_extractor(LoginKeyExtractor)
        .finish()
        .expect("rate limit constants are non-zero");

    Governor::new(&config)
}

/// 签发 access/refresh token 并写入 cookie
fn session_response(user: User, status: StatusCode, message: &str) -> Result<HttpResponse> {
    let jwt = get_jwt_service();
    let access_token = jwt.generate_access_token(&user)?;
    let refresh_token = jwt.generate_refresh_token(&user)?;

    let cookies = CookieBuilder::from_config();
    let body = AuthResponse {
        user,
        access_token: access_token.clone(),
        refresh_token: refresh_token.clone(),
        token_type: "Bearer",
        expires_in: cookies.access_token_minutes() * 60,
    };

    let mut response = json_response(status, ErrorCode::Success, message, Some(body));
    for cookie in [
        cookies.build_access_cookie(access_token),
        cookies.build_refresh_cookie(refresh_token),
        cookies.build_csrf_cookie(generate_secure_token()),
    ] {
        response
            .add_cookie(&cookie)
            .map_err(|e| AgoraError::serialization(format!("Failed to set cookie: {}", e)))?;
    }
    Ok(response)
}

/// POST /api/auth/signup
pub async fn signup(
    accounts: web::Data<Arc<AccountService>>,
    body: JsonOrForm<SignupRequest>,
) -> HttpResponse {
    let result = match accounts.signup(body.into_inner()).await {
        Ok(user) => session_response(user, StatusCode::CREATED, "Account created"),
        Err(e) => Err(e),
    };
    result.unwrap_or_else(|e| error_from_agora(&e))
}

/// POST /api/auth/login
pub async fn login(
    accounts: web::Data<Arc<AccountService>>,
    body: JsonOrForm<LoginRequest>,
) -> HttpResponse {
    let req = body.into_inner();
    let result = match accounts.authenticate(&req.username, &req.password).await {
        Ok(user) => {
            info!("User '{}' logged in", user.username);
            session_response(user, StatusCode::OK, "Login successful")
        }
        Err(e) => Err(e),
    };
    result.unwrap_or_else(|e| error_from_agora(&e))
}

async fn rotate_tokens(accounts: &AccountService, token: Option<String>) -> Result<HttpResponse> {
    let token = token.ok_or_else(|| AgoraError::unauthorized("Refresh token not found"))?;
    let claims = get_jwt_service().validate_refresh_token(&token).map_err(|e| {
        warn!("Invalid refresh token: {}", e);
        AgoraError::unauthorized("Invalid refresh token")
    })?;
    let user_id = claims
        .user_id()
        .ok_or_else(|| AgoraError::unauthorized("Invalid refresh token"))?;

    let user = accounts.get_user(user_id).await.map_err(|e| match e {
        AgoraError::NotFound(_) => AgoraError::unauthorized("Account no longer exists"),
        other => other,
    })?;
    if !user.is_active {
        return Err(AgoraError::forbidden("Account is disabled"));
    }

    debug!("Token refreshed for user {}", user.id);
    session_response(user, StatusCode::OK, "Token refreshed")
}

/// POST /api/auth/refresh：cookie 优先，其次请求体
pub async fn refresh(
    req: HttpRequest,
    accounts: web::Data<Arc<AccountService>>,
    body: Option<web::Json<RefreshRequest>>,
) -> HttpResponse {
    let token = req
        .cookie(crate::api::constants::REFRESH_COOKIE_NAME)
        .map(|c| c.value().to_string())
        .or_else(|| body.and_then(|b| b.into_inner().refresh_token));

    rotate_tokens(&accounts, token)
        .await
        .unwrap_or_else(|e| error_from_agora(&e))
}

/// POST /api/auth/logout：清除 cookie
pub async fn logout() -> HttpResponse {
    let cookies = CookieBuilder::from_config();
    let mut response = success_response(MessageResponse {
        message: "Logout successful".to_string(),
    });
    for cookie in [
        cookies.build_expired_access_cookie(),
        cookies.build_expired_refresh_cookie(),
        cookies.build_expired_csrf_cookie(),
    ] {
        if let Err(e) = response.add_cookie(&cookie) {
            warn!("Failed to expire cookie {}: {}", cookie.name(), e);
        }
    }
    response
}

/// GET /api/auth/me
pub async fn me(user: AuthenticatedUser, accounts: web::Data<Arc<AccountService>>) -> HttpResponse {
    api_result(accounts.get_user(user.id).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trusted_proxy_single_ip() {
        let proxies = vec!["10.0.0.1".to_string()];
        assert!(is_trusted_proxy("10.0.0.1", &proxies));
        assert!(!is_trusted_proxy("10.0.0.2", &proxies));
        assert!(!is_trusted_proxy("not-an-ip", &proxies));
    }

    #[test]
    fn test_trusted_proxy_cidr() {
        let proxies = vec!["192.168.0.0/16".to_string(), "fd00::/8".to_string()];
        assert!(is_trusted_proxy("192.168.44.3", &proxies));
        assert!(!is_trusted_proxy("192.169.0.1", &proxies));
        assert!(is_trusted_proxy("fd12::1", &proxies));
        assert!(!is_trusted_proxy("fe80::1", &proxies));
    }

    #[test]
    fn test_invalid_cidr_entries() {
        assert!(!is_trusted_proxy("10.0.0.1", &["10.0.0.0/33".to_string()]));
        assert!(!is_trusted_proxy("10.0.0.1", &["10.0.0.0/abc".to_string()]));
        // /0 匹配同族全部地址
        assert!(is_trusted_proxy("8.8.8.8", &["0.0.0.0/0".to_string()]));
        assert!(!is_trusted_proxy("::1", &["0.0.0.0/0".to_string()]));
    }

    #[test]
    fn test_no_proxies_configured() {
        assert!(!is_trusted_proxy("127.0.0.1", &[]));
    }
}
