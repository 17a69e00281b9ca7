//! HTTP API 帮助函数

use actix_web::{HttpResponse, web};
use actix_web::cookie::{Cookie, SameSite, time::Duration};
use actix_web::http::StatusCode;
use serde::Serialize;
use tracing::error;

use crate::api::constants;
use crate::errors::AgoraError;

use super::error_code::ErrorCode;
use super::types::ApiResponse;

/// 同时接受 JSON 和 urlencoded 表单的请求体
pub type JsonOrForm<T> = web::Either<web::Json<T>, web::Form<T>>;

const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// 构建 JSON 响应
pub fn json_response<T: Serialize>(
    status: StatusCode,
    code: ErrorCode,
    message: impl Into<String>,
    data: Option<T>,
) -> HttpResponse {
    HttpResponse::build(status)
        .append_header(("Content-Type", "application/json; charset=utf-8"))
        .json(ApiResponse {
            code: code as i32,
            message: message.into(),
            data,
        })
}

/// 构建成功响应
pub fn success_response<T: Serialize>(data: T) -> HttpResponse {
    json_response(StatusCode::OK, ErrorCode::Success, "OK", Some(data))
}

/// 构建 201 响应
pub fn created_response<T: Serialize>(data: T) -> HttpResponse {
    json_response(StatusCode::CREATED, ErrorCode::Success, "Created", Some(data))
}

/// 构建错误响应
pub fn error_response(status: StatusCode, error_code: ErrorCode, message: &str) -> HttpResponse {
    json_response::<()>(status, error_code, message, None)
}

/// 从 AgoraError 构建错误响应
///
/// 5xx 只返回通用信息，细节写日志。
pub fn error_from_agora(err: &AgoraError) -> HttpResponse {
    let status = err.http_status();
    let code = ErrorCode::from(err);
    if status.is_server_error() {
        error!("Request failed: {}", err.format_simple());
        error_response(status, code, INTERNAL_ERROR_MESSAGE)
    } else {
        error_response(status, code, err.message())
    }
}

/// 统一 Result → HttpResponse 转换
pub fn api_result<T, E>(result: Result<T, E>) -> HttpResponse
where
    T: Serialize,
    E: Into<AgoraError>,
{
    match result {
        Ok(data) => success_response(data),
        Err(e) => error_from_agora(&e.into()),
    }
}

/// Cookie 构建器
pub struct CookieBuilder {
    same_site: SameSite,
    secure: bool,
    domain: Option<String>,
    access_token_minutes: u64,
    refresh_token_days: u64,
}

impl CookieBuilder {
    pub fn from_config() -> Self {
        let config = crate::config::get_config();

        Self {
            same_site: config.auth.cookie_same_site.into(),
            secure: config.auth.cookie_secure,
            domain: config.auth.cookie_domain.clone(),
            access_token_minutes: config.auth.access_ttl_minutes(),
            refresh_token_days: config.auth.refresh_ttl_days(),
        }
    }

    fn build_cookie_base(
        &self,
        name: &str,
        value: String,
        path: &str,
        http_only: bool,
        max_age: Duration,
    ) -> Cookie<'static> {
        let mut cookie = Cookie::new(name.to_string(), value);
        cookie.set_path(path.to_string());
        cookie.set_http_only(http_only);
        cookie.set_secure(self.secure);
        cookie.set_same_site(self.same_site);
        cookie.set_max_age(max_age);
        if let Some(ref domain) = self.domain {
            cookie.set_domain(domain.clone());
        }
        cookie
    }

    pub fn build_access_cookie(&self, token: String) -> Cookie<'static> {
        self.build_cookie_base(
            constants::ACCESS_COOKIE_NAME,
            token,
            "/",
            true,
            Duration::minutes(self.access_token_minutes as i64),
        )
    }

    /// refresh cookie 只发往 /api/auth
    pub fn build_refresh_cookie(&self, token: String) -> Cookie<'static> {
        self.build_cookie_base(
            constants::REFRESH_COOKIE_NAME,
            token,
            constants::REFRESH_COOKIE_PATH,
            true,
            Duration::days(self.refresh_token_days as i64),
        )
    }

    /// CSRF cookie 不能是 HttpOnly，前端 JS 需要读取后放进请求头
    pub fn build_csrf_cookie(&self, token: String) -> Cookie<'static> {
        self.build_cookie_base(
            constants::CSRF_COOKIE_NAME,
            token,
            "/",
            false,
            Duration::days(self.refresh_token_days as i64),
        )
    }

    pub fn build_theme_cookie(&self, theme: &str) -> Cookie<'static> {
        self.build_cookie_base(
            constants::THEME_COOKIE_NAME,
            theme.to_string(),
            "/",
            false,
            Duration::days(constants::THEME_COOKIE_MAX_AGE_DAYS),
        )
    }

    pub fn build_expired_access_cookie(&self) -> Cookie<'static> {
        self.build_cookie_base(
            constants::ACCESS_COOKIE_NAME,
            String::new(),
            "/",
            true,
            Duration::ZERO,
        )
    }

    pub fn build_expired_refresh_cookie(&self) -> Cookie<'static> {
        self.build_cookie_base(
            constants::REFRESH_COOKIE_NAME,
            String::new(),
            constants::REFRESH_COOKIE_PATH,
            true,
            Duration::ZERO,
        )
    }

    pub fn build_expired_csrf_cookie(&self) -> Cookie<'static> {
        self.build_cookie_base(
            constants::CSRF_COOKIE_NAME,
            String::new(),
            "/",
            false,
            Duration::ZERO,
        )
    }

    pub fn access_token_minutes(&self) -> u64 {
        self.access_token_minutes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_response() {
        let response = success_response("data");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_error_mapping_statuses() {
        let cases = [
            (AgoraError::validation("bad"), StatusCode::BAD_REQUEST),
            (AgoraError::unauthorized("who"), StatusCode::UNAUTHORIZED),
            (AgoraError::token("expired"), StatusCode::UNAUTHORIZED),
            (AgoraError::forbidden("no"), StatusCode::FORBIDDEN),
            (AgoraError::not_found("gone"), StatusCode::NOT_FOUND),
            (AgoraError::conflict("dup"), StatusCode::CONFLICT),
            (AgoraError::payload_too_large("big"), StatusCode::PAYLOAD_TOO_LARGE),
            (AgoraError::unsupported_media("pdf"), StatusCode::UNSUPPORTED_MEDIA_TYPE),
            (AgoraError::database_operation("x"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(error_from_agora(&err).status(), status, "{:?}", err);
        }
    }

    #[actix_rt::test]
    async fn test_internal_errors_are_not_leaked() {
        let response = error_from_agora(&AgoraError::database_operation("password=hunter2"));
        let body = actix_web::body::to_bytes(response.into_body()).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(!text.contains("hunter2"));
        assert!(text.contains(INTERNAL_ERROR_MESSAGE));
    }

    #[test]
    fn test_refresh_cookie_is_scoped() {
        let builder = CookieBuilder {
            same_site: SameSite::Lax,
            secure: true,
            domain: None,
            access_token_minutes: 30,
            refresh_token_days: 7,
        };
        let cookie = builder.build_refresh_cookie("r".into());
        assert_eq!(cookie.path(), Some(constants::REFRESH_COOKIE_PATH));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));

        let csrf = builder.build_csrf_cookie("c".into());
        assert_eq!(csrf.http_only(), Some(false));

        let expired = builder.build_expired_access_cookie();
        assert_eq!(expired.max_age(), Some(Duration::ZERO));
    }
}
