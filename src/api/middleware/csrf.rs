//! CSRF 防护中间件
//!
//! 双令牌模式：X-CSRF-Token header 必须与 csrf_token Cookie 一致。
//! 安全方法和 Bearer 认证的请求跳过检查。必须放在 `UserAuth` 之内。

use actix_service::{Service, Transform};
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::EitherBody,
    dev::{ServiceRequest, ServiceResponse},
    http::{Method, header::CONTENT_TYPE},
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::rc::Rc;
use subtle::ConstantTimeEq;
use tracing::{trace, warn};

use crate::api::constants;
use crate::api::services::{ApiResponse, ErrorCode};

use super::auth::AuthMethod;

/// CSRF 防护中间件
#[derive(Clone)]
pub struct CsrfGuard;

impl<S, B> Transform<S, ServiceRequest> for CsrfGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = CsrfMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(CsrfMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct CsrfMiddleware<S> {
    service: Rc<S>,
}

fn is_safe_method(method: &Method) -> bool {
    matches!(method, &Method::GET | &Method::HEAD | &Method::OPTIONS)
}

/// 常量时间比较，空值一律不通过
fn tokens_match(cookie: Option<&str>, header: Option<&str>) -> bool {
    match (cookie, header) {
        (Some(cookie), Some(header)) if !cookie.is_empty() => {
            cookie.as_bytes().ct_eq(header.as_bytes()).into()
        }
        _ => false,
    }
}

impl<S, B> CsrfMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    fn handle_csrf_error(req: ServiceRequest) -> ServiceResponse<EitherBody<B>> {
        warn!("CSRF validation failed for {} {}", req.method(), req.path());
        req.into_response(
            HttpResponse::Forbidden()
                .insert_header((CONTENT_TYPE, "application/json; charset=utf-8"))
                .json(ApiResponse::<()> {
                    code: ErrorCode::CsrfInvalid as i32,
                    message: "CSRF token missing or invalid".to_string(),
                    data: None,
                })
                .map_into_right_body(),
        )
    }

    fn validate_csrf_token(req: &ServiceRequest) -> bool {
        let cookie_token = req
            .cookie(constants::CSRF_COOKIE_NAME)
            .map(|c| c.value().to_string());
        let header_token = req
            .headers()
            .get(constants::CSRF_HEADER_NAME)
            .and_then(|h| h.to_str().ok());

        tokens_match(cookie_token.as_deref(), header_token)
    }
}

impl<S, B> Service<ServiceRequest> for CsrfMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();

        Box::pin(async move {
            if is_safe_method(req.method()) {
                let response = srv.call(req).await?.map_into_left_body();
                return Ok(response);
            }

            let is_bearer_auth = req
                .extensions()
                .get::<AuthMethod>()
                .copied()
                .is_some_and(|m| m == AuthMethod::Bearer);
            if is_bearer_auth {
                trace!("CSRF skipped: Bearer token authentication");
                let response = srv.call(req).await?.map_into_left_body();
                return Ok(response);
            }

            if !Self::validate_csrf_token(&req) {
                return Ok(Self::handle_csrf_error(req));
            }

            let response = srv.call(req).await?.map_into_left_body();
            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_match() {
        assert!(tokens_match(Some("abc"), Some("abc")));
        assert!(!tokens_match(Some("abc"), Some("abd")));
        assert!(!tokens_match(Some("abc"), None));
        assert!(!tokens_match(None, Some("abc")));
        assert!(!tokens_match(Some(""), Some("")));
    }

    #[test]
    fn test_safe_methods() {
        assert!(is_safe_method(&Method::GET));
        assert!(is_safe_method(&Method::HEAD));
        assert!(!is_safe_method(&Method::POST));
        assert!(!is_safe_method(&Method::DELETE));
    }
}
