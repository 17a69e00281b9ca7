use actix_service::{Service, Transform};
use actix_web::{
    Error, FromRequest, HttpMessage, HttpRequest, HttpResponse,
    body::EitherBody,
    dev::{Payload, ServiceRequest, ServiceResponse},
    http::{Method, header::CONTENT_TYPE},
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::rc::Rc;
use tracing::{debug, trace};

use crate::api::constants;
use crate::api::jwt::{TokenClaims, get_jwt_service};
use crate::api::services::{ApiResponse, ErrorCode};

/// 认证方式标记，用于 CSRF 中间件判断是否跳过验证
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthMethod {
    /// Bearer Token 认证（API 客户端，免 CSRF）
    Bearer,
    /// Cookie 认证（浏览器，需要 CSRF 防护）
    Cookie,
}

/// 已通过认证的用户，handler 直接作为参数提取
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub username: String,
}

impl AuthenticatedUser {
    fn from_claims(claims: &TokenClaims) -> Option<Self> {
        Some(Self {
            id: claims.user_id()?,
            username: claims.username.clone(),
        })
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let user = req.extensions().get::<AuthenticatedUser>().cloned();
        ready(user.ok_or_else(|| {
            actix_web::error::InternalError::from_response(
                "missing authentication",
                unauthorized_response(),
            )
            .into()
        }))
    }
}

fn unauthorized_response() -> HttpResponse {
    HttpResponse::Unauthorized()
        .insert_header((CONTENT_TYPE, "application/json; charset=utf-8"))
        .json(ApiResponse::<()> {
            code: ErrorCode::Unauthorized as i32,
            message: "Unauthorized: Invalid or missing token".to_string(),
            data: None,
        })
}

/// 用户认证中间件：Bearer 优先，其次 access cookie
#[derive(Clone)]
pub struct UserAuth;

impl<S, B> Transform<S, ServiceRequest> for UserAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = UserAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(UserAuthMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct UserAuthMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> UserAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    fn handle_unauthorized(req: ServiceRequest) -> ServiceResponse<EitherBody<B>> {
        debug!("Authentication failed for {} {}", req.method(), req.path());
        req.into_response(unauthorized_response().map_into_right_body())
    }

    /// 从 Authorization header 提取 Bearer token
    fn extract_bearer_token(req: &ServiceRequest) -> Option<String> {
        req.headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn validate(token: &str, source: &str) -> Option<AuthenticatedUser> {
        match get_jwt_service().validate_access_token(token) {
            Ok(claims) => {
                trace!("{} token validation successful", source);
                AuthenticatedUser::from_claims(&claims)
            }
            Err(e) => {
                debug!("{} token validation failed: {}", source, e);
                None
            }
        }
    }
}

impl<S, B> Service<ServiceRequest> for UserAuthMiddleware<S>
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
            // CORS 预检直接放行
            if req.method() == Method::OPTIONS {
                let response = srv.call(req).await?.map_into_left_body();
                return Ok(response);
            }

            // 1. Bearer Token（API 客户端，免 CSRF）
            if let Some(token) = Self::extract_bearer_token(&req)
                && let Some(user) = Self::validate(&token, "Bearer")
            {
                req.extensions_mut().insert(AuthMethod::Bearer);
                req.extensions_mut().insert(user);
                let response = srv.call(req).await?.map_into_left_body();
                return Ok(response);
            }

            // 2. Cookie（浏览器，需要 CSRF 防护）
            let cookie_token = req
                .cookie(constants::ACCESS_COOKIE_NAME)
                .map(|c| c.value().to_string());
            if let Some(token) = cookie_token
                && let Some(user) = Self::validate(&token, "Cookie")
            {
                req.extensions_mut().insert(AuthMethod::Cookie);
                req.extensions_mut().insert(user);
                let response = srv.call(req).await?.map_into_left_body();
                return Ok(response);
            }

            Ok(Self::handle_unauthorized(req))
        })
    }
}
