//! 路由组装

use actix_web::error::{InternalError, JsonPayloadError, UrlencodedError};
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, web};

use crate::api::constants::JSON_PAYLOAD_LIMIT;
use crate::api::middleware::{CsrfGuard, UserAuth};

use super::error_code::ErrorCode;
use super::helpers::error_response;
use super::{auth, feed, groups, posts, profile, theme, users};

fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let (status, code) = match &err {
        JsonPayloadError::OverflowKnownLength { .. } | JsonPayloadError::Overflow { .. } => {
            (StatusCode::PAYLOAD_TOO_LARGE, ErrorCode::FileTooLarge)
        }
        _ => (StatusCode::BAD_REQUEST, ErrorCode::BadRequest),
    };
    let message = format!("Invalid request body: {}", err);
    let response = error_response(status, code, &message);
    InternalError::from_response(err, response).into()
}

fn form_error_handler(err: UrlencodedError, _req: &HttpRequest) -> actix_web::Error {
    let (status, code) = match &err {
        UrlencodedError::Overflow { .. } => (StatusCode::PAYLOAD_TOO_LARGE, ErrorCode::FileTooLarge),
        _ => (StatusCode::BAD_REQUEST, ErrorCode::BadRequest),
    };
    let message = format!("Invalid form body: {}", err);
    let response = error_response(status, code, &message);
    InternalError::from_response(err, response).into()
}

/// JSON / 表单请求体配置
pub fn body_configs(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(JSON_PAYLOAD_LIMIT)
            .error_handler(json_error_handler),
    )
    .app_data(
        web::FormConfig::default()
            .limit(JSON_PAYLOAD_LIMIT)
            .error_handler(form_error_handler),
    );
}

/// 认证路由（公开，me 除外）
///
/// signup 与 login 共用同一个限流器。
pub fn auth_routes() -> actix_web::Scope {
    web::scope("/auth")
        .route("/refresh", web::post().to(auth::refresh))
        .route("/logout", web::post().to(auth::logout))
        .route("/me", web::get().to(auth::me).wrap(UserAuth))
        .service(
            web::scope("")
                .wrap(auth::login_rate_limiter())
                .route("/signup", web::post().to(auth::signup))
                .route("/login", web::post().to(auth::login)),
        )
}

/// 主题路由（公开）
pub fn theme_routes() -> actix_web::Resource {
    web::resource("/theme")
        .route(web::get().to(theme::get_theme))
        .route(web::post().to(theme::set_theme))
}

fn profile_routes() -> actix_web::Scope {
    web::scope("/profile")
        .route("", web::get().to(profile::get_profile))
        .route("", web::put().to(profile::update_profile))
        .route("/picture", web::post().to(profile::upload_picture))
        .route("/password", web::post().to(profile::change_password))
}

fn users_routes() -> actix_web::Scope {
    // suggestions 必须在 {username} 之前注册
    web::scope("/users")
        .route("/suggestions", web::get().to(users::suggestions))
        .route("/{id}/follow", web::post().to(users::toggle_follow))
        .route("/{username}/followers", web::get().to(users::followers))
        .route("/{username}/following", web::get().to(users::following))
        .route("/{username}", web::get().to(users::get_user_profile))
}

fn posts_routes() -> actix_web::Scope {
    web::scope("/posts")
        .route("", web::post().to(posts::create_post))
        .route("/{id}", web::get().to(posts::get_post))
        .route("/{id}", web::delete().to(posts::delete_post))
        .route("/{id}/like", web::post().to(posts::toggle_like))
        .route("/{id}/comments", web::get().to(posts::list_comments))
        .route("/{id}/comment", web::post().to(posts::add_comment))
        .route("/{id}/share", web::post().to(posts::share_post))
}

fn groups_routes() -> actix_web::Scope {
    web::scope("/groups")
        .route("", web::get().to(groups::list_groups))
        .route("", web::post().to(groups::create_group))
        .route("/{id}", web::get().to(groups::get_group))
        .route("/{id}/join", web::post().to(groups::toggle_membership))
}

/// /api 路由
///
/// auth 与 theme 公开，其余需要登录并经过 CSRF 校验。
pub fn api_routes() -> actix_web::Scope {
    web::scope("/api")
        .service(auth_routes())
        .service(theme_routes())
        .service(
            web::scope("")
                .wrap(CsrfGuard)
                .wrap(UserAuth)
                .route("/feed", web::get().to(feed::get_feed))
                .service(profile_routes())
                .service(users_routes())
                .service(posts_routes())
                .service(groups_routes()),
        )
}
