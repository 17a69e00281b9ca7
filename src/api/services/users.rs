//! 其他用户：主页、关注关系、推荐

use std::sync::Arc;

use actix_web::{HttpRequest, HttpResponse, web};

use crate::api::middleware::AuthenticatedUser;
use crate::config::get_config;
use crate::services::SocialService;

use super::feed::current_theme;
use super::helpers::api_result;
use super::types::{LimitQuery, ProfilePage};

/// 推荐列表上限
const MAX_SUGGESTIONS: u64 = 50;

/// GET /api/users/suggestions?limit
pub async fn suggestions(
    user: AuthenticatedUser,
    query: web::Query<LimitQuery>,
    social: web::Data<Arc<SocialService>>,
) -> HttpResponse {
    let limit = query
        .limit
        .unwrap_or(get_config().feed.user_suggestions)
        .clamp(1, MAX_SUGGESTIONS);
    api_result(social.suggestions(user.id, limit).await)
}

/// GET /api/users/{username}
pub async fn get_user_profile(
    req: HttpRequest,
    user: AuthenticatedUser,
    path: web::Path<String>,
    social: web::Data<Arc<SocialService>>,
) -> HttpResponse {
    let theme = current_theme(&req);
    let result = social
        .profile(user.id, &path)
        .await
        .map(|profile| ProfilePage { profile, theme });
    api_result(result)
}

/// GET /api/users/{username}/followers
pub async fn followers(
    _user: AuthenticatedUser,
    path: web::Path<String>,
    social: web::Data<Arc<SocialService>>,
) -> HttpResponse {
    api_result(social.followers(&path).await)
}

/// GET /api/users/{username}/following
pub async fn following(
    _user: AuthenticatedUser,
    path: web::Path<String>,
    social: web::Data<Arc<SocialService>>,
) -> HttpResponse {
    api_result(social.following(&path).await)
}

/// POST /api/users/{id}/follow
pub async fn toggle_follow(
    user: AuthenticatedUser,
    path: web::Path<i64>,
    social: web::Data<Arc<SocialService>>,
) -> HttpResponse {
    api_result(social.toggle_follow(user.id, path.into_inner()).await)
}
