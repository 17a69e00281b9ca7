//! 首页 feed

use std::sync::Arc;

use actix_web::{HttpRequest, HttpResponse, web};

use crate::api::constants::THEME_COOKIE_NAME;
use crate::api::middleware::AuthenticatedUser;
use crate::config::get_config;
use crate::errors::Result;
use crate::services::{GroupService, PostService, SocialService, Theme, clamp_page};

use super::helpers::api_result;
use super::types::{HomeView, PageQuery};

/// 从 cookie 读取主题
pub fn current_theme(req: &HttpRequest) -> Theme {
    let cookie = req.cookie(THEME_COOKIE_NAME);
    Theme::from_cookie(cookie.as_ref().map(|c| c.value()))
}

async fn home_view(
    viewer: i64,
    query: PageQuery,
    theme: Theme,
    posts: &PostService,
    social: &SocialService,
    groups: &GroupService,
) -> Result<HomeView> {
    let feed_config = &get_config().feed;
    let (page, page_size) = clamp_page(query.page, query.page_size);

    let feed = posts.feed(viewer, page, page_size).await?;
    let suggestions = social.suggestions(viewer, feed_config.user_suggestions).await?;
    let group_suggestions = groups.suggestions(feed_config.group_suggestions).await?;

    Ok(HomeView {
        feed,
        suggestions,
        group_suggestions,
        theme,
    })
}

/// GET /api/feed?page&page_size
pub async fn get_feed(
    req: HttpRequest,
    user: AuthenticatedUser,
    query: web::Query<PageQuery>,
    posts: web::Data<Arc<PostService>>,
    social: web::Data<Arc<SocialService>>,
    groups: web::Data<Arc<GroupService>>,
) -> HttpResponse {
    let theme = current_theme(&req);
    api_result(home_view(user.id, query.into_inner(), theme, &posts, &social, &groups).await)
}
