//! 主题偏好（只存在 cookie 里）

use actix_web::{HttpRequest, HttpResponse};
use tracing::warn;

use crate::services::Theme;

use super::feed::current_theme;
use super::helpers::{CookieBuilder, JsonOrForm, error_from_agora, success_response};
use super::types::{ThemeRequest, ThemeResponse};

/// GET /api/theme
pub async fn get_theme(req: HttpRequest) -> HttpResponse {
    success_response(ThemeResponse {
        theme: current_theme(&req),
    })
}

/// POST /api/theme
pub async fn set_theme(body: JsonOrForm<ThemeRequest>) -> HttpResponse {
    let theme: Theme = match body.into_inner().theme.parse() {
        Ok(theme) => theme,
        Err(e) => return error_from_agora(&e),
    };

    let cookie = CookieBuilder::from_config().build_theme_cookie(theme.as_ref());
    let mut response = success_response(ThemeResponse { theme });
    if let Err(e) = response.add_cookie(&cookie) {
        warn!("Failed to set theme cookie: {}", e);
    }
    response
}
