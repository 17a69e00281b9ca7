//! 已上传媒体的静态访问

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, web};
use tracing::{debug, trace};

use crate::services::MediaStore;

use super::error_code::ErrorCode;
use super::helpers::{error_from_agora, error_response};

/// 上传文件缓存一天，文件名带时间戳和随机串，不会复用
const MEDIA_CACHE_CONTROL: &str = "public, max-age=86400";
/// 上传内容不允许执行脚本，即便浏览器把它当文档打开
const MEDIA_CSP: &str = "default-src 'none'; sandbox";

fn get_content_type(path: &str) -> &'static str {
    let ext = path
        .rsplit('.')
        .next()
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "ogg" | "ogv" => "video/ogg",
        "mov" | "quicktime" => "video/quicktime",
        _ => "application/octet-stream",
    }
}

/// GET {public_prefix}/{path}
pub async fn serve_media(
    path: web::Path<String>,
    media: web::Data<Arc<MediaStore>>,
) -> HttpResponse {
    let requested = path.into_inner();
    trace!("Media request: {}", requested);

    let file_path = match media.resolve(&requested) {
        Ok(p) => p,
        Err(e) => return error_from_agora(&e),
    };

    match tokio::fs::read(&file_path).await {
        Ok(bytes) => HttpResponse::Ok()
            .content_type(get_content_type(&requested))
            .append_header(("Cache-Control", MEDIA_CACHE_CONTROL))
            .append_header(("X-Content-Type-Options", "nosniff"))
            .append_header(("Content-Security-Policy", MEDIA_CSP))
            .body(bytes),
        Err(e) => {
            debug!("Media file {} not readable: {}", file_path.display(), e);
            error_response(StatusCode::NOT_FOUND, ErrorCode::NotFound, "Media not found")
        }
    }
}

/// 媒体路由，挂在配置的 public_prefix 下
pub fn media_routes(public_prefix: &str) -> actix_web::Scope {
    web::scope(public_prefix).route("/{path:.*}", web::get().to(serve_media))
}
