//! 帖子、点赞、评论、分享

use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};

use crate::api::middleware::AuthenticatedUser;
use crate::errors::{AgoraError, Result};
use crate::services::{CreatePost, MediaStore, PostService};
use crate::storage::Post;

use super::helpers::{JsonOrForm, api_result, created_response, error_from_agora};
use super::types::{CommentRequest, MessageResponse};
use super::upload::{FormFields, read_multipart};

const MEDIA_FIELD: &str = "media";
const POST_FORM: FormFields = FormFields {
    text: &["title", "content", "group_id"],
    file: MEDIA_FIELD,
};

async fn create_from_form(
    owner: i64,
    payload: Multipart,
    posts: &PostService,
    media: &MediaStore,
) -> Result<Post> {
    let mut form = read_multipart(payload, POST_FORM, media.max_upload_bytes()).await?;

    let group_id = match form.non_empty("group_id") {
        Some(raw) => Some(
            raw.parse::<i64>()
                .map_err(|_| AgoraError::validation(format!("Invalid group_id '{}'", raw)))?,
        ),
        None => None,
    };
    let req = CreatePost {
        title: form.text("title").unwrap_or_default().to_string(),
        content: form.text("content").unwrap_or_default().to_string(),
        group_id,
    };
    let upload = form.take_file(MEDIA_FIELD);

    posts.create_post(owner, req, upload).await
}

/// POST /api/posts (multipart `title`, `content`, `group_id?`, `media?`)
pub async fn create_post(
    user: AuthenticatedUser,
    payload: Multipart,
    posts: web::Data<Arc<PostService>>,
    media: web::Data<Arc<MediaStore>>,
) -> HttpResponse {
    match create_from_form(user.id, payload, &posts, &media).await {
        Ok(post) => created_response(post),
        Err(e) => error_from_agora(&e),
    }
}

/// GET /api/posts/{id}
pub async fn get_post(
    user: AuthenticatedUser,
    path: web::Path<i64>,
    posts: web::Data<Arc<PostService>>,
) -> HttpResponse {
    api_result(posts.get_post(user.id, path.into_inner()).await)
}

/// DELETE /api/posts/{id}
pub async fn delete_post(
    user: AuthenticatedUser,
    path: web::Path<i64>,
    posts: web::Data<Arc<PostService>>,
) -> HttpResponse {
    let result = posts
        .delete_post(user.id, path.into_inner())
        .await
        .map(|_| MessageResponse {
            message: "Post deleted".to_string(),
        });
    api_result(result)
}

/// POST /api/posts/{id}/like
pub async fn toggle_like(
    user: AuthenticatedUser,
    path: web::Path<i64>,
    posts: web::Data<Arc<PostService>>,
) -> HttpResponse {
    api_result(posts.toggle_like(user.id, path.into_inner()).await)
}

/// GET /api/posts/{id}/comments
pub async fn list_comments(
    _user: AuthenticatedUser,
    path: web::Path<i64>,
    posts: web::Data<Arc<PostService>>,
) -> HttpResponse {
    api_result(posts.list_comments(path.into_inner()).await)
}

/// POST /api/posts/{id}/comment
pub async fn add_comment(
    user: AuthenticatedUser,
    path: web::Path<i64>,
    posts: web::Data<Arc<PostService>>,
    body: JsonOrForm<CommentRequest>,
) -> HttpResponse {
    let req = body.into_inner();
    match posts.add_comment(user.id, path.into_inner(), &req.content).await {
        Ok(comment) => created_response(comment),
        Err(e) => error_from_agora(&e),
    }
}

/// POST /api/posts/{id}/share
pub async fn share_post(
    user: AuthenticatedUser,
    path: web::Path<i64>,
    posts: web::Data<Arc<PostService>>,
) -> HttpResponse {
    match posts.share_post(user.id, path.into_inner()).await {
        Ok(post) => created_response(post),
        Err(e) => error_from_agora(&e),
    }
}
