//! Post service
//!
//! Posts, likes, comments and sharing, plus the view assembly used by the
//! feed, profile and group pages.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::account_service::UserSummary;
use super::media::{MediaCategory, MediaKind, MediaStore, StoredMedia, Upload};
use crate::config::get_config;
use crate::errors::{AgoraError, Result};
use crate::storage::{Comment, NewPost, Post, SeaOrmStorage};
use crate::utils::truncate_chars;

pub const TITLE_MAX_LEN: usize = 200;
pub const COMMENT_MAX_LEN: usize = 2000;
/// SQL OFFSET 以 i64 绑定
const MAX_ROW_OFFSET: u64 = i64::MAX as u64;

// ============ Request/Response DTOs ============

/// Text fields of a new post; media arrives separately
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreatePost {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub group_id: Option<i64>,
}

/// A post with everything a client needs to render it
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub post: Post,
    pub owner: UserSummary,
    pub like_count: u64,
    pub comment_count: u64,
    pub liked_by_viewer: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub user: UserSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostDetail {
    #[serde(flatten)]
    pub view: PostView,
    pub comments: Vec<CommentView>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct LikeToggle {
    pub liked: bool,
    pub like_count: u64,
}

/// One page of the home feed
#[derive(Debug, Clone, Serialize)]
pub struct FeedPage {
    pub posts: Vec<PostView>,
    pub page: u64,
    pub page_size: u64,
    pub total: u64,
    pub has_next: bool,
}

fn require_text(field: &str, value: &str, max: usize) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AgoraError::validation(format!("{} cannot be empty", field)));
    }
    if value.chars().count() > max {
        return Err(AgoraError::validation(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(value.to_string())
}

/// page 从 1 开始；page_size 为 0 时用默认值，并限制在上限内
///
/// page 同时封顶，保证 (page - 1) * page_size 能放进数据库的 i64 OFFSET。
pub fn clamp_page(page: Option<u64>, page_size: Option<u64>) -> (u64, u64) {
    let feed = &get_config().feed;
    let page_size = match page_size {
        Some(0) | None => feed.default_page_size,
        Some(n) => n,
    }
    .clamp(1, feed.max_page_size.max(1));
    let max_page = MAX_ROW_OFFSET / page_size + 1;
    let page = page.unwrap_or(1).clamp(1, max_page);
    (page, page_size)
}

fn comment_view(
    comment: Comment,
    users: &HashMap<i64, UserSummary>,
    fallback: &UserSummary,
) -> CommentView {
    CommentView {
        id: comment.id,
        content: comment.content,
        created_at: comment.created_at,
        user: users
            .get(&comment.user_id)
            .cloned()
            .unwrap_or_else(|| fallback.clone()),
    }
}

// ============ Service ============

pub struct PostService {
    storage: Arc<SeaOrmStorage>,
    media: Arc<MediaStore>,
}

impl PostService {
    pub fn new(storage: Arc<SeaOrmStorage>, media: Arc<MediaStore>) -> Self {
        Self { storage, media }
    }

    async fn load_post(&self, id: i64) -> Result<Post> {
        self.storage
            .find_post(id)
            .await?
            .ok_or_else(|| AgoraError::not_found(format!("Post {} not found", id)))
    }

    /// 批量加载作者、点赞数、评论数和当前用户的点赞状态
    pub async fn assemble_views(&self, viewer: i64, posts: Vec<Post>) -> Result<Vec<PostView>> {
        if posts.is_empty() {
            return Ok(Vec::new());
        }
        let post_ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
        let mut owner_ids: Vec<i64> = posts.iter().map(|p| p.owner_id).collect();
        owner_ids.sort_unstable();
        owner_ids.dedup();

        let owners = self.summaries_by_id(&owner_ids).await?;
        let likes = self.storage.count_likes_for(&post_ids).await?;
        let comments = self.storage.count_comments_for(&post_ids).await?;
        let liked = self.storage.liked_post_ids(viewer, &post_ids).await?;

        let fallback = UserSummary::unknown(self.media.default_profile_picture());
        Ok(posts
            .into_iter()
            .map(|post| PostView {
                owner: owners
                    .get(&post.owner_id)
                    .cloned()
                    .unwrap_or_else(|| fallback.clone()),
                like_count: likes.get(&post.id).copied().unwrap_or(0),
                comment_count: comments.get(&post.id).copied().unwrap_or(0),
                liked_by_viewer: liked.contains(&post.id),
                post,
            })
            .collect())
    }

    /// 帖子视图加上评论列表
    pub async fn assemble_details(&self, viewer: i64, posts: Vec<Post>) -> Result<Vec<PostDetail>> {
        let post_ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
        let views = self.assemble_views(viewer, posts).await?;
        let comments = self.storage.list_comments_for_posts(&post_ids).await?;

        let mut user_ids: Vec<i64> = comments.values().flatten().map(|c| c.user_id).collect();
        user_ids.sort_unstable();
        user_ids.dedup();
        let users = self.summaries_by_id(&user_ids).await?;
        let fallback = UserSummary::unknown(self.media.default_profile_picture());

        let mut by_post: HashMap<i64, Vec<CommentView>> = comments
            .into_iter()
            .map(|(post_id, list)| {
                let views = list
                    .into_iter()
                    .map(|c| comment_view(c, &users, &fallback))
                    .collect();
                (post_id, views)
            })
            .collect();

        Ok(views
            .into_iter()
            .map(|view| {
                let comments = by_post.remove(&view.post.id).unwrap_or_default();
                PostDetail { view, comments }
            })
            .collect())
    }

    async fn summaries_by_id(&self, ids: &[i64]) -> Result<HashMap<i64, UserSummary>> {
        Ok(self
            .storage
            .find_users_by_ids(ids)
            .await?
            .iter()
            .map(|u| (u.id, UserSummary::from(u)))
            .collect())
    }

    async fn comment_views(&self, comments: Vec<Comment>) -> Result<Vec<CommentView>> {
        let mut user_ids: Vec<i64> = comments.iter().map(|c| c.user_id).collect();
        user_ids.sort_unstable();
        user_ids.dedup();
        let users = self.summaries_by_id(&user_ids).await?;
        let fallback = UserSummary::unknown(self.media.default_profile_picture());

        Ok(comments
            .into_iter()
            .map(|c| comment_view(c, &users, &fallback))
            .collect())
    }

    /// Create a post, optionally inside a group and with one media file
    pub async fn create_post(
        &self,
        owner: i64,
        req: CreatePost,
        media: Option<Upload>,
    ) -> Result<Post> {
        let title = require_text("Title", &req.title, TITLE_MAX_LEN)?;
        let content = require_text("Content", &req.content, usize::MAX)?;

        if let Some(group_id) = req.group_id {
            if self.storage.find_group(group_id).await?.is_none() {
                return Err(AgoraError::not_found(format!("Group {} not found", group_id)));
            }
            if self.storage.find_membership(group_id, owner).await?.is_none() {
                return Err(AgoraError::forbidden(
                    "You must be a member of this group to post in it",
                ));
            }
        }

        let stored = match media {
            Some(upload) => Some(self.media.save(MediaCategory::Post, Some(owner), upload).await?),
            None => None,
        };
        let (image_url, video_url) = match &stored {
            Some(StoredMedia { kind: MediaKind::Image, url, .. }) => (Some(url.clone()), None),
            Some(StoredMedia { kind: MediaKind::Video, url, .. }) => (None, Some(url.clone())),
            None => (None, None),
        };

        let result = self
            .storage
            .insert_post(NewPost {
                title,
                content,
                image_url,
                video_url,
                owner_id: owner,
                group_id: req.group_id,
            })
            .await;
        if result.is_err()
            && let Some(stored) = &stored
        {
            self.media.discard(stored).await;
        }
        result
    }

    pub async fn feed(&self, viewer: i64, page: u64, page_size: u64) -> Result<FeedPage> {
        let (page, page_size) = clamp_page(Some(page), Some(page_size));
        let posts = self.storage.list_feed(page, page_size).await?;
        let total = self.storage.count_feed().await?;
        let posts = self.assemble_views(viewer, posts).await?;

        Ok(FeedPage {
            posts,
            page,
            page_size,
            total,
            has_next: page.saturating_mul(page_size) < total,
        })
    }

    pub async fn posts_by_user(&self, viewer: i64, user_id: i64) -> Result<Vec<PostView>> {
        let posts = self.storage.list_posts_by_owner(user_id).await?;
        self.assemble_views(viewer, posts).await
    }

    pub async fn posts_in_group(&self, viewer: i64, group_id: i64) -> Result<Vec<PostDetail>> {
        let posts = self.storage.list_posts_by_group(group_id).await?;
        self.assemble_details(viewer, posts).await
    }

    pub async fn get_post(&self, viewer: i64, id: i64) -> Result<PostDetail> {
        let post = self.load_post(id).await?;
        self.assemble_details(viewer, vec![post])
            .await?
            .pop()
            .ok_or_else(|| AgoraError::not_found(format!("Post {} not found", id)))
    }

    /// Delete a post; only its owner may do so
    pub async fn delete_post(&self, requester: i64, id: i64) -> Result<()> {
        let post = self.load_post(id).await?;
        if post.owner_id != requester {
            return Err(AgoraError::forbidden("You can only delete your own posts"));
        }
        // 媒体文件保留：分享出去的帖子仍引用同一个 URL
        self.storage.delete_post(id).await?;
        info!("PostService: user {} deleted post {}", requester, id);
        Ok(())
    }

    pub async fn toggle_like(&self, user: i64, post_id: i64) -> Result<LikeToggle> {
        self.load_post(post_id).await?;
        let (liked, like_count) = self.storage.toggle_like(user, post_id).await?;
        Ok(LikeToggle { liked, like_count })
    }

    pub async fn add_comment(&self, user: i64, post_id: i64, content: &str) -> Result<CommentView> {
        let content = require_text("Comment", content, COMMENT_MAX_LEN)?;
        self.load_post(post_id).await?;

        let comment = self.storage.insert_comment(user, post_id, &content).await?;
        self.comment_views(vec![comment])
            .await?
            .pop()
            .ok_or_else(|| AgoraError::database_operation("Comment vanished after insert"))
    }

    pub async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentView>> {
        self.load_post(post_id).await?;
        let comments = self.storage.list_comments(post_id).await?;
        self.comment_views(comments).await
    }

    /// Re-post someone's post to the sharer's own timeline
    pub async fn share_post(&self, user: i64, post_id: i64) -> Result<Post> {
        let source = self.load_post(post_id).await?;
        let owner_name = match self.storage.find_user_by_id(source.owner_id).await? {
            Some(owner) => owner.username,
            None => "Unknown User".to_string(),
        };

        let title = format!("Shared: {}", source.title);
        let shared = self
            .storage
            .insert_post(NewPost {
                title: truncate_chars(&title, TITLE_MAX_LEN).to_string(),
                content: format!("Shared from @{}: {}", owner_name, source.content),
                image_url: source.image_url,
                video_url: source.video_url,
                owner_id: user,
                group_id: None,
            })
            .await?;

        info!(
            "PostService: user {} shared post {} as {}",
            user, post_id, shared.id
        );
        Ok(shared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_text() {
        assert_eq!(require_text("Title", "  hi  ", 10).unwrap(), "hi");
        assert!(matches!(
            require_text("Title", "   ", 10),
            Err(AgoraError::Validation(_))
        ));
        assert!(require_text("Title", &"x".repeat(11), 10).is_err());
        assert!(require_text("Title", &"é".repeat(10), 10).is_ok());
    }

    #[test]
    fn test_clamp_page_defaults() {
        let feed = &get_config().feed;
        assert_eq!(clamp_page(None, None), (1, feed.default_page_size));
        assert_eq!(clamp_page(Some(0), Some(0)), (1, feed.default_page_size));
        assert_eq!(clamp_page(Some(3), Some(5)), (3, 5));
        assert_eq!(clamp_page(Some(2), Some(100_000)), (2, feed.max_page_size));
    }

    #[test]
    fn test_clamp_page_keeps_offset_in_range() {
        let (page, page_size) = clamp_page(Some(u64::MAX), Some(20));
        assert_eq!(page_size, 20);
        assert!((page - 1).checked_mul(page_size).is_some_and(|o| o <= MAX_ROW_OFFSET));

        let (page, page_size) = clamp_page(Some(184_467_440_737_095_516), None);
        assert!((page - 1) * page_size <= MAX_ROW_OFFSET);
    }
}
