//! Follow graph and profile pages

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::account_service::UserSummary;
use super::post_service::{PostService, PostView};
use crate::errors::{AgoraError, Result};
use crate::storage::{SeaOrmStorage, User};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct FollowToggle {
    pub following: bool,
    pub follower_count: u64,
}

/// The user shown at the top of a profile page
///
/// 邮箱只给本人看；账号状态不对外。
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProfileUser {
    pub id: i64,
    pub username: String,
    pub full_name: Option<String>,
    pub profile_picture: String,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl ProfileUser {
    pub fn new(user: User, is_self: bool) -> Self {
        Self {
            id: user.id,
            username: user.username,
            full_name: user.full_name,
            profile_picture: user.profile_picture,
            bio: user.bio,
            created_at: user.created_at,
            email: is_self.then_some(user.email),
        }
    }
}

/// Everything shown on a user's profile page
#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub user: ProfileUser,
    pub posts: Vec<PostView>,
    pub follower_count: u64,
    pub following_count: u64,
    pub is_following: bool,
    pub is_self: bool,
}

pub struct SocialService {
    storage: Arc<SeaOrmStorage>,
    posts: Arc<PostService>,
}

impl SocialService {
    pub fn new(storage: Arc<SeaOrmStorage>, posts: Arc<PostService>) -> Self {
        Self { storage, posts }
    }

    async fn user_named(&self, username: &str) -> Result<User> {
        self.storage
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| AgoraError::not_found(format!("User '{}' not found", username)))
    }

    pub async fn toggle_follow(&self, user: i64, target: i64) -> Result<FollowToggle> {
        if user == target {
            return Err(AgoraError::validation("Cannot follow yourself"));
        }
        if self.storage.find_user_by_id(target).await?.is_none() {
            return Err(AgoraError::not_found(format!("User {} not found", target)));
        }

        let (following, follower_count) = self.storage.toggle_follow(user, target).await?;
        info!(
            "SocialService: user {} {} user {}",
            user,
            if following { "followed" } else { "unfollowed" },
            target
        );
        Ok(FollowToggle {
            following,
            follower_count,
        })
    }

    pub async fn followers(&self, username: &str) -> Result<Vec<UserSummary>> {
        let user = self.user_named(username).await?;
        let users = self.storage.list_followers(user.id).await?;
        Ok(users.iter().map(UserSummary::from).collect())
    }

    pub async fn following(&self, username: &str) -> Result<Vec<UserSummary>> {
        let user = self.user_named(username).await?;
        let users = self.storage.list_following(user.id).await?;
        Ok(users.iter().map(UserSummary::from).collect())
    }

    pub async fn is_following(&self, follower: i64, following: i64) -> Result<bool> {
        self.storage.is_following(follower, following).await
    }

    pub async fn profile(&self, viewer: i64, username: &str) -> Result<ProfileView> {
        let user = self.user_named(username).await?;
        self.profile_of(viewer, user).await
    }

    /// 已经拿到 User 时（例如查看自己的主页）直接组装
    pub async fn profile_of(&self, viewer: i64, user: User) -> Result<ProfileView> {
        let posts = self.posts.posts_by_user(viewer, user.id).await?;
        let follower_count = self.storage.count_followers(user.id).await?;
        let following_count = self.storage.count_following(user.id).await?;
        let is_self = viewer == user.id;
        let is_following = !is_self && self.storage.is_following(viewer, user.id).await?;

        Ok(ProfileView {
            user: ProfileUser::new(user, is_self),
            posts,
            follower_count,
            following_count,
            is_following,
            is_self,
        })
    }

    /// People the viewer might want to follow
    pub async fn suggestions(&self, viewer: i64, limit: u64) -> Result<Vec<UserSummary>> {
        let users = self.storage.suggest_users(viewer, limit).await?;
        Ok(users.iter().map(UserSummary::from).collect())
    }
}
