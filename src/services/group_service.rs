//! Group service
//!
//! Group creation, membership toggling and the group detail page.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::account_service::UserSummary;
use super::media::{MediaCategory, MediaStore, Upload};
use super::post_service::{PostDetail, PostService};
use crate::errors::{AgoraError, Result};
use crate::storage::{Group, NewGroup, SeaOrmStorage};

pub const GROUP_NAME_MAX_LEN: usize = 100;
pub const GROUP_DESCRIPTION_MAX_LEN: usize = 1000;

// ============ Request/Response DTOs ============

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateGroup {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    #[serde(flatten)]
    pub group: Group,
    pub member_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberView {
    pub user: UserSummary,
    pub is_admin: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupDetail {
    pub group: Group,
    pub creator: UserSummary,
    pub member_count: u64,
    pub is_member: bool,
    pub is_admin: bool,
    pub members: Vec<MemberView>,
    pub posts: Vec<PostDetail>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct MembershipToggle {
    pub joined: bool,
    pub member_count: u64,
}

// ============ Service ============

pub struct GroupService {
    storage: Arc<SeaOrmStorage>,
    media: Arc<MediaStore>,
    posts: Arc<PostService>,
}

impl GroupService {
    pub fn new(storage: Arc<SeaOrmStorage>, media: Arc<MediaStore>, posts: Arc<PostService>) -> Self {
        Self {
            storage,
            media,
            posts,
        }
    }

    async fn load_group(&self, id: i64) -> Result<Group> {
        self.storage
            .find_group(id)
            .await?
            .ok_or_else(|| AgoraError::not_found(format!("Group {} not found", id)))
    }

    async fn summarize(&self, groups: Vec<Group>) -> Result<Vec<GroupSummary>> {
        let ids: Vec<i64> = groups.iter().map(|g| g.id).collect();
        let counts = self.storage.count_members_for(&ids).await?;
        Ok(groups
            .into_iter()
            .map(|group| GroupSummary {
                member_count: counts.get(&group.id).copied().unwrap_or(0),
                group,
            })
            .collect())
    }

    /// Create a group; the creator becomes its first admin
    pub async fn create_group(
        &self,
        creator: i64,
        req: CreateGroup,
        cover: Option<Upload>,
    ) -> Result<Group> {
        let name = req.name.trim().to_string();
        if name.is_empty() {
            return Err(AgoraError::validation("Group name cannot be empty"));
        }
        if name.chars().count() > GROUP_NAME_MAX_LEN {
            return Err(AgoraError::validation(format!(
                "Group name must be at most {} characters",
                GROUP_NAME_MAX_LEN
            )));
        }
        let description = req
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        if description
            .as_deref()
            .is_some_and(|d| d.chars().count() > GROUP_DESCRIPTION_MAX_LEN)
        {
            return Err(AgoraError::validation(format!(
                "Description must be at most {} characters",
                GROUP_DESCRIPTION_MAX_LEN
            )));
        }

        // 先查重，避免为注定失败的请求写入封面文件
        if self.storage.find_group_by_name(&name).await?.is_some() {
            return Err(AgoraError::conflict("Group name already taken"));
        }

        let stored = match cover {
            Some(upload) => Some(
                self.media
                    .save(MediaCategory::GroupCover, Some(creator), upload)
                    .await?,
            ),
            None => None,
        };

        let result = self
            .storage
            .create_group_with_admin(NewGroup {
                name,
                description,
                cover_image: stored.as_ref().map(|s| s.url.clone()),
                created_by: creator,
            })
            .await;
        if result.is_err()
            && let Some(stored) = &stored
        {
            self.media.discard(stored).await;
        }
        result
    }

    pub async fn list_groups(&self) -> Result<Vec<GroupSummary>> {
        let groups = self.storage.list_groups(None).await?;
        self.summarize(groups).await
    }

    pub async fn groups_for_user(&self, user: i64) -> Result<Vec<GroupSummary>> {
        let groups = self.storage.list_groups_for_user(user).await?;
        self.summarize(groups).await
    }

    pub async fn group_detail(&self, viewer: i64, id: i64) -> Result<GroupDetail> {
        let group = self.load_group(id).await?;

        let creator = match group.created_by {
            Some(uid) => self.storage.find_user_by_id(uid).await?,
            None => None,
        };
        let creator = creator
            .as_ref()
            .map(UserSummary::from)
            .unwrap_or_else(|| UserSummary::unknown(self.media.default_profile_picture()));

        let membership = self.storage.find_membership(id, viewer).await?;
        let members: Vec<MemberView> = self
            .storage
            .list_members(id)
            .await?
            .iter()
            .map(|(user, is_admin)| MemberView {
                user: UserSummary::from(user),
                is_admin: *is_admin,
            })
            .collect();
        let posts = self.posts.posts_in_group(viewer, id).await?;

        Ok(GroupDetail {
            group,
            creator,
            member_count: members.len() as u64,
            is_member: membership.is_some(),
            is_admin: membership.is_some_and(|m| m.is_admin),
            members,
            posts,
        })
    }

    pub async fn toggle_membership(&self, user: i64, group_id: i64) -> Result<MembershipToggle> {
        self.load_group(group_id).await?;
        let (joined, member_count) = self.storage.toggle_membership(group_id, user).await?;
        info!(
            "GroupService: user {} {} group {}",
            user,
            if joined { "joined" } else { "left" },
            group_id
        );
        Ok(MembershipToggle {
            joined,
            member_count,
        })
    }

    /// Newest groups, for the home page sidebar
    pub async fn suggestions(&self, limit: u64) -> Result<Vec<GroupSummary>> {
        let groups = self.storage.list_groups(Some(limit)).await?;
        self.summarize(groups).await
    }
}
