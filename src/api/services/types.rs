//! HTTP API 类型定义

use serde::{Deserialize, Serialize};

use crate::services::{FeedPage, GroupSummary, ProfileView, Theme, UserSummary};
use crate::storage::User;

/// 统一响应信封
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    pub data: Option<T>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct MessageResponse {
    pub message: String,
}

// ============ Auth ============

#[derive(Deserialize, Clone, Debug)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// 刷新请求体（可选，cookie 优先）
#[derive(Deserialize, Clone, Debug, Default)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Serialize, Clone, Debug)]
pub struct AuthResponse {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// access token 有效秒数
    pub expires_in: u64,
}

// ============ Profile ============

#[derive(Deserialize, Clone, Debug)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: Option<String>,
}

// ============ Posts ============

#[derive(Deserialize, Clone, Debug)]
pub struct CommentRequest {
    pub content: String,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct PageQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct LimitQuery {
    pub limit: Option<u64>,
}

// ============ Views ============

/// 首页
#[derive(Serialize, Clone, Debug)]
pub struct HomeView {
    #[serde(flatten)]
    pub feed: FeedPage,
    pub suggestions: Vec<UserSummary>,
    pub group_suggestions: Vec<GroupSummary>,
    pub theme: Theme,
}

/// 个人主页
#[derive(Serialize, Clone, Debug)]
pub struct ProfilePage {
    #[serde(flatten)]
    pub profile: ProfileView,
    pub theme: Theme,
}

/// 小组列表页
#[derive(Serialize, Clone, Debug)]
pub struct GroupsView {
    pub all_groups: Vec<GroupSummary>,
    pub user_groups: Vec<GroupSummary>,
}

// ============ Theme ============

#[derive(Deserialize, Clone, Debug)]
pub struct ThemeRequest {
    pub theme: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ThemeResponse {
    pub theme: Theme,
}

// ============ Health ============

#[derive(Serialize, Clone, Debug)]
pub struct HealthStorageCheck {
    pub status: String,
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, Clone, Debug)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub uptime: u64,
    pub storage: HealthStorageCheck,
    pub response_time_ms: u64,
}
