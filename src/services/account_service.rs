//! Account service
//!
//! Signup, login, profile edits and password management. Shared by the
//! HTTP handlers and the CLI.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::media::{MediaCategory, MediaStore, Upload};
use crate::errors::{AgoraError, Result};
use crate::storage::{NewUser, SeaOrmStorage, User};
use crate::utils::password::{hash_password, is_argon2_hash, verify_password};

const USERNAME_MIN_LEN: usize = 3;
const USERNAME_MAX_LEN: usize = 30;
const PASSWORD_MIN_LEN: usize = 8;
const FULL_NAME_MAX_LEN: usize = 100;
const BIO_MAX_LEN: usize = 500;

// ============ Request/Response DTOs ============

/// Signup form (JSON or urlencoded)
#[derive(Debug, Clone, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    pub password: String,
    pub confirm_password: String,
}

/// Profile edit; a missing field keeps the stored value, an empty one clears it
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

/// Public face of a user, embedded in posts, comments and member lists
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub full_name: Option<String>,
    pub profile_picture: String,
}

impl UserSummary {
    /// 作者已不存在时的占位
    pub fn unknown(profile_picture: &str) -> Self {
        Self {
            id: 0,
            username: "Unknown User".to_string(),
            full_name: None,
            profile_picture: profile_picture.to_string(),
        }
    }
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            profile_picture: user.profile_picture.clone(),
        }
    }
}

// ============ Validation ============

pub fn validate_username(username: &str) -> Result<()> {
    let len = username.chars().count();
    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
        return Err(AgoraError::validation(format!(
            "Username must be {}-{} characters",
            USERNAME_MIN_LEN, USERNAME_MAX_LEN
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    {
        return Err(AgoraError::validation(
            "Username may only contain letters, digits, '_' and '.'",
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<()> {
    let invalid = || AgoraError::validation("Invalid email address");

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    match domain.split_once('.') {
        Some((host, _)) if !host.is_empty() && !domain.ends_with('.') => Ok(()),
        _ => Err(invalid()),
    }
}

pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < PASSWORD_MIN_LEN {
        return Err(AgoraError::validation(format!(
            "Password must be at least {} characters",
            PASSWORD_MIN_LEN
        )));
    }
    Ok(())
}

/// 去掉首尾空白，空串视为 None
fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn check_max_len(field: &str, value: Option<&str>, max: usize) -> Result<()> {
    match value {
        Some(v) if v.chars().count() > max => Err(AgoraError::validation(format!(
            "{} must be at most {} characters",
            field, max
        ))),
        _ => Ok(()),
    }
}

// ============ Service ============

pub struct AccountService {
    storage: Arc<SeaOrmStorage>,
    media: Arc<MediaStore>,
}

impl AccountService {
    pub fn new(storage: Arc<SeaOrmStorage>, media: Arc<MediaStore>) -> Self {
        Self { storage, media }
    }

    /// Register a new account
    pub async fn signup(&self, req: SignupRequest) -> Result<User> {
        let username = req.username.trim().to_string();
        let email = req.email.trim().to_lowercase();

        if req.password != req.confirm_password {
            return Err(AgoraError::validation("Passwords do not match"));
        }
        validate_username(&username)?;
        validate_email(&email)?;
        validate_password(&req.password)?;
        let full_name = normalize_optional(req.full_name);
        check_max_len("Full name", full_name.as_deref(), FULL_NAME_MAX_LEN)?;

        if self.storage.find_user_by_username(&username).await?.is_some() {
            return Err(AgoraError::conflict("Username already taken"));
        }
        if self.storage.find_user_by_email(&email).await?.is_some() {
            return Err(AgoraError::conflict("Email already registered"));
        }

        let password_hash = hash_password(&req.password)?;
        let user = self
            .storage
            .insert_user(NewUser {
                username,
                email,
                password_hash,
                full_name,
                profile_picture: self.media.default_profile_picture().to_string(),
            })
            .await?;

        info!("AccountService: registered user '{}'", user.username);
        Ok(user)
    }

    /// Check credentials for login
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User> {
        let invalid = || AgoraError::unauthorized("Invalid username or password");

        let user = self
            .storage
            .find_user_by_username(username.trim())
            .await?
            .ok_or_else(invalid)?;

        // 非 Argon2 格式的存量数据无法校验，按凭据错误处理
        if !is_argon2_hash(&user.password_hash) {
            warn!("AccountService: user '{}' has no usable password hash", user.username);
            return Err(invalid());
        }
        if !verify_password(password, &user.password_hash)? {
            warn!("AccountService: failed login for '{}'", user.username);
            return Err(invalid());
        }
        if !user.is_active {
            return Err(AgoraError::forbidden("Account is disabled"));
        }

        Ok(user)
    }

    pub async fn get_user(&self, id: i64) -> Result<User> {
        self.storage
            .find_user_by_id(id)
            .await?
            .ok_or_else(|| AgoraError::not_found(format!("User {} not found", id)))
    }

    pub async fn get_by_username(&self, username: &str) -> Result<User> {
        self.storage
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| AgoraError::not_found(format!("User '{}' not found", username)))
    }

    pub async fn update_profile(&self, id: i64, req: UpdateProfileRequest) -> Result<User> {
        let full_name = req.full_name.map(|v| normalize_optional(Some(v)));
        let bio = req.bio.map(|v| normalize_optional(Some(v)));
        check_max_len("Full name", full_name.as_ref().and_then(|v| v.as_deref()), FULL_NAME_MAX_LEN)?;
        check_max_len("Bio", bio.as_ref().and_then(|v| v.as_deref()), BIO_MAX_LEN)?;

        self.storage.update_user_profile(id, full_name, bio).await
    }

    /// Replace the profile picture (images only)
    pub async fn update_profile_picture(&self, id: i64, upload: Upload) -> Result<User> {
        // 先确认用户存在，避免写入孤儿文件
        self.get_user(id).await?;

        let stored = self
            .media
            .save(MediaCategory::ProfilePicture, Some(id), upload)
            .await?;
        match self.storage.set_profile_picture(id, &stored.url).await {
            Ok(user) => Ok(user),
            Err(e) => {
                self.media.discard(&stored).await;
                Err(e)
            }
        }
    }

    pub async fn change_password(&self, id: i64, current: &str, new: &str) -> Result<()> {
        let user = self.get_user(id).await?;
        if !verify_password(current, &user.password_hash)? {
            return Err(AgoraError::validation("Current password is incorrect"));
        }
        validate_password(new)?;

        let hash = hash_password(new)?;
        self.storage.set_password_hash(id, &hash).await
    }

    /// Set a new password without the old one (CLI only)
    pub async fn reset_password(&self, username: &str, new: &str) -> Result<User> {
        let user = self.get_by_username(username).await?;
        validate_password(new)?;

        let hash = hash_password(new)?;
        self.storage.set_password_hash(user.id, &hash).await?;
        info!("AccountService: password reset for '{}'", user.username);
        Ok(user)
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.storage.list_users().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_rules() {
        assert!(validate_username("ada").is_ok());
        assert!(validate_username("grace.hopper_1").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username(&"x".repeat(31)).is_err());
        assert!(validate_username("with space").is_err());
        assert!(validate_username("dash-name").is_err());
        assert!(validate_username("émile").is_err());
    }

    #[test]
    fn test_email_rules() {
        assert!(validate_email("ada@example.com").is_ok());
        assert!(validate_email("a.b@mail.example.org").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("ada@").is_err());
        assert!(validate_email("ada@localhost").is_err());
        assert!(validate_email("ada@@example.com").is_err());
        assert!(validate_email("ada@.com").is_err());
        assert!(validate_email("ada@example.").is_err());
        assert!(validate_email("a da@example.com").is_err());
    }

    #[test]
    fn test_password_rules() {
        assert!(validate_password("12345678").is_ok());
        assert!(validate_password("1234567").is_err());
    }

    #[test]
    fn test_normalize_optional() {
        assert_eq!(normalize_optional(Some("  Ada  ".into())), Some("Ada".into()));
        assert_eq!(normalize_optional(Some("   ".into())), None);
        assert_eq!(normalize_optional(None), None);
    }
}
