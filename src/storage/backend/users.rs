//! 用户相关的数据库操作

use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use tracing::info;

use super::converters::{model_to_user, new_user_to_active_model};
use super::{SeaOrmStorage, retry};
use crate::errors::{AgoraError, Result};
use crate::storage::models::{NewUser, User};

use migration::entities::{follow, user};

impl SeaOrmStorage {
    pub async fn insert_user(&self, new: NewUser) -> Result<User> {
        let model = user::Entity::insert(new_user_to_active_model(&new))
            .exec_with_returning(&self.db)
            .await
            .map_err(|e| match e.sql_err() {
                Some(sea_orm::SqlErr::UniqueConstraintViolation(_)) => {
                    AgoraError::conflict(format!("User '{}' already exists", new.username))
                }
                _ => AgoraError::database_operation(format!("Failed to insert user: {}", e)),
            })?;

        info!("User created: {} (id={})", model.username, model.id);
        Ok(model_to_user(model))
    }

    pub async fn find_user_by_id(&self, id: i64) -> Result<Option<User>> {
        let db = &self.db;
        let model = retry::with_retry(&format!("find_user_by_id({})", id), self.retry_config, || {
            user::Entity::find_by_id(id).one(db)
        })
        .await?;
        Ok(model.map(model_to_user))
    }

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let db = &self.db;
        let model = retry::with_retry(
            &format!("find_user_by_username({})", username),
            self.retry_config,
            || {
                user::Entity::find()
                    .filter(user::Column::Username.eq(username))
                    .one(db)
            },
        )
        .await?;
        Ok(model.map(model_to_user))
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let model = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await?;
        Ok(model.map(model_to_user))
    }

    /// 批量加载用户，用于帖子/评论作者信息的组装
    pub async fn find_users_by_ids(&self, ids: &[i64]) -> Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let models = user::Entity::find()
            .filter(user::Column::Id.is_in(ids.iter().copied()))
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(model_to_user).collect())
    }

    async fn load_user_model(&self, id: i64) -> Result<user::Model> {
        user::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AgoraError::not_found(format!("User {} not found", id)))
    }

    /// 更新资料（None 表示保持不变）
    pub async fn update_user_profile(
        &self,
        id: i64,
        full_name: Option<Option<String>>,
        bio: Option<Option<String>>,
    ) -> Result<User> {
        let mut am = self.load_user_model(id).await?.into_active_model();
        if let Some(full_name) = full_name {
            am.full_name = Set(full_name);
        }
        if let Some(bio) = bio {
            am.bio = Set(bio);
        }
        let model = am.update(&self.db).await?;
        Ok(model_to_user(model))
    }

    pub async fn set_profile_picture(&self, id: i64, url: &str) -> Result<User> {
        let mut am = self.load_user_model(id).await?.into_active_model();
        am.profile_picture = Set(url.to_string());
        let model = am.update(&self.db).await?;
        Ok(model_to_user(model))
    }

    pub async fn set_password_hash(&self, id: i64, password_hash: &str) -> Result<()> {
        let mut am = self.load_user_model(id).await?.into_active_model();
        am.password_hash = Set(password_hash.to_string());
        am.update(&self.db).await?;
        info!("Password updated for user id={}", id);
        Ok(())
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        let models = user::Entity::find()
            .order_by_asc(user::Column::Id)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(model_to_user).collect())
    }

    /// 推荐用户：排除自己和已关注的人，按注册时间倒序
    pub async fn suggest_users(&self, exclude_id: i64, limit: u64) -> Result<Vec<User>> {
        let followed: Vec<i64> = follow::Entity::find()
            .select_only()
            .column(follow::Column::FollowingId)
            .filter(follow::Column::FollowerId.eq(exclude_id))
            .into_tuple::<i64>()
            .all(&self.db)
            .await?;

        let mut query = user::Entity::find()
            .filter(user::Column::Id.ne(exclude_id))
            .filter(user::Column::IsActive.eq(true));
        if !followed.is_empty() {
            query = query.filter(user::Column::Id.is_not_in(followed));
        }

        let models = query
            .order_by_desc(user::Column::CreatedAt)
            .order_by_desc(user::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(model_to_user).collect())
    }
}
