//! 关注关系

use sea_orm::{
    ColumnTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait, sea_query::OnConflict,
};
use tracing::debug;

use super::{SeaOrmStorage, TxnResult};
use super::converters::model_to_user;
use crate::errors::{AgoraError, Result};
use crate::storage::models::User;

use migration::entities::{follow, user};

impl SeaOrmStorage {
    /// 切换关注状态，返回 (是否已关注, 被关注者的粉丝数)
    pub async fn toggle_follow(&self, follower_id: i64, following_id: i64) -> Result<(bool, u64)> {
        if follower_id == following_id {
            return Err(AgoraError::validation("Cannot follow yourself"));
        }

        let (following, follower_count) = self
            .run_write_txn("toggle_follow", || {
                self.toggle_follow_txn(follower_id, following_id)
            })
            .await
            .map_err(|e| AgoraError::database_operation(format!("Failed to toggle follow: {}", e)))?;

        debug!(
            "Follow toggled: {} -> {} following={} followers={}",
            follower_id, following_id, following, follower_count
        );
        Ok((following, follower_count))
    }

    async fn toggle_follow_txn(&self, follower_id: i64, following_id: i64) -> TxnResult<(bool, u64)> {
        let txn = self.db.begin().await?;

        let existing = follow::Entity::find()
            .filter(follow::Column::FollowerId.eq(follower_id))
            .filter(follow::Column::FollowingId.eq(following_id))
            .one(&txn)
            .await?;

        let following = match existing {
            Some(row) => {
                follow::Entity::delete_by_id(row.id).exec(&txn).await?;
                false
            }
            None => {
                let model = follow::ActiveModel {
                    follower_id: Set(follower_id),
                    following_id: Set(following_id),
                    created_at: Set(chrono::Utc::now()),
                    ..Default::default()
                };
                let result = follow::Entity::insert(model)
                    .on_conflict(
                        OnConflict::columns([
                            follow::Column::FollowerId,
                            follow::Column::FollowingId,
                        ])
                        .do_nothing()
                        .to_owned(),
                    )
                    .exec(&txn)
                    .await;
                match result {
                    Ok(_) | Err(DbErr::RecordNotInserted) => true,
                    Err(e) => return Err(e),
                }
            }
        };

        let follower_count = follow::Entity::find()
            .filter(follow::Column::FollowingId.eq(following_id))
            .count(&txn)
            .await?;

        txn.commit().await?;
        Ok((following, follower_count))
    }

    pub async fn is_following(&self, follower_id: i64, following_id: i64) -> Result<bool> {
        let count = follow::Entity::find()
            .filter(follow::Column::FollowerId.eq(follower_id))
            .filter(follow::Column::FollowingId.eq(following_id))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    pub async fn count_followers(&self, user_id: i64) -> Result<u64> {
        Ok(follow::Entity::find()
            .filter(follow::Column::FollowingId.eq(user_id))
            .count(&self.db)
            .await?)
    }

    pub async fn count_following(&self, user_id: i64) -> Result<u64> {
        Ok(follow::Entity::find()
            .filter(follow::Column::FollowerId.eq(user_id))
            .count(&self.db)
            .await?)
    }

    /// 关注 user_id 的人（最近关注的在前）
    pub async fn list_followers(&self, user_id: i64) -> Result<Vec<User>> {
        let ids: Vec<i64> = follow::Entity::find()
            .select_only()
            .column(follow::Column::FollowerId)
            .filter(follow::Column::FollowingId.eq(user_id))
            .order_by_desc(follow::Column::CreatedAt)
            .into_tuple::<i64>()
            .all(&self.db)
            .await?;
        self.users_in_order(&ids).await
    }

    /// user_id 关注的人（最近关注的在前）
    pub async fn list_following(&self, user_id: i64) -> Result<Vec<User>> {
        let ids: Vec<i64> = follow::Entity::find()
            .select_only()
            .column(follow::Column::FollowingId)
            .filter(follow::Column::FollowerId.eq(user_id))
            .order_by_desc(follow::Column::CreatedAt)
            .into_tuple::<i64>()
            .all(&self.db)
            .await?;
        self.users_in_order(&ids).await
    }

    /// 按 ids 顺序返回用户
    async fn users_in_order(&self, ids: &[i64]) -> Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut by_id: std::collections::HashMap<i64, user::Model> = user::Entity::find()
            .filter(user::Column::Id.is_in(ids.iter().copied()))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|m| (m.id, m))
            .collect();
        Ok(ids
            .iter()
            .filter_map(|id| by_id.remove(id))
            .map(model_to_user)
            .collect())
    }
}
