//! 点赞（一人一帖最多一条）

use std::collections::{HashMap, HashSet};

use sea_orm::{
    ColumnTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QuerySelect, Set,
    TransactionTrait, sea_query::OnConflict,
};
use tracing::debug;

use super::{CountRow, SeaOrmStorage, TxnResult, count_rows_to_map};
use crate::errors::{AgoraError, Result};

use migration::entities::like;

impl SeaOrmStorage {
    /// 切换点赞状态，返回 (是否已点赞, 当前点赞数)
    ///
    /// 查询、增删与计数在同一事务中完成；并发插入撞上唯一索引时视为已点赞。
    pub async fn toggle_like(&self, user_id: i64, post_id: i64) -> Result<(bool, u64)> {
        let (liked, like_count) = self
            .run_write_txn("toggle_like", || self.toggle_like_txn(user_id, post_id))
            .await
            .map_err(|e| AgoraError::database_operation(format!("Failed to toggle like: {}", e)))?;

        debug!(
            "Like toggled: user={} post={} liked={} count={}",
            user_id, post_id, liked, like_count
        );
        Ok((liked, like_count))
    }

    async fn toggle_like_txn(&self, user_id: i64, post_id: i64) -> TxnResult<(bool, u64)> {
        let txn = self.db.begin().await?;

        let existing = like::Entity::find()
            .filter(like::Column::UserId.eq(user_id))
            .filter(like::Column::PostId.eq(post_id))
            .one(&txn)
            .await?;

        let liked = match existing {
            Some(row) => {
                like::Entity::delete_by_id(row.id).exec(&txn).await?;
                false
            }
            None => {
                let model = like::ActiveModel {
                    user_id: Set(user_id),
                    post_id: Set(post_id),
                    created_at: Set(chrono::Utc::now()),
                    ..Default::default()
                };
                let result = like::Entity::insert(model)
                    .on_conflict(
                        OnConflict::columns([like::Column::UserId, like::Column::PostId])
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

        let like_count = like::Entity::find()
            .filter(like::Column::PostId.eq(post_id))
            .count(&txn)
            .await?;

        txn.commit().await?;
        Ok((liked, like_count))
    }

    /// 批量统计点赞数
    pub async fn count_likes_for(&self, post_ids: &[i64]) -> Result<HashMap<i64, u64>> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = like::Entity::find()
            .select_only()
            .column_as(like::Column::PostId, "key")
            .column_as(like::Column::Id.count(), "count")
            .filter(like::Column::PostId.is_in(post_ids.iter().copied()))
            .group_by(like::Column::PostId)
            .into_model::<CountRow>()
            .all(&self.db)
            .await?;
        Ok(count_rows_to_map(rows))
    }

    /// 给定帖子中，用户点过赞的那些
    pub async fn liked_post_ids(&self, user_id: i64, post_ids: &[i64]) -> Result<HashSet<i64>> {
        if post_ids.is_empty() {
            return Ok(HashSet::new());
        }
        let ids: Vec<i64> = like::Entity::find()
            .select_only()
            .column(like::Column::PostId)
            .filter(like::Column::UserId.eq(user_id))
            .filter(like::Column::PostId.is_in(post_ids.iter().copied()))
            .into_tuple::<i64>()
            .all(&self.db)
            .await?;
        Ok(ids.into_iter().collect())
    }
}
