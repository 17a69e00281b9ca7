use std::collections::HashMap;

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set};

use super::converters::model_to_comment;
use super::{CountRow, SeaOrmStorage, count_rows_to_map};
use crate::errors::Result;
use crate::storage::models::Comment;

use migration::entities::comment;

impl SeaOrmStorage {
    pub async fn insert_comment(&self, user_id: i64, post_id: i64, content: &str) -> Result<Comment> {
        let model = comment::ActiveModel {
            content: Set(content.to_string()),
            user_id: Set(user_id),
            post_id: Set(post_id),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        };
        let model = comment::Entity::insert(model)
            .exec_with_returning(&self.db)
            .await?;
        Ok(model_to_comment(model))
    }

    /// 评论按时间正序
    pub async fn list_comments(&self, post_id: i64) -> Result<Vec<Comment>> {
        let models = comment::Entity::find()
            .filter(comment::Column::PostId.eq(post_id))
            .order_by_asc(comment::Column::CreatedAt)
            .order_by_asc(comment::Column::Id)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(model_to_comment).collect())
    }

    /// 批量加载多个帖子的评论，每个帖子内按时间正序
    pub async fn list_comments_for_posts(&self, post_ids: &[i64]) -> Result<HashMap<i64, Vec<Comment>>> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let models = comment::Entity::find()
            .filter(comment::Column::PostId.is_in(post_ids.iter().copied()))
            .order_by_asc(comment::Column::CreatedAt)
            .order_by_asc(comment::Column::Id)
            .all(&self.db)
            .await?;

        let mut grouped: HashMap<i64, Vec<Comment>> = HashMap::new();
        for model in models {
            grouped
                .entry(model.post_id)
                .or_default()
                .push(model_to_comment(model));
        }
        Ok(grouped)
    }

    pub async fn count_comments_for(&self, post_ids: &[i64]) -> Result<HashMap<i64, u64>> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = comment::Entity::find()
            .select_only()
            .column_as(comment::Column::PostId, "key")
            .column_as(comment::Column::Id.count(), "count")
            .filter(comment::Column::PostId.is_in(post_ids.iter().copied()))
            .group_by(comment::Column::PostId)
            .into_model::<CountRow>()
            .all(&self.db)
            .await?;
        Ok(count_rows_to_map(rows))
    }
}
