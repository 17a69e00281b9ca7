//! 帖子相关的数据库操作

use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect};
use tracing::info;

use super::converters::{model_to_post, new_post_to_active_model};
use super::{SeaOrmStorage, retry};
use crate::errors::{AgoraError, Result};
use crate::storage::models::{NewPost, Post};

use migration::entities::post;

const FEED_COUNT_KEY: &str = "count:feed";

impl SeaOrmStorage {
    pub async fn insert_post(&self, new: NewPost) -> Result<Post> {
        let model = post::Entity::insert(new_post_to_active_model(&new))
            .exec_with_returning(&self.db)
            .await
            .map_err(|e| AgoraError::database_operation(format!("Failed to insert post: {}", e)))?;

        self.invalidate_count_cache();
        info!("Post created: id={} owner={}", model.id, model.owner_id);
        Ok(model_to_post(model))
    }

    pub async fn find_post(&self, id: i64) -> Result<Option<Post>> {
        let db = &self.db;
        let model = retry::with_retry(&format!("find_post({})", id), self.retry_config, || {
            post::Entity::find_by_id(id).one(db)
        })
        .await?;
        Ok(model.map(model_to_post))
    }

    /// 删除帖子；点赞和评论由外键级联删除
    pub async fn delete_post(&self, id: i64) -> Result<()> {
        let result = post::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(AgoraError::not_found(format!("Post {} not found", id)));
        }

        self.invalidate_count_cache();
        info!("Post deleted: id={}", id);
        Ok(())
    }

    /// 首页 feed：全部帖子按时间倒序分页（page 从 1 开始）
    pub async fn list_feed(&self, page: u64, page_size: u64) -> Result<Vec<Post>> {
        let db = &self.db;
        // OFFSET/LIMIT 以 i64 绑定，越界的页必然为空
        let offset = match page.saturating_sub(1).checked_mul(page_size) {
            Some(offset) if offset <= i64::MAX as u64 && page_size <= i64::MAX as u64 => offset,
            _ => return Ok(Vec::new()),
        };
        let models = retry::with_retry(
            &format!("list_feed(page={})", page),
            self.retry_config,
            || {
                post::Entity::find()
                    .order_by_desc(post::Column::CreatedAt)
                    .order_by_desc(post::Column::Id)
                    .offset(offset)
                    .limit(page_size)
                    .all(db)
            },
        )
        .await?;
        Ok(models.into_iter().map(model_to_post).collect())
    }

    /// 帖子总数（带 30 秒缓存）
    pub async fn count_feed(&self) -> Result<u64> {
        if let Some(count) = self.count_cache.get(FEED_COUNT_KEY) {
            return Ok(count);
        }
        let count = post::Entity::find().count(&self.db).await?;
        self.count_cache.insert(FEED_COUNT_KEY.to_string(), count);
        Ok(count)
    }

    pub async fn list_posts_by_owner(&self, owner_id: i64) -> Result<Vec<Post>> {
        let models = post::Entity::find()
            .filter(post::Column::OwnerId.eq(owner_id))
            .order_by_desc(post::Column::CreatedAt)
            .order_by_desc(post::Column::Id)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(model_to_post).collect())
    }

    pub async fn list_posts_by_group(&self, group_id: i64) -> Result<Vec<Post>> {
        let models = post::Entity::find()
            .filter(post::Column::GroupId.eq(group_id))
            .order_by_desc(post::Column::CreatedAt)
            .order_by_desc(post::Column::Id)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(model_to_post).collect())
    }
}
