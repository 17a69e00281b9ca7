//! 小组与成员关系

use std::collections::HashMap;

use sea_orm::{
    ColumnTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait, sea_query::OnConflict,
};
use tracing::{debug, info};

use super::converters::{model_to_group, model_to_membership, model_to_user, new_group_to_active_model};
use super::{CountRow, SeaOrmStorage, TxnResult, count_rows_to_map};
use crate::errors::{AgoraError, Result};
use crate::storage::models::{Group, Membership, NewGroup, User};

use migration::entities::{group, group_member, user};

impl SeaOrmStorage {
    /// 创建小组，并在同一事务中把创建者加为管理员
    pub async fn create_group_with_admin(&self, new: NewGroup) -> Result<Group> {
        let model = self
            .run_write_txn("create_group", || self.create_group_txn(&new))
            .await
            .map_err(|e| match e.sql_err() {
                Some(sea_orm::SqlErr::UniqueConstraintViolation(_)) => {
                    AgoraError::conflict("Group name already taken")
                }
                _ => AgoraError::database_operation(format!("Failed to create group: {}", e)),
            })?;

        info!("Group created: {} (id={}) by user {}", model.name, model.id, new.created_by);
        Ok(model_to_group(model))
    }

    async fn create_group_txn(&self, new: &NewGroup) -> TxnResult<group::Model> {
        let txn = self.db.begin().await?;

        let model = group::Entity::insert(new_group_to_active_model(new))
            .exec_with_returning(&txn)
            .await?;

        let admin = group_member::ActiveModel {
            group_id: Set(model.id),
            user_id: Set(new.created_by),
            is_admin: Set(true),
            joined_at: Set(chrono::Utc::now()),
            ..Default::default()
        };
        group_member::Entity::insert(admin).exec(&txn).await?;

        txn.commit().await?;
        Ok(model)
    }

    pub async fn find_group(&self, id: i64) -> Result<Option<Group>> {
        let model = group::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(model_to_group))
    }

    pub async fn find_group_by_name(&self, name: &str) -> Result<Option<Group>> {
        let model = group::Entity::find()
            .filter(group::Column::Name.eq(name))
            .one(&self.db)
            .await?;
        Ok(model.map(model_to_group))
    }

    /// 全部小组（最新的在前），可限制数量
    pub async fn list_groups(&self, limit: Option<u64>) -> Result<Vec<Group>> {
        let mut query = group::Entity::find()
            .order_by_desc(group::Column::CreatedAt)
            .order_by_desc(group::Column::Id);
        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        let models = query.all(&self.db).await?;
        Ok(models.into_iter().map(model_to_group).collect())
    }

    /// 用户加入的小组
    pub async fn list_groups_for_user(&self, user_id: i64) -> Result<Vec<Group>> {
        let group_ids: Vec<i64> = group_member::Entity::find()
            .select_only()
            .column(group_member::Column::GroupId)
            .filter(group_member::Column::UserId.eq(user_id))
            .into_tuple::<i64>()
            .all(&self.db)
            .await?;
        if group_ids.is_empty() {
            return Ok(Vec::new());
        }
        let models = group::Entity::find()
            .filter(group::Column::Id.is_in(group_ids))
            .order_by_desc(group::Column::CreatedAt)
            .order_by_desc(group::Column::Id)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(model_to_group).collect())
    }

    pub async fn count_members_for(&self, group_ids: &[i64]) -> Result<HashMap<i64, u64>> {
        if group_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = group_member::Entity::find()
            .select_only()
            .column_as(group_member::Column::GroupId, "key")
            .column_as(group_member::Column::Id.count(), "count")
            .filter(group_member::Column::GroupId.is_in(group_ids.iter().copied()))
            .group_by(group_member::Column::GroupId)
            .into_model::<CountRow>()
            .all(&self.db)
            .await?;
        Ok(count_rows_to_map(rows))
    }

    pub async fn find_membership(&self, group_id: i64, user_id: i64) -> Result<Option<Membership>> {
        let model = group_member::Entity::find()
            .filter(group_member::Column::GroupId.eq(group_id))
            .filter(group_member::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?;
        Ok(model.map(model_to_membership))
    }

    /// 切换成员身份，返回 (是否为成员, 当前成员数)
    ///
    /// 唯一的管理员在还有其他成员时不能退出。
    pub async fn toggle_membership(&self, group_id: i64, user_id: i64) -> Result<(bool, u64)> {
        let (joined, member_count) = self
            .run_write_txn("toggle_membership", || {
                self.toggle_membership_txn(group_id, user_id)
            })
            .await
            .map_err(|e| {
                AgoraError::database_operation(format!("Failed to toggle membership: {}", e))
            })??;

        debug!(
            "Membership toggled: group={} user={} joined={} members={}",
            group_id, user_id, joined, member_count
        );
        Ok((joined, member_count))
    }

    /// 外层是数据库错误（可重试），内层是业务拒绝（事务随 drop 回滚）
    async fn toggle_membership_txn(
        &self,
        group_id: i64,
        user_id: i64,
    ) -> TxnResult<Result<(bool, u64)>> {
        let txn = self.db.begin().await?;

        let existing = group_member::Entity::find()
            .filter(group_member::Column::GroupId.eq(group_id))
            .filter(group_member::Column::UserId.eq(user_id))
            .one(&txn)
            .await?;

        let joined = match existing {
            Some(row) => {
                if row.is_admin {
                    let admins = group_member::Entity::find()
                        .filter(group_member::Column::GroupId.eq(group_id))
                        .filter(group_member::Column::IsAdmin.eq(true))
                        .count(&txn)
                        .await?;
                    let members = group_member::Entity::find()
                        .filter(group_member::Column::GroupId.eq(group_id))
                        .count(&txn)
                        .await?;
                    if admins <= 1 && members > 1 {
                        return Ok(Err(AgoraError::validation(
                            "The only admin cannot leave while the group has other members",
                        )));
                    }
                }
                group_member::Entity::delete_by_id(row.id).exec(&txn).await?;
                false
            }
            None => {
                let model = group_member::ActiveModel {
                    group_id: Set(group_id),
                    user_id: Set(user_id),
                    is_admin: Set(false),
                    joined_at: Set(chrono::Utc::now()),
                    ..Default::default()
                };
                let result = group_member::Entity::insert(model)
                    .on_conflict(
                        OnConflict::columns([
                            group_member::Column::GroupId,
                            group_member::Column::UserId,
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

        let member_count = group_member::Entity::find()
            .filter(group_member::Column::GroupId.eq(group_id))
            .count(&txn)
            .await?;

        txn.commit().await?;
        Ok(Ok((joined, member_count)))
    }

    /// 小组成员及其管理员标记（按加入时间）
    pub async fn list_members(&self, group_id: i64) -> Result<Vec<(User, bool)>> {
        let memberships = group_member::Entity::find()
            .filter(group_member::Column::GroupId.eq(group_id))
            .order_by_asc(group_member::Column::JoinedAt)
            .order_by_asc(group_member::Column::Id)
            .all(&self.db)
            .await?;
        if memberships.is_empty() {
            return Ok(Vec::new());
        }

        let mut users: HashMap<i64, user::Model> = user::Entity::find()
            .filter(user::Column::Id.is_in(memberships.iter().map(|m| m.user_id)))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|m| (m.id, m))
            .collect();

        Ok(memberships
            .into_iter()
            .filter_map(|m| users.remove(&m.user_id).map(|u| (model_to_user(u), m.is_admin)))
            .collect())
    }
}
