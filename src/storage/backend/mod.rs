//! SeaORM storage backend
//!
//! This module provides database storage using SeaORM,
//! supporting SQLite, MySQL/MariaDB, and PostgreSQL.

mod comments;
mod connection;
mod converters;
mod follows;
mod groups;
mod likes;
mod posts;
pub mod retry;
mod users;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use sea_orm::{DatabaseConnection, DbErr, FromQueryResult};
use tokio::sync::Mutex;
use tracing::warn;

use crate::errors::{AgoraError, Result};
use crate::storage::models::StorageConfig;

pub use connection::{connect_generic, connect_sqlite, normalize_database_url, run_migrations};

/// 从数据库 URL 推断数据库类型
pub fn infer_backend_from_url(database_url: &str) -> Result<String> {
    if database_url.starts_with("sqlite:")
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
        || database_url == ":memory:"
    {
        Ok("sqlite".to_string())
    } else if database_url.starts_with("mysql://") || database_url.starts_with("mariadb://") {
        Ok("mysql".to_string())
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Ok("postgres".to_string())
    } else {
        Err(AgoraError::database_config(format!(
            "Cannot infer database type from URL: {}. Supported: sqlite://, mysql://, mariadb://, postgres://, postgresql://",
            database_url
        )))
    }
}

/// 按 key 聚合的计数行（GROUP BY 查询结果）
#[derive(Debug, FromQueryResult)]
pub(crate) struct CountRow {
    pub key: i64,
    pub count: i64,
}

/// 事务体的返回类型：DbErr 交给重试判断，业务错误放在内层
pub(crate) type TxnResult<T> = std::result::Result<T, DbErr>;

pub(crate) fn count_rows_to_map(rows: Vec<CountRow>) -> HashMap<i64, u64> {
    rows.into_iter()
        .map(|row| (row.key, row.count.max(0) as u64))
        .collect()
}

/// SeaORM-based storage backend
#[derive(Clone)]
pub struct SeaOrmStorage {
    db: DatabaseConnection,
    backend_name: String,
    /// Feed 总数缓存（TTL 30秒）
    count_cache: Cache<String, u64>,
    /// 重试配置
    retry_config: retry::RetryConfig,
    /// 读后写事务的进程内写锁
    write_lock: Arc<Mutex<()>>,
}

impl SeaOrmStorage {
    pub async fn new(database_url: &str, backend_name: &str) -> Result<Self> {
        if database_url.is_empty() {
            return Err(AgoraError::database_config("database_url is not set"));
        }

        let config = crate::config::get_config();
        let retry_config = retry::RetryConfig::from(&config.database);

        let database_url = normalize_database_url(database_url);
        let db = if backend_name == "sqlite" {
            connect_sqlite(&database_url).await?
        } else {
            connect_generic(&database_url, backend_name).await?
        };

        let storage = SeaOrmStorage {
            db,
            backend_name: backend_name.to_string(),
            count_cache: Cache::builder()
                .time_to_live(Duration::from_secs(30))
                .max_capacity(100)
                .build(),
            retry_config,
            write_lock: Arc::new(Mutex::new(())),
        };

        run_migrations(&storage.db).await?;

        warn!(
            "{} Storage initialized.",
            storage.backend_name.to_uppercase()
        );
        Ok(storage)
    }

    pub fn get_backend_config(&self) -> StorageConfig {
        StorageConfig {
            storage_type: self.backend_name.clone(),
        }
    }

    /// 获取数据库连接
    pub fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// 健康检查
    pub async fn ping(&self) -> Result<()> {
        self.db
            .ping()
            .await
            .map_err(|e| AgoraError::database_connection(format!("Ping failed: {}", e)))
    }

    /// 串行执行一个读后写事务，瞬时错误按配置重试
    ///
    /// SQLite 的 deferred 事务从读锁升级为写锁失败时直接返回 BUSY，busy_timeout 不生效，
    /// 因此同一进程内这类事务必须排队。
    pub(crate) async fn run_write_txn<T, F, Fut>(
        &self,
        operation_name: &str,
        operation: F,
    ) -> TxnResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = TxnResult<T>>,
    {
        let _guard = self.write_lock.lock().await;
        retry::with_retry(operation_name, self.retry_config, operation).await
    }

    /// 清除 COUNT 缓存（帖子增删时调用）
    pub fn invalidate_count_cache(&self) {
        self.count_cache.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_backend_from_url() {
        assert_eq!(infer_backend_from_url("sqlite://agora.db").unwrap(), "sqlite");
        assert_eq!(infer_backend_from_url("sqlite::memory:").unwrap(), "sqlite");
        assert_eq!(infer_backend_from_url("data/agora.db").unwrap(), "sqlite");
        assert_eq!(
            infer_backend_from_url("postgres://u:p@localhost/agora").unwrap(),
            "postgres"
        );
        assert_eq!(
            infer_backend_from_url("postgresql://u:p@localhost/agora").unwrap(),
            "postgres"
        );
        assert_eq!(
            infer_backend_from_url("mariadb://u:p@localhost/agora").unwrap(),
            "mysql"
        );
        assert!(infer_backend_from_url("redis://localhost").is_err());
    }

    #[test]
    fn test_count_rows_to_map() {
        let map = count_rows_to_map(vec![
            CountRow { key: 1, count: 3 },
            CountRow { key: 2, count: 0 },
        ]);
        assert_eq!(map.get(&1), Some(&3));
        assert_eq!(map.get(&2), Some(&0));
        assert_eq!(map.get(&3), None);
    }
}
