use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::info;

use crate::errors::{AgoraError, Result};
use migration::{Migrator, MigratorTrait};

/// 规范化数据库 URL
///
/// - 裸路径 / `:memory:` 补全为 `sqlite:` 形式
/// - `mariadb://` 统一为 `mysql://`
pub fn normalize_database_url(database_url: &str) -> String {
    if database_url == ":memory:" {
        return "sqlite::memory:".to_string();
    }
    if let Some(rest) = database_url.strip_prefix("mariadb://") {
        return format!("mysql://{}", rest);
    }
    let is_bare_sqlite_path = !database_url.contains("://")
        && !database_url.starts_with("sqlite:")
        && (database_url.ends_with(".db") || database_url.ends_with(".sqlite"));
    if is_bare_sqlite_path {
        return format!("sqlite://{}", database_url);
    }
    database_url.to_string()
}

/// 连接 SQLite 数据库（自动创建 + WAL + 外键约束）
pub async fn connect_sqlite(database_url: &str) -> Result<DatabaseConnection> {
    use sea_orm::SqlxSqliteConnector;
    use sea_orm::sqlx::SqlitePool;
    use sea_orm::sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteSynchronous};
    use std::str::FromStr;

    let opt = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| AgoraError::database_config(format!("Invalid SQLite URL: {}", e)))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(5))
        .pragma("cache_size", "-64000")
        .pragma("temp_store", "memory");

    let pool = SqlitePool::connect_with(opt).await.map_err(|e| {
        AgoraError::database_connection(format!("Cannot connect to SQLite database: {}", e))
    })?;

    Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
}

/// 连接通用数据库（MySQL/PostgreSQL）
pub async fn connect_generic(database_url: &str, backend_name: &str) -> Result<DatabaseConnection> {
    let config = crate::config::get_config();
    let pool_size = config.database.pool_size;

    let mut opt = ConnectOptions::new(database_url.to_owned());
    opt.max_connections(pool_size)
        .min_connections(pool_size.min(5))
        .connect_timeout(std::time::Duration::from_secs(8))
        .acquire_timeout(std::time::Duration::from_secs(8))
        .idle_timeout(std::time::Duration::from_secs(300))
        .max_lifetime(std::time::Duration::from_secs(3600))
        .sqlx_logging(false);

    Database::connect(opt).await.map_err(|e| {
        AgoraError::database_connection(format!(
            "Cannot connect to {} database: {}",
            backend_name.to_uppercase(),
            e
        ))
    })
}

/// 运行数据库迁移
pub async fn run_migrations(db: &DatabaseConnection) -> Result<()> {
    Migrator::up(db, None)
        .await
        .map_err(|e| AgoraError::database_operation(format!("Migration failed: {}", e)))?;

    info!("Database migrations completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_database_url() {
        assert_eq!(normalize_database_url("agora.db"), "sqlite://agora.db");
        assert_eq!(normalize_database_url(":memory:"), "sqlite::memory:");
        assert_eq!(
            normalize_database_url("sqlite://data/agora.db"),
            "sqlite://data/agora.db"
        );
        assert_eq!(
            normalize_database_url("mariadb://root@db/agora"),
            "mysql://root@db/agora"
        );
        assert_eq!(
            normalize_database_url("postgres://u@localhost/agora"),
            "postgres://u@localhost/agora"
        );
    }
}
