use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::api::jwt::get_jwt_service;
use crate::config::get_config;
use crate::services::AppServices;
use crate::storage::StorageFactory;

/// 准备服务器启动的上下文
/// 包括存储、业务服务和上传目录
pub async fn prepare_server_startup() -> Result<AppServices> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    // 多次调用时 install_default 会返回 Err，已安装就忽略
    if rustls::crypto::CryptoProvider::get_default().is_none() {
        rustls::crypto::ring::default_provider()
            .install_default()
            .map_err(|e| anyhow::anyhow!("Failed to install rustls crypto provider: {:?}", e))?;
    }

    let storage = StorageFactory::create()
        .await
        .context("Failed to create storage backend")?;
    info!(
        "Using storage backend: {}",
        storage.get_backend_config().storage_type
    );

    let config = get_config();
    let services = AppServices::new(storage, &config.media);

    services
        .media
        .ensure_dirs()
        .await
        .context("Failed to create upload directories")?;
    debug!(
        "Upload directory ready: {}",
        services.media.upload_dir().display()
    );

    // 提前初始化 JWT 服务，空 secret 的警告在启动阶段输出
    let jwt = get_jwt_service();
    debug!(
        "JWT service ready (access {} min, refresh {} days)",
        jwt.access_token_minutes(),
        jwt.refresh_token_days()
    );

    let duration = start_time.elapsed();
    info!(
        "Pre-startup processing completed in {} ms",
        duration.as_millis()
    );

    Ok(services)
}
