//! Shared setup for integration tests
//!
//! Every test gets its own SQLite file and upload directory inside a
//! `TempDir`; the global config is installed once per test binary.

#![allow(dead_code)]

use std::sync::{Arc, Once};

use tempfile::TempDir;

use agora::config::{MediaConfig, StaticConfig, set_config};
use agora::services::{AppServices, SignupRequest, Upload};
use agora::storage::{SeaOrmStorage, User};

pub const TEST_JWT_SECRET: &str = "integration-test-secret-0123456789abcdef";
pub const TEST_PASSWORD: &str = "hunter2hunter2";

static INIT: Once = Once::new();

pub fn init_test_config() {
    INIT.call_once(|| {
        let mut config = StaticConfig::default();
        config.auth.jwt_secret = TEST_JWT_SECRET.to_string();
        config.database.retry_count = 1;
        config.logging.level = "warn".to_string();
        set_config(config);
    });
}

/// 测试环境：临时目录必须和 services 一起存活
pub struct TestEnv {
    pub dir: TempDir,
    pub services: AppServices,
}

pub async fn setup() -> TestEnv {
    init_test_config();

    let dir = TempDir::new().expect("Failed to create temp dir");
    let db_url = format!("sqlite://{}?mode=rwc", dir.path().join("agora_test.db").display());
    let storage = Arc::new(
        SeaOrmStorage::new(&db_url, "sqlite")
            .await
            .expect("Failed to create storage"),
    );

    let media_config = MediaConfig {
        upload_dir: dir.path().join("uploads").display().to_string(),
        ..MediaConfig::default()
    };
    let services = AppServices::new(storage, &media_config);
    services
        .media
        .ensure_dirs()
        .await
        .expect("Failed to create upload dirs");

    TestEnv { dir, services }
}

pub fn signup_request(username: &str) -> SignupRequest {
    SignupRequest {
        username: username.to_string(),
        email: format!("{}@example.com", username),
        full_name: None,
        password: TEST_PASSWORD.to_string(),
        confirm_password: TEST_PASSWORD.to_string(),
    }
}

pub async fn create_user(services: &AppServices, username: &str) -> User {
    services
        .accounts
        .signup(signup_request(username))
        .await
        .expect("signup should succeed")
}

/// 最小的 PNG 文件头，内容本身不会被解码
pub fn png_upload() -> Upload {
    Upload {
        filename: Some("photo.png".to_string()),
        content_type: "image/png".to_string(),
        bytes: vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0],
    }
}

pub fn mp4_upload() -> Upload {
    Upload {
        filename: Some("clip.mp4".to_string()),
        content_type: "video/mp4".to_string(),
        bytes: vec![0, 0, 0, 0x18, b'f', b't', b'y', b'p', b'm', b'p', b'4', b'2'],
    }
}
