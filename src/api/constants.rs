//! API 模块常量定义
//!
//! 包含认证、Cookie 等相关的硬编码常量。

/// Access Token Cookie 名称
pub const ACCESS_COOKIE_NAME: &str = "agora_access";

/// Refresh Token Cookie 名称
pub const REFRESH_COOKIE_NAME: &str = "agora_refresh";

/// Refresh Cookie 只发往刷新接口
pub const REFRESH_COOKIE_PATH: &str = "/api/auth";

/// CSRF Token Cookie 名称
pub const CSRF_COOKIE_NAME: &str = "csrf_token";

/// CSRF Token 请求头
pub const CSRF_HEADER_NAME: &str = "X-CSRF-Token";

/// 主题 Cookie 名称
pub const THEME_COOKIE_NAME: &str = "theme";

/// 主题 Cookie 有效期（一年）
pub const THEME_COOKIE_MAX_AGE_DAYS: i64 = 365;

/// 非上传类请求体上限
pub const JSON_PAYLOAD_LIMIT: usize = 64 * 1024;
