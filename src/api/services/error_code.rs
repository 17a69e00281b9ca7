//! 统一 API 错误码定义

use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::errors::AgoraError;

/// API 错误码枚举
///
/// 使用 serde_repr 序列化为数字。按千位分域：
/// - 0: 成功
/// - 1000-1099: 通用错误
/// - 2000-2099: 认证错误
/// - 3000-3099: 内容（帖子、评论、小组）错误
/// - 4000-4099: 上传错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum ErrorCode {
    // 成功
    Success = 0,

    // 通用错误 1000-1099
    BadRequest = 1000,
    Unauthorized = 1001,
    Forbidden = 1003,
    NotFound = 1004,
    InternalServerError = 1005,
    Conflict = 1009,
    ServiceUnavailable = 1030,

    // 认证错误 2000-2099
    AuthFailed = 2000,
    TokenExpired = 2001,
    TokenInvalid = 2002,
    CsrfInvalid = 2003,
    RateLimitExceeded = 2004,

    // 内容错误 3000-3099
    ValidationFailed = 3000,

    // 上传错误 4000-4099
    InvalidMultipartData = 4000,
    FileTooLarge = 4001,
    UnsupportedMediaType = 4002,
}

impl From<&AgoraError> for ErrorCode {
    fn from(err: &AgoraError) -> Self {
        match err {
            AgoraError::Validation(_) => ErrorCode::ValidationFailed,
            AgoraError::NotFound(_) => ErrorCode::NotFound,
            AgoraError::Conflict(_) => ErrorCode::Conflict,
            AgoraError::Unauthorized(_) => ErrorCode::AuthFailed,
            AgoraError::Forbidden(_) => ErrorCode::Forbidden,
            AgoraError::Token(msg) if msg.contains("ExpiredSignature") => ErrorCode::TokenExpired,
            AgoraError::Token(_) => ErrorCode::TokenInvalid,
            AgoraError::UnsupportedMedia(_) => ErrorCode::UnsupportedMediaType,
            AgoraError::PayloadTooLarge(_) => ErrorCode::FileTooLarge,
            AgoraError::InvalidMultipart(_) => ErrorCode::InvalidMultipartData,
            AgoraError::DatabaseConfig(_)
            | AgoraError::DatabaseConnection(_)
            | AgoraError::DatabaseOperation(_)
            | AgoraError::FileOperation(_)
            | AgoraError::Serialization(_)
            | AgoraError::PasswordHash(_) => ErrorCode::InternalServerError,
        }
    }
}
