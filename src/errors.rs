use std::fmt;

use actix_web::http::StatusCode;

use crate::utils::password::PasswordError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgoraError {
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    FileOperation(String),
    Validation(String),
    NotFound(String),
    Conflict(String),
    Unauthorized(String),
    Forbidden(String),
    Serialization(String),
    PasswordHash(String),
    Token(String),
    UnsupportedMedia(String),
    PayloadTooLarge(String),
    InvalidMultipart(String),
}

impl AgoraError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            AgoraError::DatabaseConfig(_) => "E001",
            AgoraError::DatabaseConnection(_) => "E002",
            AgoraError::DatabaseOperation(_) => "E003",
            AgoraError::FileOperation(_) => "E004",
            AgoraError::Validation(_) => "E005",
            AgoraError::NotFound(_) => "E006",
            AgoraError::Conflict(_) => "E007",
            AgoraError::Unauthorized(_) => "E008",
            AgoraError::Forbidden(_) => "E009",
            AgoraError::Serialization(_) => "E010",
            AgoraError::PasswordHash(_) => "E011",
            AgoraError::Token(_) => "E012",
            AgoraError::UnsupportedMedia(_) => "E013",
            AgoraError::PayloadTooLarge(_) => "E014",
            AgoraError::InvalidMultipart(_) => "E015",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            AgoraError::DatabaseConfig(_) => "Database Configuration Error",
            AgoraError::DatabaseConnection(_) => "Database Connection Error",
            AgoraError::DatabaseOperation(_) => "Database Operation Error",
            AgoraError::FileOperation(_) => "File Operation Error",
            AgoraError::Validation(_) => "Validation Error",
            AgoraError::NotFound(_) => "Resource Not Found",
            AgoraError::Conflict(_) => "Conflict",
            AgoraError::Unauthorized(_) => "Unauthorized",
            AgoraError::Forbidden(_) => "Forbidden",
            AgoraError::Serialization(_) => "Serialization Error",
            AgoraError::PasswordHash(_) => "Password Hash Error",
            AgoraError::Token(_) => "Token Error",
            AgoraError::UnsupportedMedia(_) => "Unsupported Media Type",
            AgoraError::PayloadTooLarge(_) => "Payload Too Large",
            AgoraError::InvalidMultipart(_) => "Invalid Multipart Data",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            AgoraError::DatabaseConfig(msg)
            | AgoraError::DatabaseConnection(msg)
            | AgoraError::DatabaseOperation(msg)
            | AgoraError::FileOperation(msg)
            | AgoraError::Validation(msg)
            | AgoraError::NotFound(msg)
            | AgoraError::Conflict(msg)
            | AgoraError::Unauthorized(msg)
            | AgoraError::Forbidden(msg)
            | AgoraError::Serialization(msg)
            | AgoraError::PasswordHash(msg)
            | AgoraError::Token(msg)
            | AgoraError::UnsupportedMedia(msg)
            | AgoraError::PayloadTooLarge(msg)
            | AgoraError::InvalidMultipart(msg) => msg,
        }
    }

    /// HTTP 状态码映射
    pub fn http_status(&self) -> StatusCode {
        match self {
            AgoraError::Validation(_) | AgoraError::InvalidMultipart(_) => {
                StatusCode::BAD_REQUEST
            }
            AgoraError::Unauthorized(_) | AgoraError::Token(_) => StatusCode::UNAUTHORIZED,
            AgoraError::Forbidden(_) => StatusCode::FORBIDDEN,
            AgoraError::NotFound(_) => StatusCode::NOT_FOUND,
            AgoraError::Conflict(_) => StatusCode::CONFLICT,
            AgoraError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AgoraError::UnsupportedMedia(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 是否可以把 message 原样返回给客户端
    pub fn is_client_error(&self) -> bool {
        self.http_status().is_client_error()
    }

    /// 格式化为彩色输出（用于 Server 模式）
    #[cfg(feature = "server")]
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出（用于 CLI 模式）
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for AgoraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for AgoraError {}

// 便捷的构造函数
impl AgoraError {
    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        AgoraError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        AgoraError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        AgoraError::DatabaseOperation(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        AgoraError::FileOperation(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        AgoraError::Validation(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        AgoraError::NotFound(msg.into())
    }

    pub fn conflict<T: Into<String>>(msg: T) -> Self {
        AgoraError::Conflict(msg.into())
    }

    pub fn unauthorized<T: Into<String>>(msg: T) -> Self {
        AgoraError::Unauthorized(msg.into())
    }

    pub fn forbidden<T: Into<String>>(msg: T) -> Self {
        AgoraError::Forbidden(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        AgoraError::Serialization(msg.into())
    }

    pub fn password_hash<T: Into<String>>(msg: T) -> Self {
        AgoraError::PasswordHash(msg.into())
    }

    pub fn token<T: Into<String>>(msg: T) -> Self {
        AgoraError::Token(msg.into())
    }

    pub fn unsupported_media<T: Into<String>>(msg: T) -> Self {
        AgoraError::UnsupportedMedia(msg.into())
    }

    pub fn payload_too_large<T: Into<String>>(msg: T) -> Self {
        AgoraError::PayloadTooLarge(msg.into())
    }

    pub fn invalid_multipart<T: Into<String>>(msg: T) -> Self {
        AgoraError::InvalidMultipart(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for AgoraError {
    fn from(err: sea_orm::DbErr) -> Self {
        AgoraError::DatabaseOperation(err.to_string())
    }
}

impl From<std::io::Error> for AgoraError {
    fn from(err: std::io::Error) -> Self {
        AgoraError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for AgoraError {
    fn from(err: serde_json::Error) -> Self {
        AgoraError::Serialization(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AgoraError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AgoraError::Token(err.to_string())
    }
}

impl From<PasswordError> for AgoraError {
    fn from(err: PasswordError) -> Self {
        AgoraError::PasswordHash(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AgoraError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_unique() {
        let errors = [
            AgoraError::database_config("x"),
            AgoraError::database_connection("x"),
            AgoraError::database_operation("x"),
            AgoraError::file_operation("x"),
            AgoraError::validation("x"),
            AgoraError::not_found("x"),
            AgoraError::conflict("x"),
            AgoraError::unauthorized("x"),
            AgoraError::forbidden("x"),
            AgoraError::serialization("x"),
            AgoraError::password_hash("x"),
            AgoraError::token("x"),
            AgoraError::unsupported_media("x"),
            AgoraError::payload_too_large("x"),
            AgoraError::invalid_multipart("x"),
        ];
        let codes: std::collections::HashSet<_> = errors.iter().map(|e| e.code()).collect();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(
            AgoraError::validation("bad").http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AgoraError::unauthorized("no").http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AgoraError::forbidden("no").http_status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AgoraError::not_found("gone").http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AgoraError::conflict("dup").http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AgoraError::payload_too_large("big").http_status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            AgoraError::unsupported_media("pdf").http_status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            AgoraError::database_operation("boom").http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert!(!AgoraError::file_operation("disk").is_client_error());
    }

    #[test]
    fn test_format_simple() {
        let err = AgoraError::not_found("Post 7");
        assert_eq!(err.format_simple(), "Resource Not Found: Post 7");
        assert_eq!(err.to_string(), err.format_simple());
    }

    #[test]
    fn test_from_db_err() {
        let err: AgoraError = sea_orm::DbErr::Custom("oops".to_string()).into();
        assert_eq!(err.code(), "E003");
        assert!(err.message().contains("oops"));
    }
}
