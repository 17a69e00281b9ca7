use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::config::MAX_TOKEN_TTL_DAYS;
use crate::storage::User;

/// Global cached JwtService instance
static JWT_SERVICE: OnceLock<JwtService> = OnceLock::new();

/// Get the cached JwtService instance
///
/// Initialized once from the static config on first use.
pub fn get_jwt_service() -> &'static JwtService {
    JWT_SERVICE.get_or_init(JwtService::from_config)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Token Claims（access / refresh 共用，靠 token_type 区分）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// 用户 id
    pub sub: String,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    pub token_type: TokenType,
}

impl TokenClaims {
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

/// JWT Service for generating and validating tokens
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_minutes: u64,
    refresh_token_days: u64,
}

impl JwtService {
    /// 有效期超过上限时按上限签发
    pub fn new(secret: &str, access_token_minutes: u64, refresh_token_days: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_token_minutes: access_token_minutes.min(MAX_TOKEN_TTL_DAYS * 24 * 60),
            refresh_token_days: refresh_token_days.min(MAX_TOKEN_TTL_DAYS),
        }
    }

    /// Create JwtService from config
    pub fn from_config() -> Self {
        let config = crate::config::get_config();

        // 获取 JWT secret，如果为空则生成一个安全的随机值
        let jwt_secret = Some(config.auth.jwt_secret.clone())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| {
                tracing::warn!(
                    "JWT secret not configured, generating a random one (tokens will not survive a restart)"
                );
                crate::utils::generate_secure_token()
            });

        Self::new(
            &jwt_secret,
            config.auth.access_token_minutes,
            config.auth.refresh_token_days,
        )
    }

    pub fn access_token_minutes(&self) -> u64 {
        self.access_token_minutes
    }

    pub fn refresh_token_days(&self) -> u64 {
        self.refresh_token_days
    }

    fn issue(
        &self,
        user: &User,
        token_type: TokenType,
        ttl: Duration,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let exp = now
            .checked_add_signed(ttl)
            .ok_or(jsonwebtoken::errors::ErrorKind::InvalidToken)?;
        let claims = TokenClaims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
            token_type,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
    }

    /// Generate Access Token (short-lived)
    pub fn generate_access_token(&self, user: &User) -> Result<String, jsonwebtoken::errors::Error> {
        self.issue(
            user,
            TokenType::Access,
            Duration::minutes(self.access_token_minutes as i64),
        )
    }

    /// Generate Refresh Token (long-lived)
    pub fn generate_refresh_token(
        &self,
        user: &User,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        self.issue(
            user,
            TokenType::Refresh,
            Duration::days(self.refresh_token_days as i64),
        )
    }

    fn validate(
        &self,
        token: &str,
        expected: TokenType,
    ) -> Result<TokenClaims, jsonwebtoken::errors::Error> {
        let token_data = decode::<TokenClaims>(token, &self.decoding_key, &Validation::default())?;

        if token_data.claims.token_type != expected || token_data.claims.user_id().is_none() {
            return Err(jsonwebtoken::errors::Error::from(
                jsonwebtoken::errors::ErrorKind::InvalidToken,
            ));
        }

        Ok(token_data.claims)
    }

    /// Validate Access Token
    pub fn validate_access_token(
        &self,
        token: &str,
    ) -> Result<TokenClaims, jsonwebtoken::errors::Error> {
        self.validate(token, TokenType::Access)
    }

    /// Validate Refresh Token
    pub fn validate_refresh_token(
        &self,
        token: &str,
    ) -> Result<TokenClaims, jsonwebtoken::errors::Error> {
        self.validate(token, TokenType::Refresh)
    }
}
