pub mod password;

use rand::RngExt;

/// 生成 URL 安全的随机令牌（32 bytes = 256 bits，Base64 编码）
///
/// 用于 JWT secret 兜底和 CSRF token
pub fn generate_secure_token() -> String {
    use base64::Engine;

    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// 截断到指定字符数（按 char 计，不会切断 UTF-8）
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
