//! 密码哈希实现（Argon2id）

use argon2::Argon2;
use password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString};

use crate::error::{Error, PasswordHashError, Result};

/// 生成密码哈希
///
/// 使用随机 16 字节盐值，输出 PHC 格式字符串。
///
/// # Example
///
/// ```rust
/// use shieldrs::password::hash_password;
///
/// let hash = hash_password("my_secure_password").unwrap();
/// assert!(hash.starts_with("$argon2id"));
/// ```
pub fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::fill(&mut salt_bytes).map_err(|e| {
        Error::PasswordHash(PasswordHashError::HashFailed(format!(
            "Failed to generate random salt: {}",
            e
        )))
    })?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| {
        Error::PasswordHash(PasswordHashError::HashFailed(format!(
            "Failed to encode salt: {}",
            e
        )))
    })?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| {
            Error::PasswordHash(PasswordHashError::HashFailed(format!(
                "Argon2 hash failed: {}",
                e
            )))
        })
}

/// 验证密码是否匹配哈希
///
/// 密码正确返回 `Ok(true)`，错误返回 `Ok(false)`，哈希格式无效时返回错误。
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| {
        Error::PasswordHash(PasswordHashError::InvalidFormat(format!(
            "invalid Argon2 hash: {}",
            e
        )))
    })?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// 哈希是否需要重新生成（非 Argon2id 格式）
pub fn needs_rehash(hash: &str) -> bool {
    !hash.starts_with("$argon2id")
}
