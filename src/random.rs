//! 安全随机数生成模块
//!
//! 提供密码学安全的随机数生成功能，用于生成 CSRF token、盐值和密钥。

use rand::{Rng, TryRngCore, distr::Alphanumeric, rngs::OsRng};

use crate::error::{CryptoError, Error, Result};

/// 生成指定长度的随机字节数组
///
/// 使用操作系统提供的密码学安全随机数生成器 (CSPRNG)
///
/// # Example
///
/// ```rust
/// use shieldrs::random::generate_random_bytes;
///
/// let bytes = generate_random_bytes(32).unwrap();
/// assert_eq!(bytes.len(), 32);
/// ```
pub fn generate_random_bytes(length: usize) -> Result<Vec<u8>> {
    let mut bytes = vec![0u8; length];
    fill_random(&mut bytes)?;
    Ok(bytes)
}

/// 用随机字节填充缓冲区
pub fn fill_random(buf: &mut [u8]) -> Result<()> {
    OsRng
        .try_fill_bytes(buf)
        .map_err(|e| Error::Crypto(CryptoError::RngFailed(format!("{:?}", e))))
}

/// 生成十六进制随机字符串（长度为字节数的两倍）
pub fn generate_random_hex(byte_length: usize) -> Result<String> {
    let bytes = generate_random_bytes(byte_length)?;
    Ok(hex_encode(&bytes))
}

/// 生成 Base64 URL 安全随机字符串（不含填充）
///
/// ```rust
/// use shieldrs::random::generate_random_base64_url;
///
/// let token = generate_random_base64_url(32).unwrap();
/// assert!(!token.contains('+'));
/// assert!(!token.contains('/'));
/// ```
pub fn generate_random_base64_url(byte_length: usize) -> Result<String> {
    use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
    let bytes = generate_random_bytes(byte_length)?;
    Ok(URL_SAFE_NO_PAD.encode(&bytes))
}

/// 生成只包含 a-z, A-Z, 0-9 的随机字符串
pub fn generate_random_alphanumeric(length: usize) -> Result<String> {
    let token: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(length)
        .map(char::from)
        .collect();
    Ok(token)
}

/// 生成通用安全 token（32 字节熵）
pub fn generate_secure_token() -> Result<String> {
    generate_random_base64_url(32)
}

/// 生成不透明的 CSRF token
pub fn generate_csrf_token() -> Result<String> {
    generate_random_base64_url(32)
}

/// 常量时间比较两个字节切片
///
/// ```rust
/// use shieldrs::random::constant_time_compare;
///
/// assert!(constant_time_compare(b"secret_token", b"secret_token"));
/// assert!(!constant_time_compare(b"secret_token", b"other_token!"));
/// ```
pub fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    use subtle::ConstantTimeEq;
    a.ct_eq(b).into()
}

/// 常量时间比较两个字符串
pub fn constant_time_compare_str(a: &str, b: &str) -> bool {
    constant_time_compare(a.as_bytes(), b.as_bytes())
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_random_bytes() {
        let a = generate_random_bytes(32).unwrap();
        let b = generate_random_bytes(32).unwrap();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }

    #[test]
    fn test_generate_random_hex() {
        let hex = generate_random_hex(16).unwrap();
        assert_eq!(hex.len(), 32);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generate_random_alphanumeric() {
        let token = generate_random_alphanumeric(24).unwrap();
        assert_eq!(token.len(), 24);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_csrf_tokens_are_unique() {
        let tokens: HashSet<String> = (0..50).map(|_| generate_csrf_token().unwrap()).collect();
        assert_eq!(tokens.len(), 50);
    }

    #[test]
    fn test_constant_time_compare_str() {
        assert!(constant_time_compare_str("abc", "abc"));
        assert!(!constant_time_compare_str("abc", "abd"));
        assert!(!constant_time_compare_str("abc", "abcd"));
    }

    #[test]
    fn test_hex_encode() {
        assert_eq!(hex_encode(&[0x00, 0xab, 0xff]), "00abff");
    }
}
