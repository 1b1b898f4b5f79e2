//! CSRF (跨站请求伪造) 防护模块
//!
//! 每个表单在渲染时签发一个 token，提交时比较提交值与签发值。
//! 比较使用常量时间，同时校验 token 自身的 HMAC 签名和有效期。
//!
//! ## Token 格式
//!
//! Token 由三部分组成，使用 `.` 分隔：
//! - 随机数据（base64url 编码）
//! - 时间戳（base64url 编码）
//! - HMAC 签名（base64url 编码）
//!
//! ## 基本用法
//!
//! ```rust
//! use shieldrs::security::csrf::{CsrfConfig, CsrfProtection};
//!
//! let csrf = CsrfProtection::new(CsrfConfig::random().unwrap());
//!
//! let token = csrf.issue("login-form").unwrap();
//! assert!(csrf.validate("login-form", &token));
//! assert!(!csrf.validate("login-form", "forged"));
//! ```

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use subtle::ConstantTimeEq;

use crate::clock::{SharedClock, SystemClock};
use crate::config::ShieldConfig;
use crate::error::{CryptoError, Error, Result};
use crate::random::{constant_time_compare_str, generate_random_bytes};

type HmacSha256 = Hmac<Sha256>;

/// CSRF 配置
#[derive(Clone)]
pub struct CsrfConfig {
    /// 用于签名的密钥
    secret: Vec<u8>,
    /// Token 随机部分长度（字节）
    token_length: usize,
    /// Token 有效期
    ttl: Duration,
}

impl fmt::Debug for CsrfConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsrfConfig")
            .field("secret", &"<redacted>")
            .field("token_length", &self.token_length)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl CsrfConfig {
    /// 使用随机生成的 32 字节密钥
    pub fn random() -> Result<Self> {
        Ok(Self::from_secret(&generate_random_bytes(32)?))
    }

    /// 使用指定密钥（建议至少 32 字节）
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            secret: secret.to_vec(),
            token_length: 32,
            ttl: Duration::from_secs(3600),
        }
    }

    /// 从全局配置读取有效期，密钥随机生成
    pub fn from_config(config: &ShieldConfig) -> Result<Self> {
        Ok(Self::random()?.with_ttl(config.csrf_token_ttl))
    }

    /// 设置签名密钥
    pub fn with_secret(mut self, secret: &[u8]) -> Self {
        self.secret = secret.to_vec();
        self
    }

    /// 设置 token 长度
    pub fn with_token_length(mut self, length: usize) -> Self {
        self.token_length = length;
        self
    }

    /// 设置 token 有效期
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

/// CSRF Token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfToken {
    /// 完整的 token 字符串（包含签名）
    pub token: String,
    /// 创建时间（Unix 秒）
    pub created_at: i64,
    /// 过期时间（Unix 秒）
    pub expires_at: i64,
}

/// CSRF 防护器
///
/// 保存每个表单最近一次签发的 token。
pub struct CsrfProtection {
    config: CsrfConfig,
    issued: Arc<RwLock<HashMap<String, String>>>,
    clock: SharedClock,
}

impl fmt::Debug for CsrfProtection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsrfProtection")
            .field("config", &self.config)
            .field("forms", &self.read().len())
            .finish()
    }
}

impl CsrfProtection {
    /// 创建新的 CSRF 防护器
    pub fn new(config: CsrfConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// 指定时钟创建
    pub fn with_clock(config: CsrfConfig, clock: SharedClock) -> Self {
        Self {
            config,
            issued: Arc::new(RwLock::new(HashMap::new())),
            clock,
        }
    }

    /// 生成新的签名 token（不绑定表单）
    pub fn generate_token(&self) -> Result<CsrfToken> {
        let random_data = generate_random_bytes(self.config.token_length)?;
        let now = self.clock.now().timestamp();
        let expires_at = now.saturating_add(self.ttl_secs());

        let random_b64 = URL_SAFE_NO_PAD.encode(&random_data);
        let timestamp_b64 = URL_SAFE_NO_PAD.encode(now.to_be_bytes());
        let signature_b64 = URL_SAFE_NO_PAD.encode(self.sign(&random_data, now)?);

        Ok(CsrfToken {
            token: format!("{}.{}.{}", random_b64, timestamp_b64, signature_b64),
            created_at: now,
            expires_at,
        })
    }

    /// 校验 token 的签名和有效期
    pub fn verify(&self, token: &str) -> Result<bool> {
        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 3 {
            return Ok(false);
        }

        let (Ok(random_data), Ok(timestamp_bytes), Ok(provided_signature)) = (
            URL_SAFE_NO_PAD.decode(parts[0]),
            URL_SAFE_NO_PAD.decode(parts[1]),
            URL_SAFE_NO_PAD.decode(parts[2]),
        ) else {
            return Ok(false);
        };

        let Ok(timestamp_arr) = <[u8; 8]>::try_from(timestamp_bytes.as_slice()) else {
            return Ok(false);
        };
        let timestamp = i64::from_be_bytes(timestamp_arr);

        let now = self.clock.now().timestamp();
        if now > timestamp.saturating_add(self.ttl_secs()) {
            return Ok(false);
        }

        let expected_signature = self.sign(&random_data, timestamp)?;
        Ok(provided_signature.ct_eq(&expected_signature).into())
    }

    /// 为表单签发 token，覆盖之前签发的值
    pub fn issue(&self, form_id: &str) -> Result<String> {
        let token = self.generate_token()?.token;
        self.issued
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(form_id.to_string(), token.clone());
        Ok(token)
    }

    /// 表单当前期望的 token
    pub fn expected(&self, form_id: &str) -> Option<String> {
        self.read().get(form_id).cloned()
    }

    /// 校验表单提交的 token
    ///
    /// 需要与签发值完全一致，且签名有效、未过期。
    pub fn validate(&self, form_id: &str, submitted: &str) -> bool {
        let Some(expected) = self.expected(form_id) else {
            return false;
        };
        validate_csrf_token(submitted, &expected) && self.verify(submitted).unwrap_or(false)
    }

    fn ttl_secs(&self) -> i64 {
        i64::try_from(self.config.ttl.as_secs()).unwrap_or(i64::MAX)
    }

    /// 撤销表单的 token
    pub fn revoke(&self, form_id: &str) {
        self.issued
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(form_id);
    }

    fn sign(&self, data: &[u8], timestamp: i64) -> Result<Vec<u8>> {
        let mut mac = HmacSha256::new_from_slice(&self.config.secret).map_err(|e| {
            Error::Crypto(CryptoError::InvalidKey(format!(
                "HMAC initialization failed: {}",
                e
            )))
        })?;

        mac.update(data);
        mac.update(&timestamp.to_be_bytes());

        Ok(mac.finalize().into_bytes().to_vec())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, String>> {
        self.issued.read().unwrap_or_else(|e| e.into_inner())
    }
}

/// 比较提交的 token 与期望值（常量时间，空值视为无效）
///
/// ```rust
/// use shieldrs::security::csrf::validate_csrf_token;
///
/// assert!(validate_csrf_token("abc123", "abc123"));
/// assert!(!validate_csrf_token("abc124", "abc123"));
/// assert!(!validate_csrf_token("", ""));
/// ```
pub fn validate_csrf_token(token: &str, expected: &str) -> bool {
    !expected.is_empty() && constant_time_compare_str(token, expected)
}
