//! 统一错误类型模块
//!
//! 提供 shieldrs 中所有操作的错误类型定义。

use std::fmt;
use std::time::Duration;

use crate::host::Capability;

/// shieldrs 的统一结果类型
pub type Result<T> = std::result::Result<T, Error>;

/// shieldrs 的错误类型
#[derive(Debug)]
pub enum Error {
    /// 密码哈希错误
    PasswordHash(PasswordHashError),

    /// 验证错误
    Validation(ValidationError),

    /// 配置错误
    Config(ConfigError),

    /// 加密错误
    Crypto(CryptoError),

    /// 能力拦截安装失败
    Intercept(InterceptError),

    /// 网关调用被拒绝
    Gateway(GatewayError),

    /// 速率限制超出
    RateLimitExceeded {
        /// 重试等待时间
        retry_after: Duration,
    },

    /// 内部错误
    Internal(String),

    /// 其他错误
    Other(String),
}

impl Error {
    /// 创建一个内部错误
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    /// 创建一个验证错误
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(ValidationError::Custom(msg.into()))
    }

    /// 创建一个配置值错误
    pub fn invalid_config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config(ConfigError::InvalidValue {
            key: key.into(),
            message: message.into(),
        })
    }

    /// 创建一个速率限制错误
    pub fn rate_limited(retry_after: Duration) -> Self {
        Error::RateLimitExceeded { retry_after }
    }
}

/// 密码哈希相关错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordHashError {
    /// 哈希生成失败
    HashFailed(String),
    /// 无效的哈希格式
    InvalidFormat(String),
}

/// 验证相关错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// 密码太短
    PasswordTooShort { min_length: usize, actual: usize },
    /// 密码强度不足
    PasswordTooWeak(String),
    /// 无效的邮箱格式
    InvalidEmail(String),
    /// 无效的 URL
    InvalidUrl(String),
    /// 字段为空
    EmptyField(String),
    /// 自定义验证错误
    Custom(String),
}

/// 配置相关错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// 配置解析失败
    Parse(String),
    /// 无效的配置值
    InvalidValue { key: String, message: String },
}

/// 加密相关错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// 随机数生成失败
    RngFailed(String),
    /// 密钥无效
    InvalidKey(String),
}

/// 拦截安装错误
///
/// 宿主环境不允许替换某个能力时返回，守卫模块会记录并跳过。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterceptError {
    /// 宿主冻结了该能力，不允许重新定义
    Frozen(Capability),
    /// 该能力已被永久替换
    Sealed(Capability),
}

/// 网关调用错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// 调用被守卫拦截
    Blocked(Capability),
    /// 调用被速率限制拒绝
    RateLimited { retry_after: Duration },
    /// 宿主不可用或调用失败
    Unavailable(String),
}

// ============================================================================
// Display 实现
// ============================================================================

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::PasswordHash(e) => write!(f, "Password hash error: {}", e),
            Error::Validation(e) => write!(f, "Validation error: {}", e),
            Error::Config(e) => write!(f, "Config error: {}", e),
            Error::Crypto(e) => write!(f, "Crypto error: {}", e),
            Error::Intercept(e) => write!(f, "Intercept error: {}", e),
            Error::Gateway(e) => write!(f, "Gateway error: {}", e),
            Error::RateLimitExceeded { retry_after } => {
                write!(f, "Rate limit exceeded, retry after {:?}", retry_after)
            }
            Error::Internal(msg) => write!(f, "Internal error: {}", msg),
            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl fmt::Display for PasswordHashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PasswordHashError::HashFailed(msg) => write!(f, "hash generation failed: {}", msg),
            PasswordHashError::InvalidFormat(msg) => write!(f, "invalid hash format: {}", msg),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::PasswordTooShort { min_length, actual } => {
                write!(
                    f,
                    "password too short: minimum {} characters, got {}",
                    min_length, actual
                )
            }
            ValidationError::PasswordTooWeak(msg) => write!(f, "password too weak: {}", msg),
            ValidationError::InvalidEmail(email) => write!(f, "invalid email format: {}", email),
            ValidationError::InvalidUrl(url) => write!(f, "invalid url: {}", url),
            ValidationError::EmptyField(field) => write!(f, "field '{}' cannot be empty", field),
            ValidationError::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Parse(msg) => write!(f, "failed to parse configuration: {}", msg),
            ConfigError::InvalidValue { key, message } => {
                write!(f, "invalid configuration value for '{}': {}", key, message)
            }
        }
    }
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::RngFailed(msg) => write!(f, "random number generation failed: {}", msg),
            CryptoError::InvalidKey(msg) => write!(f, "invalid key: {}", msg),
        }
    }
}

impl fmt::Display for InterceptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterceptError::Frozen(cap) => write!(f, "{} cannot be redefined by the host", cap),
            InterceptError::Sealed(cap) => write!(f, "{} is already permanently redefined", cap),
        }
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Blocked(cap) => write!(f, "{} access blocked", cap),
            GatewayError::RateLimited { retry_after } => {
                write!(f, "request rate limited, retry after {:?}", retry_after)
            }
            GatewayError::Unavailable(msg) => write!(f, "gateway unavailable: {}", msg),
        }
    }
}

// ============================================================================
// std::error::Error 实现
// ============================================================================

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Intercept(e) => Some(e),
            Error::Gateway(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for PasswordHashError {}
impl std::error::Error for ValidationError {}
impl std::error::Error for ConfigError {}
impl std::error::Error for CryptoError {}
impl std::error::Error for InterceptError {}
impl std::error::Error for GatewayError {}

// ============================================================================
// From 实现
// ============================================================================

impl From<PasswordHashError> for Error {
    fn from(err: PasswordHashError) -> Self {
        Error::PasswordHash(err)
    }
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Error::Validation(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl From<CryptoError> for Error {
    fn from(err: CryptoError) -> Self {
        Error::Crypto(err)
    }
}

impl From<InterceptError> for Error {
    fn from(err: InterceptError) -> Self {
        Error::Intercept(err)
    }
}

impl From<GatewayError> for Error {
    fn from(err: GatewayError) -> Self {
        Error::Gateway(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(ConfigError::Parse(err.to_string()))
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::PasswordTooShort {
            min_length: 8,
            actual: 4,
        };
        assert_eq!(
            err.to_string(),
            "password too short: minimum 8 characters, got 4"
        );
    }

    #[test]
    fn test_intercept_error_display() {
        let err = InterceptError::Frozen(Capability::LocalStorage);
        assert_eq!(
            err.to_string(),
            "localStorage cannot be redefined by the host"
        );
    }

    #[test]
    fn test_gateway_error_into_error() {
        let err: Error = GatewayError::Blocked(Capability::Fetch).into();
        assert!(matches!(err, Error::Gateway(GatewayError::Blocked(_))));
        assert_eq!(err.to_string(), "Gateway error: fetch access blocked");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_json_error_becomes_config_error() {
        let parse: std::result::Result<u32, serde_json::Error> = serde_json::from_str("nope");
        let err: Error = parse.unwrap_err().into();
        assert!(matches!(err, Error::Config(ConfigError::Parse(_))));
    }
}
