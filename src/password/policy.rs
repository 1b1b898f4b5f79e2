//! 密码策略
//!
//! 密码字段输入时执行的规则检查。任一规则不满足即视为违规。

use std::fmt;

use crate::config::ShieldConfig;
use crate::error::{Result, ValidationError};

/// 常见密码列表
const COMMON_PASSWORDS: &[&str] = &[
    "password",
    "123456",
    "12345678",
    "qwerty",
    "abc123",
    "password1",
    "password123",
    "admin",
    "letmein",
    "welcome",
    "monkey",
    "dragon",
    "master",
    "login",
    "princess",
    "starwars",
    "hello",
    "freedom",
    "whatever",
    "trustno1",
    "iloveyou",
    "sunshine",
    "shadow",
    "superman",
    "michael",
    "football",
    "baseball",
    "soccer",
    "hockey",
    "batman",
];

/// 键盘行
const KEYBOARD_ROWS: &[&str] = &["qwertyuiop", "asdfghjkl", "zxcvbnm", "1234567890"];

/// 策略违规类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyViolation {
    /// 长度不足
    TooShort { min_length: usize, actual: usize },
    /// 命中常见密码
    CommonPassword,
    /// 同一字符连续出现三次及以上
    RepeatedCharacters,
    /// 两字符序列紧接着重复（如 abab）
    RepeatedSequence,
    /// 包含键盘行上连续三个字符
    KeyboardPattern,
}

impl fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyViolation::TooShort { min_length, actual } => write!(
                f,
                "password shorter than {} characters ({})",
                min_length, actual
            ),
            PolicyViolation::CommonPassword => write!(f, "password is too common"),
            PolicyViolation::RepeatedCharacters => write!(f, "password repeats a character"),
            PolicyViolation::RepeatedSequence => write!(f, "password repeats a sequence"),
            PolicyViolation::KeyboardPattern => write!(f, "password follows a keyboard row"),
        }
    }
}

/// 密码策略
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordPolicy {
    min_length: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self::new(8)
    }
}

impl PasswordPolicy {
    pub fn new(min_length: usize) -> Self {
        Self { min_length }
    }

    /// 从配置创建
    pub fn from_config(config: &ShieldConfig) -> Self {
        Self::new(config.password_min_length)
    }

    pub fn min_length(&self) -> usize {
        self.min_length
    }

    /// 检查密码，返回全部违规项（空表示通过）
    pub fn evaluate(&self, password: &str) -> Vec<PolicyViolation> {
        let chars: Vec<char> = password.chars().collect();
        let lower = password.to_lowercase();
        let mut violations = Vec::new();

        if chars.len() < self.min_length {
            violations.push(PolicyViolation::TooShort {
                min_length: self.min_length,
                actual: chars.len(),
            });
        }

        if COMMON_PASSWORDS.contains(&lower.as_str()) {
            violations.push(PolicyViolation::CommonPassword);
        }

        if chars.windows(3).any(|w| w[0] == w[1] && w[1] == w[2]) {
            violations.push(PolicyViolation::RepeatedCharacters);
        }

        if chars.windows(4).any(|w| w[0..2] == w[2..4]) {
            violations.push(PolicyViolation::RepeatedSequence);
        }

        if has_keyboard_pattern(&lower) {
            violations.push(PolicyViolation::KeyboardPattern);
        }

        violations
    }

    /// 是否通过全部规则
    pub fn is_acceptable(&self, password: &str) -> bool {
        self.evaluate(password).is_empty()
    }

    /// 校验密码，返回第一条违规对应的错误
    pub fn validate(&self, password: &str) -> Result<()> {
        match self.evaluate(password).into_iter().next() {
            None => Ok(()),
            Some(PolicyViolation::TooShort { min_length, actual }) => {
                Err(ValidationError::PasswordTooShort { min_length, actual }.into())
            }
            Some(other) => Err(ValidationError::PasswordTooWeak(other.to_string()).into()),
        }
    }
}

fn has_keyboard_pattern(lower: &str) -> bool {
    let chars: Vec<char> = lower.chars().collect();
    chars.windows(3).any(|w| {
        let window: String = w.iter().collect();
        KEYBOARD_ROWS.iter().any(|row| row.contains(&window))
    })
}
