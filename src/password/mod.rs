//! 密码模块
//!
//! - 哈希：Argon2id 哈希与验证
//! - 策略：表单密码字段的实时校验规则（长度、常见密码、重复字符、键盘序列）
//!
//! ## 示例
//!
//! ```rust
//! use shieldrs::password::{PasswordPolicy, PolicyViolation};
//!
//! let policy = PasswordPolicy::new(8);
//! assert!(policy.evaluate("password").contains(&PolicyViolation::CommonPassword));
//! assert!(policy.validate("Tg7#mQ2!xLp9").is_ok());
//! ```

mod hasher;
pub mod policy;

pub use hasher::{hash_password, needs_rehash, verify_password};
pub use policy::{PasswordPolicy, PolicyViolation};
