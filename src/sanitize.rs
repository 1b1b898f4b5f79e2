//! 输入清理与辅助判断
//!
//! 邮箱与 URL 的规范化、清理，以及开发者工具窗口尺寸判断。

use url::Url;

use crate::error::{Result, ValidationError};
use crate::host::WindowMetrics;

/// URL 允许的协议
pub const ALLOWED_URL_SCHEMES: &[&str] = &["http", "https", "mailto"];

/// 规范化邮箱（去除首尾空白并转为小写）
///
/// 登录尝试计数以规范化后的身份为键。
///
/// ```rust
/// use shieldrs::sanitize::normalize_email;
///
/// assert_eq!(normalize_email("  A@B.Com "), "a@b.com");
/// ```
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// 清理并校验邮箱
///
/// 去除邮箱中不允许出现的字符，然后检查 `@` 与域名格式。
pub fn sanitize_email(email: &str) -> Result<String> {
    let cleaned: String = normalize_email(email)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || "@._+-".contains(*c))
        .collect();

    let mut parts = cleaned.splitn(2, '@');
    let local = parts.next().unwrap_or_default();
    let domain = parts.next().unwrap_or_default();

    let valid = !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.');

    if !valid {
        return Err(ValidationError::InvalidEmail(email.to_string()).into());
    }

    Ok(cleaned)
}

/// 清理 URL，只允许 http / https / mailto
pub fn sanitize_url(input: &str) -> Result<String> {
    let parsed = Url::parse(input.trim())
        .map_err(|e| ValidationError::InvalidUrl(format!("{}: {}", input, e)))?;

    if !ALLOWED_URL_SCHEMES.contains(&parsed.scheme()) {
        return Err(ValidationError::InvalidUrl(format!(
            "scheme '{}' is not allowed",
            parsed.scheme()
        ))
        .into());
    }

    Ok(parsed.to_string())
}

/// 根据窗口内外尺寸差判断开发者工具是否打开
///
/// 任一方向的差值严格大于阈值时返回 true。
///
/// ```rust
/// use shieldrs::host::WindowMetrics;
/// use shieldrs::sanitize::devtools_open_by_dimensions;
///
/// let mut metrics = WindowMetrics::uniform(1280, 800);
/// metrics.outer_height = 960;
/// assert!(!devtools_open_by_dimensions(&metrics, 160));
/// metrics.outer_height = 961;
/// assert!(devtools_open_by_dimensions(&metrics, 160));
/// ```
pub fn devtools_open_by_dimensions(metrics: &WindowMetrics, threshold: u32) -> bool {
    let width_gap = metrics.outer_width.saturating_sub(metrics.inner_width);
    let height_gap = metrics.outer_height.saturating_sub(metrics.inner_height);
    width_gap > threshold || height_gap > threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_sanitize_email() {
        assert_eq!(sanitize_email(" User@Example.com ").unwrap(), "user@example.com");
        assert_eq!(
            sanitize_email("us<er>@example.com").unwrap(),
            "user@example.com"
        );
        assert!(matches!(
            sanitize_email("no-at-sign"),
            Err(Error::Validation(ValidationError::InvalidEmail(_)))
        ));
        assert!(sanitize_email("user@localhost").is_err());
        assert!(sanitize_email("@example.com").is_err());
    }

    #[test]
    fn test_sanitize_url() {
        assert_eq!(
            sanitize_url("https://example.com/a?b=1").unwrap(),
            "https://example.com/a?b=1"
        );
        assert!(sanitize_url("mailto:a@b.com").is_ok());
        assert!(sanitize_url("javascript:alert(1)").is_err());
        assert!(sanitize_url("not a url").is_err());
    }

    #[test]
    fn test_devtools_threshold_is_strict() {
        let mut metrics = WindowMetrics::uniform(1000, 700);
        assert!(!devtools_open_by_dimensions(&metrics, 160));

        metrics.outer_width = 1160;
        assert!(!devtools_open_by_dimensions(&metrics, 160));

        metrics.outer_width = 1161;
        assert!(devtools_open_by_dimensions(&metrics, 160));
    }

    #[test]
    fn test_devtools_inner_larger_than_outer() {
        let metrics = WindowMetrics {
            outer_width: 800,
            outer_height: 600,
            inner_width: 1200,
            inner_height: 900,
        };
        assert!(!devtools_open_by_dimensions(&metrics, 160));
    }
}
