//! 暴力破解守卫
//!
//! 登录表单提交时按规范化的身份计数。窗口内已有 `max_login_attempts` 次尝试后，
//! 下一次提交以及锁定期内的所有提交都会被取消并触发锁定。

use super::{Guard, GuardContext, GuardCore, GuardState};
use crate::error::Result;
use crate::host::{EventKind, HostEvent, Phase};
use crate::sanitize::normalize_email;
use crate::security::LoginCheckResult;

const NAME: &str = "BruteForceGuard";

/// 作为身份的表单字段，按顺序取第一个非空值
pub const IDENTITY_FIELDS: &[&str] = &["email", "username", "identifier"];

#[derive(Debug)]
pub struct BruteForceGuard {
    core: GuardCore,
}

impl Default for BruteForceGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl BruteForceGuard {
    pub fn new() -> Self {
        Self {
            core: GuardCore::new(NAME),
        }
    }
}

fn identity(event: &HostEvent) -> Option<String> {
    let HostEvent::Submit { fields, .. } = event else {
        return None;
    };
    IDENTITY_FIELDS
        .iter()
        .filter_map(|name| fields.get(*name))
        .map(|value| normalize_email(value))
        .find(|value| !value.is_empty())
}

impl Guard for BruteForceGuard {
    fn name(&self) -> &'static str {
        NAME
    }

    fn initialize(&self, ctx: &GuardContext) -> Result<()> {
        self.core.initialize_with(ctx, |inst| {
            if !ctx.config().brute_force_protection {
                return Ok(());
            }

            let ctx = ctx.clone();
            inst.listen(EventKind::Submit, Phase::Capture, move |event, control| {
                let Some(identity) = identity(event) else {
                    return;
                };

                match ctx.login_tracker().check_and_record(&identity) {
                    LoginCheckResult::Allowed { attempts_remaining } => {
                        ctx.logger().info(format!(
                            "{}: login attempt for {} ({} remaining)",
                            NAME, identity, attempts_remaining
                        ));
                    }
                    LoginCheckResult::Locked { remaining, .. } => {
                        control.prevent_default();
                        control.stop_propagation();
                        ctx.violation(
                            NAME,
                            format!(
                                "{} is locked for another {}s",
                                identity,
                                remaining.as_secs()
                            ),
                        );
                    }
                    LoginCheckResult::LockedOut { until } => {
                        control.prevent_default();
                        control.stop_propagation();
                        ctx.violation(
                            NAME,
                            format!(
                                "too many login attempts for {}, locked until {}",
                                identity,
                                until.to_rfc3339()
                            ),
                        );
                    }
                }
            });
            Ok(())
        })
    }

    fn destroy(&self) {
        self.core.destroy();
    }

    fn state(&self) -> GuardState {
        self.core.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShieldConfig;
    use crate::guards::test_support::context;
    use std::time::Duration;

    fn login(email: &str) -> HostEvent {
        HostEvent::submit("login", [("email", email), ("password", "hunter2")])
    }

    #[test]
    fn test_sixth_attempt_locks() {
        let (host, ctx) = context(ShieldConfig::default());
        BruteForceGuard::new().initialize(&ctx).unwrap();

        for _ in 0..5 {
            let outcome = host.env().dispatch(&login("a@b.com"));
            assert!(!outcome.default_prevented);
        }
        assert!(!ctx.lockdown().is_triggered());

        let outcome = host.env().dispatch(&login("A@B.com "));
        assert!(outcome.default_prevented);
        assert!(ctx.lockdown().is_triggered());
        assert!(ctx.login_tracker().is_locked("a@b.com"));
    }

    #[test]
    fn test_locked_identity_stays_blocked_until_expiry() {
        let config = ShieldConfig::default().with_lockout_duration(Duration::from_secs(60));
        let (host, ctx) = context(config);
        BruteForceGuard::new().initialize(&ctx).unwrap();

        for _ in 0..6 {
            host.env().dispatch(&login("a@b.com"));
        }

        host.advance(Duration::from_secs(60));
        assert!(host.env().dispatch(&login("a@b.com")).default_prevented);

        host.advance(Duration::from_secs(1));
        assert!(!host.env().dispatch(&login("a@b.com")).default_prevented);
    }

    #[test]
    fn test_identity_field_fallback() {
        let event = HostEvent::submit("login", [("username", " Alice "), ("email", "")]);
        assert_eq!(identity(&event).as_deref(), Some("alice"));

        let event = HostEvent::submit("search", [("q", "rust")]);
        assert_eq!(identity(&event), None);
    }

    #[test]
    fn test_forms_without_identity_are_ignored() {
        let (host, ctx) = context(ShieldConfig::default());
        BruteForceGuard::new().initialize(&ctx).unwrap();

        for _ in 0..10 {
            let outcome = host.env().dispatch(&HostEvent::submit("search", [("q", "x")]));
            assert!(!outcome.default_prevented);
        }
        assert_eq!(ctx.login_tracker().stats().tracked_identities, 0);
    }
}
