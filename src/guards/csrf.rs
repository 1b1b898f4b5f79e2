//! CSRF 守卫

use super::{Guard, GuardContext, GuardCore, GuardState};
use crate::error::Result;
use crate::host::{EventKind, HostEvent, Phase};

const NAME: &str = "CsrfGuard";

/// 表单中携带 token 的字段名
pub const CSRF_FIELD: &str = "csrf_token";

/// 表单提交时校验 CSRF token
///
/// 以下两种提交会被取消并触发锁定：
///
/// - 表单带有 `csrf_token` 字段，但与为该表单签发的 token 不一致（或从未签发过）
/// - 已为该表单签发过 token，提交中却缺少该字段
///
/// 既没有签发记录也没有该字段的表单不做检查。
#[derive(Debug)]
pub struct CsrfGuard {
    core: GuardCore,
}

impl Default for CsrfGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl CsrfGuard {
    pub fn new() -> Self {
        Self {
            core: GuardCore::new(NAME),
        }
    }
}

impl Guard for CsrfGuard {
    fn name(&self) -> &'static str {
        NAME
    }

    fn initialize(&self, ctx: &GuardContext) -> Result<()> {
        self.core.initialize_with(ctx, |inst| {
            if !ctx.config().csrf_protection {
                return Ok(());
            }

            let ctx = ctx.clone();
            inst.listen(EventKind::Submit, Phase::Capture, move |event, control| {
                let HostEvent::Submit { form_id, fields } = event else {
                    return;
                };

                let failure = match fields.get(CSRF_FIELD) {
                    Some(token) if ctx.csrf().validate(form_id, token) => None,
                    Some(_) => Some("invalid CSRF token"),
                    None if ctx.csrf().expected(form_id).is_some() => Some("missing CSRF token"),
                    None => None,
                };

                if let Some(reason) = failure {
                    control.prevent_default();
                    control.stop_propagation();
                    ctx.violation(NAME, format!("{} for form {}", reason, form_id));
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
