//! 密码策略守卫

use super::{Guard, GuardContext, GuardCore, GuardState};
use crate::error::Result;
use crate::host::{EventKind, HostEvent, Phase};
use crate::password::PasswordPolicy;

const NAME: &str = "PasswordPolicyGuard";

/// 密码字段输入检查
///
/// `Change` 总是检查；`Input` 默认在值达到最小长度后才检查，逐字输入的中间状态不算违规。
/// 开启 `password_check_partial_input` 后 `Input` 同样逐次检查。空值不检查。
#[derive(Debug)]
pub struct PasswordPolicyGuard {
    core: GuardCore,
}

impl Default for PasswordPolicyGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordPolicyGuard {
    pub fn new() -> Self {
        Self {
            core: GuardCore::new(NAME),
        }
    }
}

impl Guard for PasswordPolicyGuard {
    fn name(&self) -> &'static str {
        NAME
    }

    fn initialize(&self, ctx: &GuardContext) -> Result<()> {
        self.core.initialize_with(ctx, |inst| {
            if !ctx.config().enforce_password_policy {
                return Ok(());
            }

            let policy = PasswordPolicy::from_config(ctx.config());
            let check_partial = ctx.config().password_check_partial_input;
            for kind in [EventKind::Input, EventKind::Change] {
                let ctx = ctx.clone();
                let policy = policy.clone();
                inst.listen(kind, Phase::Capture, move |event, _| {
                    let Some(target) = event.target() else {
                        return;
                    };
                    if !target.is_password_field() || target.value.is_empty() {
                        return;
                    }
                    if !check_partial
                        && matches!(event, HostEvent::Input { .. })
                        && target.value.chars().count() < policy.min_length()
                    {
                        return;
                    }

                    let violations = policy.evaluate(&target.value);
                    if let Some(first) = violations.first() {
                        ctx.violation(NAME, first);
                    }
                });
            }
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
