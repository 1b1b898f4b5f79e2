//! 文件访问守卫

use std::sync::Arc;

use super::{Guard, GuardContext, GuardCore, GuardState, Tripwire};
use crate::error::Result;
use crate::host::{Capability, EventKind, FileGateway, HostEvent, InterceptMode, Phase};

const NAME: &str = "FileAccessGuard";

/// 永久替换文件读取入口；文件输入框选择文件视为违规
#[derive(Debug)]
pub struct FileAccessGuard {
    core: GuardCore,
}

impl Default for FileAccessGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl FileAccessGuard {
    pub fn new() -> Self {
        Self {
            core: GuardCore::new(NAME),
        }
    }
}

impl Guard for FileAccessGuard {
    fn name(&self) -> &'static str {
        NAME
    }

    fn initialize(&self, ctx: &GuardContext) -> Result<()> {
        self.core.initialize_with(ctx, |inst| {
            if !ctx.config().block_file_access {
                return Ok(());
            }

            let wire: Arc<dyn FileGateway> = Tripwire::new(NAME, Capability::FileAccess, ctx);
            inst.intercept(ctx.env().file_access(), wire, InterceptMode::Permanent);

            let ctx = ctx.clone();
            inst.listen(EventKind::FileSelected, Phase::Capture, move |event, control| {
                let HostEvent::FileSelected { target, file_name } = event else {
                    return;
                };
                if !target.is_file_input() {
                    return;
                }
                control.prevent_default();
                control.stop_propagation();
                ctx.violation(NAME, format!("file selected: {}", file_name));
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
    use crate::host::Element;

    #[test]
    fn test_read_is_blocked() {
        let (host, ctx) = context(ShieldConfig::default());
        host.files.insert("notes.txt", b"secret");
        FileAccessGuard::new().initialize(&ctx).unwrap();

        assert!(host.env().file_access().get().read("notes.txt").is_err());
        assert!(ctx.lockdown().is_triggered());
    }

    #[test]
    fn test_file_selection_triggers_lockdown() {
        let (host, ctx) = context(ShieldConfig::default());
        FileAccessGuard::new().initialize(&ctx).unwrap();

        let outcome = host.env().dispatch(&HostEvent::FileSelected {
            target: Element::input("file").with_id("upload"),
            file_name: "dump.sql".to_string(),
        });
        assert!(outcome.default_prevented);
        assert_eq!(
            ctx.lockdown().reason(),
            Some("FileAccessGuard: file selected: dump.sql")
        );
    }

    #[test]
    fn test_destroy_is_partial() {
        let (host, ctx) = context(ShieldConfig::default());
        let guard = FileAccessGuard::new();
        guard.initialize(&ctx).unwrap();
        guard.destroy();

        assert_eq!(guard.state(), GuardState::Destroyed { partial: true });
        assert_eq!(host.env().events().listener_count(EventKind::FileSelected), 0);
    }
}
