//! 开发者工具检测守卫
//!
//! 三种独立的探测方式，任何一种命中都会触发锁定：
//!
//! - 窗口内外尺寸差超过阈值（面板停靠时外框比视口大）
//! - getter 陷阱被读取（面板打开时控制台会展开对象）
//! - 断点语句耗时超过阈值（面板打开时断点会暂停执行）

use super::{Guard, GuardContext, GuardCore, GuardState};
use crate::error::Result;
use crate::sanitize::devtools_open_by_dimensions;

const NAME: &str = "DevtoolsGuard";

#[derive(Debug)]
pub struct DevtoolsGuard {
    core: GuardCore,
}

impl Default for DevtoolsGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl DevtoolsGuard {
    pub fn new() -> Self {
        Self {
            core: GuardCore::new(NAME),
        }
    }
}

/// 执行一次探测，返回命中原因
fn detect(ctx: &GuardContext) -> Option<String> {
    let config = ctx.config();
    let env = ctx.env();

    if config.detect_devtools {
        let metrics = env.viewport().metrics();
        if devtools_open_by_dimensions(&metrics, config.devtools_threshold) {
            return Some(format!(
                "developer tools detected by window size (outer {}x{}, inner {}x{})",
                metrics.outer_width, metrics.outer_height, metrics.inner_width, metrics.inner_height
            ));
        }
    }

    if config.devtools_getter_trap && env.debugger().getter_trap_fired() {
        return Some("developer tools detected by getter trap".to_string());
    }

    if config.devtools_debugger_timing {
        let pause = env.debugger().breakpoint_pause();
        if pause > config.debugger_timing_threshold {
            return Some(format!(
                "developer tools detected by breakpoint pause of {}ms",
                pause.as_millis()
            ));
        }
    }

    None
}

impl Guard for DevtoolsGuard {
    fn name(&self) -> &'static str {
        NAME
    }

    fn initialize(&self, ctx: &GuardContext) -> Result<()> {
        self.core.initialize_with(ctx, |inst| {
            let config = ctx.config();
            if !(config.detect_devtools
                || config.devtools_getter_trap
                || config.devtools_debugger_timing)
            {
                return Ok(());
            }

            let poll_ctx = ctx.clone();
            inst.every(config.devtools_detection_interval, move || {
                if poll_ctx.lockdown().is_triggered() {
                    return;
                }
                if let Some(reason) = detect(&poll_ctx) {
                    poll_ctx.violation(NAME, reason);
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
