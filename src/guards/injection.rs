//! SQL 注入检测守卫

use regex::RegexSet;

use super::{Guard, GuardContext, GuardCore, GuardState};
use crate::error::{Error, Result};
use crate::host::{EventKind, Phase};

const NAME: &str = "InjectionGuard";

/// SQL 关键字与操作符模式
const INJECTION_PATTERNS: &[&str] = &[
    r"(?i)\b(union\s+(all\s+)?select)\b",
    r"(?i)\b(select\s+.+\s+from)\b",
    r"(?i)\b(insert\s+into|delete\s+from|drop\s+(table|database)|truncate\s+table)\b",
    r"(?i)\b(update\s+\w+\s+set)\b",
    r"(?i)\b(exec(ute)?\s*\(|xp_cmdshell)",
    r"(?i)'\s*(or|and)\s+('?\d+'?\s*=\s*'?\d+|'[^']*'\s*=\s*'[^']*)",
    r"(?i)\b(or|and)\s+\d+\s*=\s*\d+",
    r"'\s*(--|#|/\*)",
    r"(?i);\s*(drop|delete|insert|update|select|shutdown|exec|waitfor)\b",
    r"(?i)\b(sleep|benchmark|waitfor\s+delay)\s*\(",
];

/// 注入模式匹配器
#[derive(Debug, Clone)]
pub struct InjectionDetector {
    patterns: RegexSet,
}

impl InjectionDetector {
    pub fn new() -> Result<Self> {
        let patterns = RegexSet::new(INJECTION_PATTERNS)
            .map_err(|e| Error::internal(format!("invalid injection pattern: {}", e)))?;
        Ok(Self { patterns })
    }

    /// 是否命中任一模式
    pub fn is_suspicious(&self, value: &str) -> bool {
        self.patterns.is_match(value)
    }

    /// 命中的模式数量
    pub fn match_count(&self, value: &str) -> usize {
        self.patterns.matches(value).iter().count()
    }
}

/// 在任意字段的 `Input` / `Change` 上检测注入
#[derive(Debug)]
pub struct InjectionGuard {
    core: GuardCore,
}

impl Default for InjectionGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl InjectionGuard {
    pub fn new() -> Self {
        Self {
            core: GuardCore::new(NAME),
        }
    }
}

impl Guard for InjectionGuard {
    fn name(&self) -> &'static str {
        NAME
    }

    fn initialize(&self, ctx: &GuardContext) -> Result<()> {
        self.core.initialize_with(ctx, |inst| {
            if !ctx.config().detect_injection {
                return Ok(());
            }

            let detector = InjectionDetector::new()?;
            for kind in [EventKind::Input, EventKind::Change] {
                let ctx = ctx.clone();
                let detector = detector.clone();
                inst.listen(kind, Phase::Capture, move |event, control| {
                    let Some(target) = event.target() else {
                        return;
                    };
                    if !detector.is_suspicious(&target.value) {
                        return;
                    }
                    control.prevent_default();
                    let field = target
                        .name
                        .as_deref()
                        .or(target.id.as_deref())
                        .unwrap_or(target.tag.as_str());
                    ctx.violation(NAME, format!("SQL injection pattern in field {}", field));
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
