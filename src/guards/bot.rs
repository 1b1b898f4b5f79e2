//! 机器人检测守卫
//!
//! 三种独立判断：
//!
//! - User-Agent 命中黑名单子串
//! - 自动化环境特征（webdriver 标志、缺失的运行时属性、驱动注入的全局属性）
//! - 观察期结束时鼠标移动和按键次数都低于下限（突发事件合并计数）

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};

use super::{Guard, GuardContext, GuardCore, GuardState};
use crate::clock::elapsed_between;
use crate::error::Result;
use crate::host::{EventKind, NavigatorInfo, Phase};

const NAME: &str = "BotGuard";

/// User-Agent 黑名单（小写子串）
const BLOCKED_USER_AGENTS: &[&str] = &[
    "headlesschrome",
    "phantomjs",
    "slimerjs",
    "selenium",
    "webdriver",
    "puppeteer",
    "playwright",
    "nightmare",
    "python-requests",
    "python-urllib",
    "scrapy",
    "curl/",
    "wget/",
    "httpclient",
    "crawler",
    "spider",
    "bot/",
];

/// 自动化驱动注入的全局属性
const AUTOMATION_PROPERTIES: &[&str] = &[
    "__webdriver_evaluate",
    "__selenium_evaluate",
    "__webdriver_script_fn",
    "__driver_evaluate",
    "__selenium_unwrapped",
    "__fxdriver_unwrapped",
    "_Selenium_IDE_Recorder",
    "_phantom",
    "callPhantom",
    "__nightmare",
    "domAutomation",
    "domAutomationController",
    "__playwright",
    "__pwInitScripts",
    "__puppeteer_evaluation_script__",
];

/// chromedriver 注入的属性前缀
const CHROMEDRIVER_PREFIX: &str = "cdc_";

/// 命中的黑名单子串
///
/// ```rust
/// use shieldrs::guards::blocked_user_agent;
///
/// let ua = "Mozilla/5.0 (X11; Linux x86_64) HeadlessChrome/120.0 Safari/537.36";
/// assert_eq!(blocked_user_agent(ua, &[]), Some("headlesschrome".to_string()));
/// assert_eq!(blocked_user_agent("Mozilla/5.0 Firefox/128.0", &[]), None);
/// ```
pub fn blocked_user_agent(user_agent: &str, extra: &[String]) -> Option<String> {
    let ua = user_agent.to_lowercase();
    BLOCKED_USER_AGENTS
        .iter()
        .map(|s| s.to_string())
        .chain(extra.iter().map(|s| s.to_lowercase()))
        .find(|needle| !needle.is_empty() && ua.contains(needle.as_str()))
}

/// 自动化环境特征
pub fn automation_indicators(info: &NavigatorInfo) -> Vec<String> {
    let mut indicators = Vec::new();

    if info.webdriver {
        indicators.push("navigator.webdriver is set".to_string());
    }
    if info.languages.is_empty() {
        indicators.push("navigator.languages is empty".to_string());
    }

    let claims_chrome = info.user_agent.contains("Chrome/") && !info.user_agent.contains("Edg/");
    if claims_chrome && !info.has_chrome_runtime {
        indicators.push("chrome runtime missing".to_string());
    }
    if claims_chrome && info.plugin_count == 0 {
        indicators.push("no plugins".to_string());
    }

    for property in &info.global_properties {
        if AUTOMATION_PROPERTIES.contains(&property.as_str())
            || property.starts_with(CHROMEDRIVER_PREFIX)
        {
            indicators.push(format!("automation property {}", property));
        }
    }

    indicators
}

/// 合并计数器
#[derive(Debug, Default)]
struct Counter {
    count: u32,
    last: Option<DateTime<Utc>>,
}

impl Counter {
    fn record(&mut self, now: DateTime<Utc>, coalesce: std::time::Duration) {
        let counted = match self.last {
            Some(last) => elapsed_between(last, now) >= coalesce,
            None => true,
        };
        if counted {
            self.count += 1;
            self.last = Some(now);
        }
    }
}

#[derive(Debug, Default)]
struct Activity {
    mouse: Counter,
    keys: Counter,
}

#[derive(Debug)]
pub struct BotGuard {
    core: GuardCore,
}

impl Default for BotGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl BotGuard {
    pub fn new() -> Self {
        Self {
            core: GuardCore::new(NAME),
        }
    }
}

impl Guard for BotGuard {
    fn name(&self) -> &'static str {
        NAME
    }

    fn initialize(&self, ctx: &GuardContext) -> Result<()> {
        self.core.initialize_with(ctx, |inst| {
            let config = ctx.config();

            if config.check_user_agent || config.check_automation {
                let info = ctx.env().navigator().info();
                if config.check_user_agent
                    && let Some(needle) =
                        blocked_user_agent(&info.user_agent, &config.extra_blocked_user_agents)
                {
                    ctx.violation(NAME, format!("blocked user agent ({})", needle));
                }
                if config.check_automation {
                    let indicators = automation_indicators(&info);
                    if !indicators.is_empty() {
                        ctx.violation(
                            NAME,
                            format!("automation detected: {}", indicators.join(", ")),
                        );
                    }
                }
            }

            if !config.detect_bots {
                return Ok(());
            }

            let activity = Arc::new(Mutex::new(Activity::default()));
            for kind in [EventKind::MouseMove, EventKind::KeyDown] {
                let activity = Arc::clone(&activity);
                let clock = Arc::clone(ctx.env().clock());
                let coalesce = config.bot_event_coalesce;
                inst.listen(kind, Phase::Capture, move |_, _| {
                    let now = clock.now();
                    let mut activity = activity.lock().unwrap_or_else(|e| e.into_inner());
                    match kind {
                        EventKind::MouseMove => activity.mouse.record(now, coalesce),
                        _ => activity.keys.record(now, coalesce),
                    }
                });
            }

            let check_ctx = ctx.clone();
            inst.after(config.bot_observation_delay, move || {
                let (mouse, keys) = {
                    let activity = activity.lock().unwrap_or_else(|e| e.into_inner());
                    (activity.mouse.count, activity.keys.count)
                };
                let config = check_ctx.config();
                if mouse < config.bot_min_mouse_events && keys < config.bot_min_key_events {
                    check_ctx.violation(
                        NAME,
                        format!(
                            "insufficient interaction ({} mouse, {} keyboard events)",
                            mouse, keys
                        ),
                    );
                } else {
                    check_ctx.logger().info(format!(
                        "{}: interaction check passed ({} mouse, {} keyboard events)",
                        NAME, mouse, keys
                    ));
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
