//! 锁定响应
//!
//! 守卫检测到违规后的统一终止动作：通过原始 DOM 网关把页面替换为拒绝访问提示，
//! 再通过原始导航网关跳转到 `about:blank`。锁定是单向的，没有撤销接口；
//! 重复触发只计数，不再重复渲染或记录日志。

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use crate::host::Environment;
use crate::logger::SecurityLogger;

/// 锁定后显示的内容
pub const ACCESS_DENIED_HTML: &str = "<!DOCTYPE html><html><head><title>Access Denied</title></head>\
<body style=\"display:flex;align-items:center;justify-content:center;height:100vh;margin:0;\
font-family:sans-serif;background:#111;color:#eee\"><div><h1>Access Denied</h1>\
<p>A security policy violation was detected. This session has been terminated.</p></div></body></html>";

/// 锁定后导航到的地址
pub const LOCKDOWN_URL: &str = "about:blank";

/// 锁定原语
///
/// 持有环境的弱引用；环境释放后触发只记录日志。
pub struct Lockdown {
    env: Weak<Environment>,
    logger: SecurityLogger,
    reason: OnceLock<String>,
    triggers: AtomicUsize,
}

impl fmt::Debug for Lockdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lockdown")
            .field("reason", &self.reason())
            .field("triggers", &self.trigger_count())
            .finish()
    }
}

impl Lockdown {
    pub fn new(env: &Arc<Environment>, logger: SecurityLogger) -> Self {
        Self {
            env: Arc::downgrade(env),
            logger,
            reason: OnceLock::new(),
            triggers: AtomicUsize::new(0),
        }
    }

    /// 触发锁定
    ///
    /// 只有第一次调用会执行渲染和导航。
    pub fn trigger(&self, reason: &str) {
        self.triggers.fetch_add(1, Ordering::SeqCst);
        if self.reason.set(reason.to_string()).is_err() {
            return;
        }

        self.logger.error(format!("Lockdown triggered: {}", reason));

        let Some(env) = self.env.upgrade() else {
            self.logger.error("Lockdown could not reach the host environment");
            return;
        };

        if let Err(e) = env.dom().original().render(ACCESS_DENIED_HTML) {
            self.logger.error(format!("Lockdown could not replace content: {}", e));
        }
        if let Err(e) = env.location().original().navigate(LOCKDOWN_URL) {
            self.logger.error(format!("Lockdown could not navigate away: {}", e));
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.reason.get().is_some()
    }

    /// 第一次触发的原因
    pub fn reason(&self) -> Option<&str> {
        self.reason.get().map(String::as_str)
    }

    /// 触发次数（包括重复触发）
    pub fn trigger_count(&self) -> usize {
        self.triggers.load(Ordering::SeqCst)
    }
}
