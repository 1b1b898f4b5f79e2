//! 绊线网关
//!
//! 守卫替换插槽时安装的实现。任何调用都会记录警告并触发锁定，
//! 读取类调用返回空结果，其余调用返回 [`GatewayError::Blocked`]。

use std::sync::Arc;
use std::time::Duration;

use super::GuardContext;
use crate::error::GatewayError;
use crate::host::{
    Capability, ClipboardGateway, ConsoleGateway, ConsoleLevel, CryptoGateway, DomGateway,
    DomMutation, ElementRef, ErrorGateway, EvalGateway, FetchRequest, FetchResponse, FileGateway,
    GatewayResult, NavigationGateway, NetworkGateway, PerformanceGateway, StorageGateway,
    StreamGateway, StreamId, TimerCallback, TimerGateway, TimerId,
};
use crate::lockdown::Lockdown;
use crate::logger::SecurityLogger;

/// 绊线
///
/// 只持有日志和锁定句柄，不持有环境本身，避免插槽与环境之间形成引用环。
pub struct Tripwire {
    guard: &'static str,
    capability: Capability,
    logger: SecurityLogger,
    lockdown: Arc<Lockdown>,
}

impl std::fmt::Debug for Tripwire {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tripwire")
            .field("guard", &self.guard)
            .field("capability", &self.capability)
            .finish()
    }
}

impl Tripwire {
    pub fn new(guard: &'static str, capability: Capability, ctx: &GuardContext) -> Arc<Self> {
        Arc::new(Self {
            guard,
            capability,
            logger: ctx.logger().clone(),
            lockdown: Arc::clone(ctx.lockdown()),
        })
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    fn fire(&self) {
        let message = format!("{}: {} access", self.guard, self.capability);
        self.logger.warn(message.clone());
        self.lockdown.trigger(&message);
    }

    fn blocked<T>(&self) -> GatewayResult<T> {
        self.fire();
        Err(GatewayError::Blocked(self.capability))
    }
}

impl TimerGateway for Tripwire {
    fn schedule(
        &self,
        _delay: Duration,
        _repeat: bool,
        _callback: TimerCallback,
    ) -> GatewayResult<TimerId> {
        self.blocked()
    }

    fn clear(&self, _id: TimerId) {
        self.fire();
    }
}

impl EvalGateway for Tripwire {
    fn evaluate(&self, _source: &str) -> GatewayResult<String> {
        self.blocked()
    }
}

impl ConsoleGateway for Tripwire {
    fn write(&self, _level: ConsoleLevel, _message: &str) {
        self.fire();
    }

    fn clear(&self) {
        self.fire();
    }
}

impl NetworkGateway for Tripwire {
    fn fetch(&self, _request: &FetchRequest) -> GatewayResult<FetchResponse> {
        self.blocked()
    }
}

impl StreamGateway for Tripwire {
    fn open(&self, _url: &str) -> GatewayResult<StreamId> {
        self.blocked()
    }
}

impl StorageGateway for Tripwire {
    fn get_item(&self, _key: &str) -> GatewayResult<Option<String>> {
        self.fire();
        Ok(None)
    }

    fn set_item(&self, _key: &str, _value: &str) -> GatewayResult<()> {
        self.blocked()
    }

    fn remove_item(&self, _key: &str) -> GatewayResult<()> {
        self.blocked()
    }

    fn clear(&self) -> GatewayResult<()> {
        self.blocked()
    }
}

impl DomGateway for Tripwire {
    fn query(&self, _selector: &str) -> Vec<ElementRef> {
        self.fire();
        Vec::new()
    }

    fn get_element_by_id(&self, _id: &str) -> Option<ElementRef> {
        self.fire();
        None
    }

    fn mutate(&self, _mutation: DomMutation) -> GatewayResult<()> {
        self.blocked()
    }

    fn render(&self, _html: &str) -> GatewayResult<()> {
        self.blocked()
    }
}

impl ClipboardGateway for Tripwire {
    fn read_text(&self) -> GatewayResult<String> {
        self.blocked()
    }

    fn write_text(&self, _text: &str) -> GatewayResult<()> {
        self.blocked()
    }
}

impl NavigationGateway for Tripwire {
    fn current_url(&self) -> String {
        self.fire();
        String::new()
    }

    fn navigate(&self, _url: &str) -> GatewayResult<()> {
        self.blocked()
    }

    fn push_state(&self, _url: &str) -> GatewayResult<()> {
        self.blocked()
    }

    fn go(&self, _delta: i32) -> GatewayResult<()> {
        self.blocked()
    }
}

impl PerformanceGateway for Tripwire {
    fn now(&self) -> GatewayResult<f64> {
        self.blocked()
    }

    fn mark(&self, _name: &str) -> GatewayResult<()> {
        self.blocked()
    }
}

impl CryptoGateway for Tripwire {
    fn random_values(&self, _buf: &mut [u8]) -> GatewayResult<()> {
        self.blocked()
    }

    fn digest(&self, _data: &[u8]) -> GatewayResult<Vec<u8>> {
        self.blocked()
    }
}

impl FileGateway for Tripwire {
    fn read(&self, _name: &str) -> GatewayResult<Vec<u8>> {
        self.blocked()
    }
}

impl ErrorGateway for Tripwire {
    fn report(&self, _message: &str) -> GatewayResult<()> {
        self.blocked()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShieldConfig;
    use crate::guards::test_support::context;

    #[test]
    fn test_tripwire_blocks_and_locks() {
        let (host, ctx) = context(ShieldConfig::default());
        let wire = Tripwire::new("test", Capability::Fetch, &ctx);

        let result = NetworkGateway::fetch(wire.as_ref(), &FetchRequest::get("https://x.test/"));
        assert_eq!(result, Err(GatewayError::Blocked(Capability::Fetch)));
        assert!(ctx.lockdown().is_triggered());
        assert_eq!(ctx.lockdown().reason(), Some("test: fetch access"));
        assert!(host.dom.rendered().is_some());
    }

    #[test]
    fn test_read_calls_return_empty() {
        let (_host, ctx) = context(ShieldConfig::default());
        let wire = Tripwire::new("test", Capability::LocalStorage, &ctx);

        assert_eq!(StorageGateway::get_item(wire.as_ref(), "k"), Ok(None));
        assert!(DomGateway::query(wire.as_ref(), "*").is_empty());
        assert!(NavigationGateway::current_url(wire.as_ref()).is_empty());
        assert_eq!(ctx.lockdown().trigger_count(), 3);
        assert_eq!(ctx.logger().count_matching("Lockdown triggered"), 1);
    }
}
