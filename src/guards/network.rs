//! 网络守卫
//!
//! fetch、WebSocket、EventSource 三个入口默认替换为绊线。
//! fetch 未被拦截且开启了 `network_rate_limit` 时，原始 fetch 外面包一层
//! 按来源限流的 [`RateLimitedNetwork`]。

use std::sync::Arc;

use url::Url;

use super::{Guard, GuardContext, GuardCore, GuardState, Tripwire};
use crate::error::{Error, GatewayError, Result};
use crate::host::{
    Capability, FetchRequest, FetchResponse, GatewayResult, InterceptMode, NetworkGateway,
    StreamGateway,
};
use crate::logger::SecurityLogger;
use crate::security::RateLimiter;

const NAME: &str = "NetworkGuard";

/// 按来源限流的 fetch
///
/// 同一来源（scheme + host + port）共享一个配额；无法解析的地址按原文计数。
pub struct RateLimitedNetwork {
    inner: Arc<dyn NetworkGateway>,
    limiter: Arc<RateLimiter>,
    logger: SecurityLogger,
}

impl std::fmt::Debug for RateLimitedNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitedNetwork")
            .field("limiter", &self.limiter.config())
            .finish()
    }
}

impl RateLimitedNetwork {
    pub fn new(
        inner: Arc<dyn NetworkGateway>,
        limiter: Arc<RateLimiter>,
        logger: SecurityLogger,
    ) -> Self {
        Self {
            inner,
            limiter,
            logger,
        }
    }

    /// 限流键
    pub fn origin_key(url: &str) -> String {
        match Url::parse(url) {
            Ok(parsed) => parsed.origin().ascii_serialization(),
            Err(_) => url.to_string(),
        }
    }
}

impl NetworkGateway for RateLimitedNetwork {
    fn fetch(&self, request: &FetchRequest) -> GatewayResult<FetchResponse> {
        let key = Self::origin_key(&request.url);
        match self.limiter.check(&key) {
            Ok(_) => self.inner.fetch(request),
            Err(Error::RateLimitExceeded { retry_after }) => {
                self.logger.warn(format!(
                    "{}: request to {} rate limited, retry after {}ms",
                    NAME,
                    key,
                    retry_after.as_millis()
                ));
                Err(GatewayError::RateLimited { retry_after })
            }
            Err(e) => Err(GatewayError::Unavailable(e.to_string())),
        }
    }
}

#[derive(Debug)]
pub struct NetworkGuard {
    core: GuardCore,
}

impl Default for NetworkGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkGuard {
    pub fn new() -> Self {
        Self {
            core: GuardCore::new(NAME),
        }
    }
}

impl Guard for NetworkGuard {
    fn name(&self) -> &'static str {
        NAME
    }

    fn initialize(&self, ctx: &GuardContext) -> Result<()> {
        self.core.initialize_with(ctx, |inst| {
            let env = ctx.env();
            let config = ctx.config();

            if config.block_fetch {
                let wire: Arc<dyn NetworkGateway> = Tripwire::new(NAME, Capability::Fetch, ctx);
                inst.intercept(env.fetch(), wire, InterceptMode::Reversible);
            } else if config.network_rate_limit {
                let limited: Arc<dyn NetworkGateway> = Arc::new(RateLimitedNetwork::new(
                    env.fetch().original(),
                    Arc::clone(ctx.rate_limiter()),
                    ctx.logger().clone(),
                ));
                inst.intercept(env.fetch(), limited, InterceptMode::Reversible);
            }

            if config.block_websocket {
                let wire: Arc<dyn StreamGateway> = Tripwire::new(NAME, Capability::WebSocket, ctx);
                inst.intercept(env.websocket(), wire, InterceptMode::Reversible);
            }
            if config.block_event_source {
                let wire: Arc<dyn StreamGateway> =
                    Tripwire::new(NAME, Capability::EventSource, ctx);
                inst.intercept(env.event_source(), wire, InterceptMode::Reversible);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShieldConfig;
    use crate::guards::test_support::context;
    use std::time::Duration;

    #[test]
    fn test_blocked_fetch() {
        let (host, ctx) = context(ShieldConfig::default());
        NetworkGuard::new().initialize(&ctx).unwrap();

        let result = host
            .env()
            .fetch()
            .get()
            .fetch(&FetchRequest::get("https://api.example.com/data"));
        assert_eq!(result, Err(GatewayError::Blocked(Capability::Fetch)));
        assert!(host.network.requests().is_empty());
        assert!(ctx.lockdown().is_triggered());
    }

    #[test]
    fn test_websocket_blocked() {
        let (host, ctx) = context(ShieldConfig::default());
        NetworkGuard::new().initialize(&ctx).unwrap();

        assert!(host.env().websocket().get().open("wss://x.test/").is_err());
        assert!(host.websocket.opened().is_empty());
        assert!(ctx.lockdown().is_triggered());
    }

    #[test]
    fn test_rate_limited_fetch_per_origin() {
        let config = ShieldConfig {
            block_fetch: false,
            ..Default::default()
        }
        .with_rate_limit(2, Duration::from_secs(10));
        let (host, ctx) = context(config);
        NetworkGuard::new().initialize(&ctx).unwrap();

        let fetch = host.env().fetch().get();
        assert!(fetch.fetch(&FetchRequest::get("https://a.test/1")).is_ok());
        assert!(fetch.fetch(&FetchRequest::get("https://a.test/2")).is_ok());
        assert!(matches!(
            fetch.fetch(&FetchRequest::get("https://a.test/3")),
            Err(GatewayError::RateLimited { .. })
        ));
        // 不同来源独立计数
        assert!(fetch.fetch(&FetchRequest::get("https://b.test/")).is_ok());

        host.advance(Duration::from_secs(11));
        assert!(fetch.fetch(&FetchRequest::get("https://a.test/4")).is_ok());

        assert_eq!(host.network.requests().len(), 4);
        assert!(!ctx.lockdown().is_triggered());
        assert_eq!(ctx.logger().count_matching("rate limited"), 1);
    }

    #[test]
    fn test_origin_key() {
        assert_eq!(
            RateLimitedNetwork::origin_key("https://a.test:8443/path?q=1"),
            "https://a.test:8443"
        );
        assert_eq!(RateLimitedNetwork::origin_key("not a url"), "not a url");
    }

    #[test]
    fn test_destroy_restores_all() {
        let (host, ctx) = context(ShieldConfig::default());
        let guard = NetworkGuard::new();
        guard.initialize(&ctx).unwrap();
        guard.destroy();

        assert!(host.env().intercepted().is_empty());
        assert_eq!(guard.state(), GuardState::Destroyed { partial: false });
    }
}
