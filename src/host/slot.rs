//! 网关插槽
//!
//! 插槽保存某个能力当前生效的实现和最初的实现。拦截即替换当前实现；
//! 永久拦截会封存插槽，之后无法恢复。

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use super::Capability;
use crate::error::InterceptError;

/// 拦截方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterceptMode {
    /// 可以在 destroy 时恢复
    Reversible,
    /// 不可恢复（对应不可配置的属性重定义）
    Permanent,
}

/// 一次成功拦截的凭据
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterceptReceipt {
    pub capability: Capability,
    pub mode: InterceptMode,
}

/// 恢复结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// 已恢复为原始实现
    Restored,
    /// 当前并未被拦截
    NotIntercepted,
    /// 永久拦截，无法恢复
    NotRestorable,
}

/// 网关插槽
pub struct GatewaySlot<T: ?Sized> {
    capability: Capability,
    current: RwLock<Arc<T>>,
    original: Arc<T>,
    frozen: AtomicBool,
    sealed: AtomicBool,
}

impl<T: ?Sized> fmt::Debug for GatewaySlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewaySlot")
            .field("capability", &self.capability)
            .field("intercepted", &self.is_intercepted())
            .field("frozen", &self.is_frozen())
            .field("sealed", &self.is_sealed())
            .finish()
    }
}

impl<T: ?Sized> GatewaySlot<T> {
    /// 以原始实现创建插槽
    pub fn new(capability: Capability, gateway: Arc<T>) -> Self {
        Self {
            capability,
            current: RwLock::new(Arc::clone(&gateway)),
            original: gateway,
            frozen: AtomicBool::new(false),
            sealed: AtomicBool::new(false),
        }
    }

    /// 插槽对应的能力
    pub fn capability(&self) -> Capability {
        self.capability
    }

    /// 当前生效的实现
    pub fn get(&self) -> Arc<T> {
        Arc::clone(&self.current.read().unwrap_or_else(|e| e.into_inner()))
    }

    /// 原始实现（拦截前捕获）
    pub fn original(&self) -> Arc<T> {
        Arc::clone(&self.original)
    }

    /// 宿主拒绝重新定义该能力
    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::SeqCst);
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::SeqCst)
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::SeqCst)
    }

    /// 当前实现是否已被替换
    pub fn is_intercepted(&self) -> bool {
        let current = self.current.read().unwrap_or_else(|e| e.into_inner());
        !Arc::ptr_eq(&current, &self.original)
    }

    /// 替换当前实现
    pub fn intercept(
        &self,
        replacement: Arc<T>,
        mode: InterceptMode,
    ) -> Result<InterceptReceipt, InterceptError> {
        if self.is_frozen() {
            return Err(InterceptError::Frozen(self.capability));
        }
        if self.is_sealed() {
            return Err(InterceptError::Sealed(self.capability));
        }

        *self.current.write().unwrap_or_else(|e| e.into_inner()) = replacement;
        if mode == InterceptMode::Permanent {
            self.sealed.store(true, Ordering::SeqCst);
        }

        Ok(InterceptReceipt {
            capability: self.capability,
            mode,
        })
    }

    /// 恢复原始实现
    pub fn restore(&self) -> RestoreOutcome {
        if self.is_sealed() {
            return RestoreOutcome::NotRestorable;
        }
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        if Arc::ptr_eq(&current, &self.original) {
            return RestoreOutcome::NotIntercepted;
        }
        *current = Arc::clone(&self.original);
        RestoreOutcome::Restored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> &'static str;
    }

    struct Native;
    impl Greeter for Native {
        fn greet(&self) -> &'static str {
            "native"
        }
    }

    struct Replaced;
    impl Greeter for Replaced {
        fn greet(&self) -> &'static str {
            "replaced"
        }
    }

    fn slot() -> GatewaySlot<dyn Greeter> {
        GatewaySlot::new(Capability::Console, Arc::new(Native))
    }

    #[test]
    fn test_reversible_intercept_and_restore() {
        let slot = slot();
        assert!(!slot.is_intercepted());

        let receipt = slot
            .intercept(Arc::new(Replaced), InterceptMode::Reversible)
            .unwrap();
        assert_eq!(receipt.capability, Capability::Console);
        assert_eq!(slot.get().greet(), "replaced");
        assert_eq!(slot.original().greet(), "native");

        assert_eq!(slot.restore(), RestoreOutcome::Restored);
        assert_eq!(slot.get().greet(), "native");
        assert_eq!(slot.restore(), RestoreOutcome::NotIntercepted);
    }

    #[test]
    fn test_permanent_intercept_is_not_restorable() {
        let slot = slot();
        slot.intercept(Arc::new(Replaced), InterceptMode::Permanent)
            .unwrap();

        assert_eq!(slot.restore(), RestoreOutcome::NotRestorable);
        assert_eq!(slot.get().greet(), "replaced");
        assert_eq!(
            slot.intercept(Arc::new(Replaced), InterceptMode::Reversible),
            Err(InterceptError::Sealed(Capability::Console))
        );
    }

    #[test]
    fn test_frozen_slot_rejects_intercept() {
        let slot = slot();
        slot.freeze();

        let result = slot.intercept(Arc::new(Replaced), InterceptMode::Reversible);
        assert_eq!(result, Err(InterceptError::Frozen(Capability::Console)));
        assert_eq!(slot.get().greet(), "native");
    }
}
