//! 集成测试：密码策略
//!
//! 测试常见弱密码被拒绝、随机密码通过，以及密码字段的实时校验。

use shieldrs::host::{Element, HostEvent, MemoryHost};
use shieldrs::password::{PasswordPolicy, PolicyViolation, hash_password, verify_password};
use shieldrs::{ShieldConfig, ShieldManager, generate_random_alphanumeric};

/// 测试弱密码被拒绝
#[test]
fn test_weak_passwords_rejected() {
    let policy = PasswordPolicy::new(8);

    assert!(
        policy
            .evaluate("password")
            .contains(&PolicyViolation::CommonPassword)
    );
    assert!(
        policy
            .evaluate("aaa12345")
            .contains(&PolicyViolation::RepeatedCharacters)
    );
    assert!(
        policy
            .evaluate("qwerty12")
            .contains(&PolicyViolation::KeyboardPattern)
    );
    assert!(policy.validate("short").is_err());
}

/// 测试随机生成的 12 位密码通过策略
#[test]
fn test_random_passwords_accepted() {
    let policy = PasswordPolicy::new(8);
    assert!(policy.is_acceptable("Tg7#mQ2!xLp9"));

    // 随机串偶尔会碰巧包含键盘序列，只要求绝大多数通过
    let accepted = (0..50)
        .map(|_| generate_random_alphanumeric(12).unwrap())
        .filter(|p| policy.is_acceptable(p))
        .count();
    assert!(accepted >= 40, "only {} of 50 accepted", accepted);
}

/// 测试哈希与策略配合使用
#[test]
fn test_accepted_password_can_be_hashed() {
    let policy = PasswordPolicy::default();
    let password = "vT7#pL2!mQ9z";
    policy.validate(password).unwrap();

    let hash = hash_password(password).unwrap();
    assert!(verify_password(password, &hash).unwrap());
    assert!(!verify_password("qwerty12", &hash).unwrap());
}

/// 测试密码字段输入弱密码触发锁定
#[test]
fn test_password_field_through_manager() {
    let host = MemoryHost::new();
    let manager = ShieldManager::new(host.env(), Some(ShieldConfig::relaxed())).unwrap();
    manager.mount();

    let field = || Element::input("password").with_name("password").in_form("signup");

    host.env().dispatch(&HostEvent::Change {
        target: field().with_value("Tg7#mQ2!xLp9"),
    });
    assert!(!manager.lockdown().is_triggered());

    host.env().dispatch(&HostEvent::Change {
        target: field().with_value("password"),
    });
    assert!(manager.lockdown().is_triggered());
    assert!(manager.lockdown().reason().unwrap().contains("too common"));
}
