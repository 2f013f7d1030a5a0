//! 账户聚合根。
//!
//! 账户承载凭证、锁定状态与角色。本地注册账户持有密码散列;
//! 联合登录账户可以没有本地密码,此时只能通过身份提供方登录。

use chrono::{DateTime, Utc};
use janua_common::{AccountId, AuditInfo};

use super::role::Role;
use super::value_objects::{Email, HashedPassword, Username};

/// 账户实体。
#[derive(Debug, Clone)]
pub struct Account {
    pub id: AccountId,
    pub username: Username,
    pub email: Email,
    pub display_name: Option<String>,
    pub password_hash: Option<HashedPassword>,
    pub active: bool,
    pub locked: bool,
    pub failed_login_attempts: i32,
    pub last_login_at: Option<DateTime<Utc>>,
    pub email_verified: bool,
    pub oauth2_provider: Option<String>,
    pub oauth2_provider_id: Option<String>,
    pub roles: Vec<Role>,
    pub audit: AuditInfo,
}

impl Account {
    /// 本地注册的新账户。
    pub fn register(
        username: Username,
        email: Email,
        password_hash: HashedPassword,
        default_role: Role,
    ) -> Self {
        Self {
            id: AccountId::new(),
            username,
            email,
            display_name: None,
            password_hash: Some(password_hash),
            active: true,
            locked: false,
            failed_login_attempts: 0,
            last_login_at: None,
            email_verified: false,
            oauth2_provider: None,
            oauth2_provider_id: None,
            roles: vec![default_role],
            audit: AuditInfo::default(),
        }
    }

    /// 从联合身份首次登录时自动开通的账户。
    ///
    /// 身份提供方已经验证过邮箱,因此 `email_verified` 直接为 true。
    pub fn provision_federated(
        username: Username,
        email: Email,
        provider: impl Into<String>,
        provider_id: impl Into<String>,
        display_name: Option<String>,
        default_role: Role,
    ) -> Self {
        Self {
            id: AccountId::new(),
            username,
            email,
            display_name,
            password_hash: None,
            active: true,
            locked: false,
            failed_login_attempts: 0,
            last_login_at: None,
            email_verified: true,
            oauth2_provider: Some(provider.into()),
            oauth2_provider_id: Some(provider_id.into()),
            roles: vec![default_role],
            audit: AuditInfo::default(),
        }
    }

    /// 记录一次失败的登录。达到阈值时锁定账户,返回本次是否触发了锁定。
    pub fn record_failed_attempt(&mut self, threshold: i32) -> bool {
        self.failed_login_attempts += 1;
        self.audit.touch(None);
        if !self.locked && self.failed_login_attempts >= threshold {
            self.locked = true;
            return true;
        }
        false
    }

    /// 成功登录后清零失败计数。
    pub fn reset_failed_attempts(&mut self) {
        self.failed_login_attempts = 0;
        self.audit.touch(None);
    }

    /// 记录最近一次成功登录时间。
    pub fn record_login(&mut self) {
        self.last_login_at = Some(Utc::now());
        self.audit.touch(None);
    }

    /// 登录校验可用的角色名列表,写入令牌声明。
    pub fn role_names(&self) -> Vec<String> {
        self.roles
            .iter()
            .map(|role| role.name.as_str().to_string())
            .collect()
    }

    /// 是否允许用密码登录。
    pub fn has_local_credentials(&self) -> bool {
        self.password_hash.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::role::RoleName;

    fn test_account() -> Account {
        Account::register(
            Username::new("alice").unwrap(),
            Email::new("alice@example.com").unwrap(),
            HashedPassword::from_hash("$argon2id$fake"),
            Role::new(RoleName::User),
        )
    }

    #[test]
    fn new_account_starts_clean() {
        let account = test_account();
        assert!(account.active);
        assert!(!account.locked);
        assert_eq!(account.failed_login_attempts, 0);
        assert!(account.last_login_at.is_none());
        assert!(!account.email_verified);
        assert!(account.has_local_credentials());
    }

    #[test]
    fn locks_exactly_at_threshold() {
        let mut account = test_account();
        for _ in 0..4 {
            assert!(!account.record_failed_attempt(5));
            assert!(!account.locked);
        }
        assert!(account.record_failed_attempt(5));
        assert!(account.locked);
        assert_eq!(account.failed_login_attempts, 5);
    }

    #[test]
    fn lock_fires_only_once() {
        let mut account = test_account();
        for _ in 0..5 {
            account.record_failed_attempt(5);
        }
        assert!(!account.record_failed_attempt(5));
        assert_eq!(account.failed_login_attempts, 6);
        assert!(account.locked);
    }

    #[test]
    fn reset_clears_counter_but_not_lock() {
        let mut account = test_account();
        for _ in 0..5 {
            account.record_failed_attempt(5);
        }
        account.reset_failed_attempts();
        assert_eq!(account.failed_login_attempts, 0);
        assert!(account.locked);
    }

    #[test]
    fn federated_account_has_no_local_credentials() {
        let account = Account::provision_federated(
            Username::new("john.doe").unwrap(),
            Email::new("john.doe@example.com").unwrap(),
            "google",
            "john.doe@example.com",
            Some("John Doe".to_string()),
            Role::new(RoleName::User),
        );
        assert!(!account.has_local_credentials());
        assert!(account.email_verified);
        assert_eq!(account.oauth2_provider.as_deref(), Some("google"));
        assert_eq!(account.role_names(), vec!["ROLE_USER"]);
    }
}
