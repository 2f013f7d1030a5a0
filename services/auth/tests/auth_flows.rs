//! 认证流程的端到端测试,跑在内存持久化上。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use janua_adapter_email::{EmailSender, EmailTemplate};
use janua_auth::application::{
    AuthService, LoginCommand, LogoutCommand, OAuth2LoginCommand, OAuth2Service, RegisterCommand,
};
use janua_auth::domain::{Account, AccountRepository, AuditEventType};
use janua_auth::error::AuthError;
use janua_auth::infrastructure::events::{
    InMemoryLoginEventBus, LoginEvent, LoginEventPublisher, LoginEventType,
};
use janua_auth::infrastructure::notification::NotificationDispatcher;
use janua_auth::infrastructure::persistence::{InMemoryStore, InMemoryUnitOfWorkFactory};
use janua_auth_core::TokenService;
use janua_common::AccountId;
use janua_config::SecurityConfig;
use janua_errors::{AppError, AppResult};
use tokio::sync::Mutex;

const TEST_SECRET: &str = "test-secret-for-auth-flows";

/// 记录发送的邮件,可配置为直接失败。
#[derive(Default)]
struct TestEmailSender {
    sent: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl TestEmailSender {
    fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    async fn record(&self, to: &str, subject: &str) -> AppResult<()> {
        if self.fail {
            return Err(AppError::external_service("SMTP unavailable"));
        }
        self.sent
            .lock()
            .await
            .push((to.to_string(), subject.to_string()));
        Ok(())
    }
}

#[async_trait]
impl EmailSender for TestEmailSender {
    async fn send_text_email(&self, to: &str, subject: &str, _body: &str) -> AppResult<()> {
        self.record(to, subject).await
    }

    async fn send_html_email(
        &self,
        to: &str,
        subject: &str,
        _html_body: &str,
        _text_body: Option<&str>,
    ) -> AppResult<()> {
        self.record(to, subject).await
    }

    async fn send_template_email(
        &self,
        to: &str,
        subject: &str,
        _template_name: &str,
        _context: &serde_json::Value,
    ) -> AppResult<()> {
        self.record(to, subject).await
    }
}

struct FailingEventPublisher;

#[async_trait]
impl LoginEventPublisher for FailingEventPublisher {
    async fn publish(&self, _event: &LoginEvent) -> AppResult<()> {
        Err(AppError::external_service("Broker unavailable"))
    }
}

struct Harness {
    auth: AuthService,
    oauth2: OAuth2Service,
    store: InMemoryStore,
    token_service: Arc<TokenService>,
}

async fn harness() -> Harness {
    harness_with(Arc::new(InMemoryLoginEventBus::new()), None).await
}

async fn harness_with(
    events: Arc<dyn LoginEventPublisher>,
    email: Option<Arc<dyn EmailSender>>,
) -> Harness {
    let store = InMemoryStore::with_seeded_roles().await;
    let token_service = Arc::new(TokenService::new(TEST_SECRET, 3600, "janua"));
    let dispatcher = Arc::new(NotificationDispatcher::new(
        email,
        Arc::new(EmailTemplate::builtin().unwrap()),
        events,
        Duration::from_secs(2),
    ));
    let uow_factory = Arc::new(InMemoryUnitOfWorkFactory::new(store.clone()));

    let auth = AuthService::new(
        uow_factory.clone(),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        token_service.clone(),
        dispatcher.clone(),
        SecurityConfig::default(),
    );
    let oauth2 = OAuth2Service::new(
        uow_factory,
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        token_service.clone(),
        dispatcher,
    );

    Harness {
        auth,
        oauth2,
        store,
        token_service,
    }
}

fn register_cmd(username: &str, email: &str) -> RegisterCommand {
    RegisterCommand {
        username: username.to_string(),
        email: email.to_string(),
        password: "s3cret-password".to_string(),
    }
}

fn login_cmd(identifier: &str, password: &str) -> LoginCommand {
    LoginCommand {
        identifier: identifier.to_string(),
        password: password.to_string(),
        ip_address: Some("203.0.113.7".to_string()),
        user_agent: Some("Mozilla/5.0 (Windows NT 10.0; Win64; x64)".to_string()),
    }
}

fn oauth2_cmd(provider: &str, email: &str) -> OAuth2LoginCommand {
    OAuth2LoginCommand {
        provider: provider.to_string(),
        email: email.to_string(),
        display_name: Some("John Doe".to_string()),
        ip_address: Some("203.0.113.7".to_string()),
        user_agent: None,
    }
}

async fn audit_events_for(store: &InMemoryStore, username: &str) -> Vec<AuditEventType> {
    store
        .audit_records()
        .await
        .iter()
        .filter(|r| r.username == username)
        .map(|r| r.event_type)
        .collect()
}

mod registration {
    use super::*;

    #[tokio::test]
    async fn creates_account_with_default_role() {
        let h = harness().await;
        let account = h
            .auth
            .register(register_cmd("alice", "alice@example.com"))
            .await
            .unwrap();

        assert_eq!(account.role_names(), vec!["ROLE_USER"]);
        assert!(account.active);
        assert!(!account.locked);
        assert!(account.has_local_credentials());
        assert_eq!(
            audit_events_for(&h.store, "alice").await,
            vec![AuditEventType::Registered]
        );
    }

    #[tokio::test]
    async fn stores_hash_not_plaintext() {
        let h = harness().await;
        h.auth
            .register(register_cmd("alice", "alice@example.com"))
            .await
            .unwrap();

        let stored = h.store.account_by_username("alice").await.unwrap();
        let hash = stored.password_hash.unwrap();
        assert_ne!(hash.as_str(), "s3cret-password");
        assert!(hash.verify("s3cret-password").unwrap());
    }

    #[tokio::test]
    async fn rejects_duplicate_username() {
        let h = harness().await;
        h.auth
            .register(register_cmd("alice", "alice@example.com"))
            .await
            .unwrap();

        let err = h
            .auth
            .register(register_cmd("alice", "other@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateIdentity));
    }

    #[tokio::test]
    async fn rejects_duplicate_email() {
        let h = harness().await;
        h.auth
            .register(register_cmd("alice", "alice@example.com"))
            .await
            .unwrap();

        let err = h
            .auth
            .register(register_cmd("alice2", "alice@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateIdentity));
    }

    /// 假装预检查总是看不到重复,迫使唯一约束兜底。
    struct BlindfoldedAccounts(InMemoryStore);

    #[async_trait]
    impl AccountRepository for BlindfoldedAccounts {
        async fn find_by_id(&self, id: &AccountId) -> AppResult<Option<Account>> {
            AccountRepository::find_by_id(&self.0, id).await
        }

        async fn find_by_username(&self, username: &str) -> AppResult<Option<Account>> {
            AccountRepository::find_by_username(&self.0, username).await
        }

        async fn find_by_username_or_email(&self, identifier: &str) -> AppResult<Option<Account>> {
            AccountRepository::find_by_username_or_email(&self.0, identifier).await
        }

        async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>> {
            AccountRepository::find_by_email(&self.0, email).await
        }

        async fn exists_by_username(&self, _username: &str) -> AppResult<bool> {
            Ok(false)
        }

        async fn exists_by_email(&self, _email: &str) -> AppResult<bool> {
            Ok(false)
        }

        async fn insert(&self, account: &Account) -> AppResult<()> {
            AccountRepository::insert(&self.0, account).await
        }

        async fn save(&self, account: &Account) -> AppResult<()> {
            AccountRepository::save(&self.0, account).await
        }
    }

    #[tokio::test]
    async fn duplicate_that_slips_past_prechecks_is_still_duplicate_identity() {
        let store = InMemoryStore::with_seeded_roles().await;
        let token_service = Arc::new(TokenService::new(TEST_SECRET, 3600, "janua"));
        let dispatcher = Arc::new(NotificationDispatcher::new(
            None,
            Arc::new(EmailTemplate::builtin().unwrap()),
            Arc::new(InMemoryLoginEventBus::new()),
            Duration::from_secs(2),
        ));
        let auth = AuthService::new(
            Arc::new(InMemoryUnitOfWorkFactory::new(store.clone())),
            Arc::new(BlindfoldedAccounts(store.clone())),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            token_service,
            dispatcher,
            SecurityConfig::default(),
        );

        auth.register(register_cmd("alice", "alice@example.com"))
            .await
            .unwrap();
        let err = auth
            .register(register_cmd("alice", "alice@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateIdentity));
    }

    #[tokio::test]
    async fn rejects_weak_password() {
        let h = harness().await;
        let err = h
            .auth
            .register(RegisterCommand {
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                password: "short".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
        assert!(h.store.account_by_username("alice").await.is_none());
    }
}

mod password_login {
    use super::*;

    #[tokio::test]
    async fn succeeds_and_creates_session() {
        let h = harness().await;
        h.auth
            .register(register_cmd("alice", "alice@example.com"))
            .await
            .unwrap();

        let result = h
            .auth
            .login(login_cmd("alice", "s3cret-password"))
            .await
            .unwrap();

        assert_eq!(result.token_type, "Bearer");
        assert_eq!(result.username, "alice");
        assert_eq!(result.roles, vec!["ROLE_USER"]);
        assert_eq!(result.expires_in, 3600);

        let sessions = h.store.sessions().await;
        assert_eq!(sessions.len(), 1);
        assert!(sessions[0].active);
        assert_eq!(sessions[0].token, result.token);
        assert_eq!(sessions[0].ip_address.as_deref(), Some("203.0.113.7"));

        let account = h.store.account_by_username("alice").await.unwrap();
        assert!(account.last_login_at.is_some());
        assert!(audit_events_for(&h.store, "alice")
            .await
            .contains(&AuditEventType::LoginSuccess));
    }

    #[tokio::test]
    async fn accepts_email_as_identifier() {
        let h = harness().await;
        h.auth
            .register(register_cmd("alice", "alice@example.com"))
            .await
            .unwrap();

        let result = h
            .auth
            .login(login_cmd("alice@example.com", "s3cret-password"))
            .await
            .unwrap();
        assert_eq!(result.username, "alice");
    }

    #[tokio::test]
    async fn token_validates_with_subject_and_roles() {
        let h = harness().await;
        h.auth
            .register(register_cmd("alice", "alice@example.com"))
            .await
            .unwrap();
        let result = h
            .auth
            .login(login_cmd("alice", "s3cret-password"))
            .await
            .unwrap();

        let validation = h.auth.validate_token(&result.token);
        assert!(validation.valid);
        assert_eq!(validation.username.as_deref(), Some("alice"));
        assert_eq!(validation.roles, vec!["ROLE_USER"]);
    }

    #[tokio::test]
    async fn garbage_token_is_invalid_without_error() {
        let h = harness().await;
        let validation = h.auth.validate_token("not-a-token");
        assert!(!validation.valid);
        assert!(validation.username.is_none());
        assert!(validation.roles.is_empty());
    }

    #[tokio::test]
    async fn unknown_user_and_wrong_password_are_indistinguishable() {
        let h = harness().await;
        h.auth
            .register(register_cmd("alice", "alice@example.com"))
            .await
            .unwrap();

        let unknown = h
            .auth
            .login(login_cmd("nobody", "s3cret-password"))
            .await
            .unwrap_err();
        let wrong = h
            .auth
            .login(login_cmd("alice", "wrong-password1"))
            .await
            .unwrap_err();

        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn unknown_identifier_is_audited_verbatim() {
        let h = harness().await;
        let _ = h.auth.login(login_cmd("nobody", "whatever123")).await;

        let records = h.store.audit_records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].username, "nobody");
        assert_eq!(records[0].event_type, AuditEventType::LoginFailure);
        assert!(!records[0].success);
    }

    #[tokio::test]
    async fn failure_is_audited_even_though_login_errors() {
        let h = harness().await;
        h.auth
            .register(register_cmd("alice", "alice@example.com"))
            .await
            .unwrap();

        let _ = h.auth.login(login_cmd("alice", "wrong-password1")).await;
        let _ = h.auth.login(login_cmd("alice", "wrong-password2")).await;

        let account = h.store.account_by_username("alice").await.unwrap();
        assert_eq!(account.failed_login_attempts, 2);

        let failures = audit_events_for(&h.store, "alice")
            .await
            .iter()
            .filter(|e| **e == AuditEventType::LoginFailure)
            .count();
        assert_eq!(failures, 2);
    }
}

mod history {
    use super::*;
    use janua_common::Pagination;

    #[tokio::test]
    async fn returns_newest_first_with_pagination() {
        let h = harness().await;
        h.auth
            .register(register_cmd("alice", "alice@example.com"))
            .await
            .unwrap();
        for _ in 0..3 {
            let _ = h.auth.login(login_cmd("alice", "wrong-password1")).await;
        }
        h.auth
            .login(login_cmd("alice", "s3cret-password"))
            .await
            .unwrap();

        // REGISTERED + 3x LOGIN_FAILURE + LOGIN_SUCCESS
        let all = h
            .auth
            .login_history("alice", &Pagination::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 5);

        let first_page = h
            .auth
            .login_history(
                "alice",
                &Pagination {
                    page: 1,
                    page_size: 2,
                },
            )
            .await
            .unwrap();
        assert_eq!(first_page.len(), 2);
        assert!(first_page[0].created_at >= first_page[1].created_at);
    }
}

mod lockout {
    use super::*;

    #[tokio::test]
    async fn locks_exactly_at_threshold_with_both_audits() {
        let h = harness().await;
        h.auth
            .register(register_cmd("alice", "alice@example.com"))
            .await
            .unwrap();

        for _ in 0..5 {
            let err = h
                .auth
                .login(login_cmd("alice", "wrong-password1"))
                .await
                .unwrap_err();
            assert!(matches!(err, AuthError::InvalidCredentials));
        }

        let account = h.store.account_by_username("alice").await.unwrap();
        assert!(account.locked);
        assert_eq!(account.failed_login_attempts, 5);

        let events = audit_events_for(&h.store, "alice").await;
        let locked = events
            .iter()
            .filter(|e| **e == AuditEventType::AccountLocked)
            .count();
        let failures = events
            .iter()
            .filter(|e| **e == AuditEventType::LoginFailure)
            .count();
        assert_eq!(locked, 1);
        assert_eq!(failures, 5);
    }

    #[tokio::test]
    async fn locked_account_rejects_even_correct_password() {
        let h = harness().await;
        h.auth
            .register(register_cmd("alice", "alice@example.com"))
            .await
            .unwrap();
        for _ in 0..5 {
            let _ = h.auth.login(login_cmd("alice", "wrong-password1")).await;
        }

        let err = h
            .auth
            .login(login_cmd("alice", "s3cret-password"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AccountLocked));

        // 锁定后的尝试不再增长计数,只追加失败审计。
        let account = h.store.account_by_username("alice").await.unwrap();
        assert_eq!(account.failed_login_attempts, 5);
        let failures = audit_events_for(&h.store, "alice")
            .await
            .iter()
            .filter(|e| **e == AuditEventType::LoginFailure)
            .count();
        assert_eq!(failures, 6);
    }

    #[tokio::test]
    async fn lock_audit_is_not_repeated() {
        let h = harness().await;
        h.auth
            .register(register_cmd("alice", "alice@example.com"))
            .await
            .unwrap();
        for _ in 0..8 {
            let _ = h.auth.login(login_cmd("alice", "wrong-password1")).await;
        }

        let locked = audit_events_for(&h.store, "alice")
            .await
            .iter()
            .filter(|e| **e == AuditEventType::AccountLocked)
            .count();
        assert_eq!(locked, 1);
    }

    #[tokio::test]
    async fn successful_login_resets_counter() {
        let h = harness().await;
        h.auth
            .register(register_cmd("alice", "alice@example.com"))
            .await
            .unwrap();
        for _ in 0..3 {
            let _ = h.auth.login(login_cmd("alice", "wrong-password1")).await;
        }

        h.auth
            .login(login_cmd("alice", "s3cret-password"))
            .await
            .unwrap();

        let account = h.store.account_by_username("alice").await.unwrap();
        assert_eq!(account.failed_login_attempts, 0);
        assert!(!account.locked);
    }
}

mod logout {
    use super::*;

    #[tokio::test]
    async fn closes_session_and_audits() {
        let h = harness().await;
        h.auth
            .register(register_cmd("alice", "alice@example.com"))
            .await
            .unwrap();
        let result = h
            .auth
            .login(login_cmd("alice", "s3cret-password"))
            .await
            .unwrap();

        h.auth
            .logout(LogoutCommand {
                token: result.token.clone(),
                ip_address: None,
                user_agent: None,
            })
            .await
            .unwrap();

        let sessions = h.store.sessions().await;
        assert_eq!(sessions.len(), 1);
        assert!(!sessions[0].active);
        assert!(sessions[0].logout_at.is_some());
        assert!(audit_events_for(&h.store, "alice")
            .await
            .contains(&AuditEventType::Logout));
    }

    #[tokio::test]
    async fn rejects_invalid_token() {
        let h = harness().await;
        let err = h
            .auth
            .logout(LogoutCommand {
                token: "bogus".to_string(),
                ip_address: None,
                user_agent: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn repeated_logout_is_idempotent_for_the_session() {
        let h = harness().await;
        h.auth
            .register(register_cmd("alice", "alice@example.com"))
            .await
            .unwrap();
        let result = h
            .auth
            .login(login_cmd("alice", "s3cret-password"))
            .await
            .unwrap();

        let cmd = LogoutCommand {
            token: result.token.clone(),
            ip_address: None,
            user_agent: None,
        };
        h.auth.logout(cmd.clone()).await.unwrap();
        let first_logout_at = h.store.sessions().await[0].logout_at;

        h.auth.logout(cmd).await.unwrap();
        assert_eq!(h.store.sessions().await[0].logout_at, first_logout_at);
    }
}

mod federated {
    use super::*;

    #[tokio::test]
    async fn first_login_provisions_account() {
        let h = harness().await;
        let result = h
            .oauth2
            .login(oauth2_cmd("google", "john.doe@example.com"))
            .await
            .unwrap();

        assert_eq!(result.username, "john.doe");
        let account = h.store.account_by_username("john.doe").await.unwrap();
        assert!(account.email_verified);
        assert!(!account.has_local_credentials());
        assert_eq!(account.oauth2_provider.as_deref(), Some("google"));
        assert_eq!(account.display_name.as_deref(), Some("John Doe"));
        assert_eq!(account.role_names(), vec!["ROLE_USER"]);

        // 联合登录与密码登录一样留下会话与审计。
        assert_eq!(h.store.sessions().await.len(), 1);
        assert!(audit_events_for(&h.store, "john.doe")
            .await
            .contains(&AuditEventType::LoginSuccess));
    }

    #[tokio::test]
    async fn token_subject_is_username_not_email() {
        let h = harness().await;
        let result = h
            .oauth2
            .login(oauth2_cmd("google", "john.doe@example.com"))
            .await
            .unwrap();

        let claims = h.token_service.validate_token(&result.token).unwrap();
        assert_eq!(claims.sub, "john.doe");
    }

    #[tokio::test]
    async fn converges_on_existing_local_account_by_email() {
        let h = harness().await;
        let registered = h
            .auth
            .register(register_cmd("alice", "alice@example.com"))
            .await
            .unwrap();

        let result = h
            .oauth2
            .login(oauth2_cmd("github", "alice@example.com"))
            .await
            .unwrap();

        assert_eq!(result.account_id, registered.id);
        assert_eq!(result.username, "alice");
        // 本地凭证保持可用。
        h.auth
            .login(login_cmd("alice", "s3cret-password"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn repeated_federated_logins_hit_the_same_account() {
        let h = harness().await;
        let first = h
            .oauth2
            .login(oauth2_cmd("google", "john.doe@example.com"))
            .await
            .unwrap();
        let second = h
            .oauth2
            .login(oauth2_cmd("github", "john.doe@example.com"))
            .await
            .unwrap();

        assert_eq!(first.account_id, second.account_id);
        assert_eq!(h.store.sessions().await.len(), 2);
    }

    #[tokio::test]
    async fn provisions_even_when_local_part_is_too_short_for_a_username() {
        let h = harness().await;
        let result = h.oauth2.login(oauth2_cmd("google", "ab@x.com")).await.unwrap();

        assert_eq!(result.username, "user-ab");
        assert_eq!(result.email, "ab@x.com");
        assert!(h.store.account_by_username("user-ab").await.is_some());
    }

    #[tokio::test]
    async fn provisions_by_stripping_characters_a_username_cannot_carry() {
        let h = harness().await;
        let result = h
            .oauth2
            .login(oauth2_cmd("google", "jane+shop@x.com"))
            .await
            .unwrap();

        assert_eq!(result.username, "janeshop");
        let account = h.store.account_by_username("janeshop").await.unwrap();
        assert_eq!(account.email.as_str(), "jane+shop@x.com");
    }

    #[tokio::test]
    async fn same_local_part_different_email_gets_a_suffixed_username() {
        let h = harness().await;
        let first = h.oauth2.login(oauth2_cmd("google", "bob@one.com")).await.unwrap();
        let second = h.oauth2.login(oauth2_cmd("github", "bob@two.com")).await.unwrap();

        assert_eq!(first.username, "bob");
        assert_eq!(second.username, "bob-2");
        assert_ne!(first.account_id, second.account_id);
    }

    #[tokio::test]
    async fn locked_account_cannot_enter_via_federation() {
        let h = harness().await;
        h.auth
            .register(register_cmd("alice", "alice@example.com"))
            .await
            .unwrap();
        for _ in 0..5 {
            let _ = h.auth.login(login_cmd("alice", "wrong-password1")).await;
        }
        let failures_before = audit_events_for(&h.store, "alice")
            .await
            .iter()
            .filter(|e| **e == AuditEventType::LoginFailure)
            .count();

        let err = h
            .oauth2
            .login(oauth2_cmd("google", "alice@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AccountLocked));

        // 被拒的联合登录与密码登录一样留下失败审计。
        let failures_after = audit_events_for(&h.store, "alice")
            .await
            .iter()
            .filter(|e| **e == AuditEventType::LoginFailure)
            .count();
        assert_eq!(failures_after, failures_before + 1);
    }

    #[tokio::test]
    async fn inactive_account_rejection_is_audited() {
        let h = harness().await;
        h.auth
            .register(register_cmd("alice", "alice@example.com"))
            .await
            .unwrap();
        let mut account = h.store.account_by_username("alice").await.unwrap();
        account.active = false;
        AccountRepository::save(&h.store, &account).await.unwrap();

        let err = h
            .oauth2
            .login(oauth2_cmd("google", "alice@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AccountInactive));
        assert!(audit_events_for(&h.store, "alice")
            .await
            .contains(&AuditEventType::LoginFailure));
    }
}

mod notifications {
    use super::*;

    async fn wait_for_events(bus: &InMemoryLoginEventBus, n: usize) -> Vec<LoginEvent> {
        for _ in 0..100 {
            let events = bus.events().await;
            if events.len() >= n {
                return events;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        bus.events().await
    }

    #[tokio::test]
    async fn login_and_logout_publish_events() {
        let bus = Arc::new(InMemoryLoginEventBus::new());
        let h = harness_with(bus.clone(), None).await;
        h.auth
            .register(register_cmd("alice", "alice@example.com"))
            .await
            .unwrap();

        let result = h
            .auth
            .login(login_cmd("alice", "s3cret-password"))
            .await
            .unwrap();
        let events = wait_for_events(&bus, 1).await;
        assert_eq!(events[0].event_type, LoginEventType::LoginSuccess);
        assert_eq!(events[0].username, "alice");
        assert_eq!(events[0].ip_address.as_deref(), Some("203.0.113.7"));

        h.auth
            .logout(LogoutCommand {
                token: result.token,
                ip_address: None,
                user_agent: None,
            })
            .await
            .unwrap();
        let events = wait_for_events(&bus, 2).await;
        assert!(events
            .iter()
            .any(|e| e.event_type == LoginEventType::Logout));
    }

    #[tokio::test]
    async fn login_sends_notification_email() {
        let sender = Arc::new(TestEmailSender::default());
        let bus = Arc::new(InMemoryLoginEventBus::new());
        let h = harness_with(bus, Some(sender.clone())).await;
        h.auth
            .register(register_cmd("alice", "alice@example.com"))
            .await
            .unwrap();
        h.auth
            .login(login_cmd("alice", "s3cret-password"))
            .await
            .unwrap();

        let mut sent = sender.sent.lock().await.clone();
        for _ in 0..100 {
            if !sent.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            sent = sender.sent.lock().await.clone();
        }
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "alice@example.com");
        assert_eq!(sent[0].1, "New login to your account");
    }

    #[tokio::test]
    async fn failing_notification_channels_do_not_affect_login() {
        let h = harness_with(
            Arc::new(FailingEventPublisher),
            Some(Arc::new(TestEmailSender::failing())),
        )
        .await;
        h.auth
            .register(register_cmd("alice", "alice@example.com"))
            .await
            .unwrap();

        let result = h.auth.login(login_cmd("alice", "s3cret-password")).await;
        assert!(result.is_ok());

        tokio::time::sleep(Duration::from_millis(50)).await;
        let account = h.store.account_by_username("alice").await.unwrap();
        assert!(account.last_login_at.is_some());
        assert_eq!(h.store.sessions().await.len(), 1);
    }
}
