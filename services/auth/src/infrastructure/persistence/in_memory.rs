//! 测试用的内存持久化。
//!
//! 所有仓储共享同一份 `Arc<Mutex<_>>` 状态,行为对齐 Postgres 实现:
//! 唯一约束冲突返回 Conflict,失败计数的更新立即可见。工作单元的
//! 提交是空操作,写入在调用时即生效,这对用例测试已经足够。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use janua_common::{AccountId, Pagination};
use janua_errors::{AppError, AppResult};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{
    Account, AccountRepository, AuditLogRepository, AuditRecord, FailedAttemptOutcome,
    LoginAttemptStore, Role, RoleName, RoleRepository, Session, SessionId, SessionRepository,
    UnitOfWork, UnitOfWorkFactory,
};

#[derive(Default)]
struct State {
    accounts: HashMap<Uuid, Account>,
    sessions: HashMap<SessionId, Session>,
    audit: Vec<AuditRecord>,
    roles: HashMap<&'static str, Role>,
}

/// 内存存储。克隆共享同一份状态。
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    /// 空存储,不带任何角色。
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置了内置角色的存储,对应迁移脚本里的播种数据。
    pub async fn with_seeded_roles() -> Self {
        let store = Self::new();
        {
            let mut state = store.state.lock().await;
            state
                .roles
                .insert(RoleName::User.as_str(), Role::new(RoleName::User));
            state
                .roles
                .insert(RoleName::Admin.as_str(), Role::new(RoleName::Admin));
        }
        store
    }

    pub async fn audit_records(&self) -> Vec<AuditRecord> {
        self.state.lock().await.audit.clone()
    }

    pub async fn account_by_username(&self, username: &str) -> Option<Account> {
        self.state
            .lock()
            .await
            .accounts
            .values()
            .find(|a| a.username.as_str() == username)
            .cloned()
    }

    pub async fn sessions(&self) -> Vec<Session> {
        self.state.lock().await.sessions.values().cloned().collect()
    }
}

#[async_trait]
impl AccountRepository for InMemoryStore {
    async fn find_by_id(&self, id: &AccountId) -> AppResult<Option<Account>> {
        Ok(self.state.lock().await.accounts.get(&id.0).cloned())
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<Account>> {
        Ok(self
            .state
            .lock()
            .await
            .accounts
            .values()
            .find(|a| a.username.as_str() == username)
            .cloned())
    }

    async fn find_by_username_or_email(&self, identifier: &str) -> AppResult<Option<Account>> {
        Ok(self
            .state
            .lock()
            .await
            .accounts
            .values()
            .find(|a| a.username.as_str() == identifier || a.email.as_str() == identifier)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        Ok(self
            .state
            .lock()
            .await
            .accounts
            .values()
            .find(|a| a.email.as_str() == email)
            .cloned())
    }

    async fn exists_by_username(&self, username: &str) -> AppResult<bool> {
        Ok(AccountRepository::find_by_username(self, username)
            .await?
            .is_some())
    }

    async fn exists_by_email(&self, email: &str) -> AppResult<bool> {
        Ok(self.find_by_email(email).await?.is_some())
    }

    async fn insert(&self, account: &Account) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let duplicate = state.accounts.values().any(|a| {
            a.username.as_str() == account.username.as_str()
                || a.email.as_str() == account.email.as_str()
        });
        if duplicate || state.accounts.contains_key(&account.id.0) {
            return Err(AppError::conflict("Unique constraint violated"));
        }
        state.accounts.insert(account.id.0, account.clone());
        Ok(())
    }

    async fn save(&self, account: &Account) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if !state.accounts.contains_key(&account.id.0) {
            return Err(AppError::not_found(format!(
                "Account {} not found",
                account.id
            )));
        }
        state.accounts.insert(account.id.0, account.clone());
        Ok(())
    }
}

#[async_trait]
impl LoginAttemptStore for InMemoryStore {
    async fn record_failed_attempt(
        &self,
        account_id: &AccountId,
        threshold: i32,
    ) -> AppResult<FailedAttemptOutcome> {
        let mut state = self.state.lock().await;
        let account = state
            .accounts
            .get_mut(&account_id.0)
            .ok_or_else(|| AppError::not_found(format!("Account {account_id} not found")))?;

        let locked_now = account.record_failed_attempt(threshold);
        Ok(FailedAttemptOutcome {
            attempts: account.failed_login_attempts,
            locked: account.locked,
            locked_now,
        })
    }
}

#[async_trait]
impl RoleRepository for InMemoryStore {
    async fn find_by_name(&self, name: &RoleName) -> AppResult<Option<Role>> {
        Ok(self.state.lock().await.roles.get(name.as_str()).cloned())
    }
}

#[async_trait]
impl SessionRepository for InMemoryStore {
    async fn insert(&self, session: &Session) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if state.sessions.values().any(|s| s.token == session.token) {
            return Err(AppError::conflict("Unique constraint violated"));
        }
        state.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> AppResult<Option<Session>> {
        Ok(self
            .state
            .lock()
            .await
            .sessions
            .values()
            .find(|s| s.token == token)
            .cloned())
    }

    async fn save(&self, session: &Session) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if !state.sessions.contains_key(&session.id) {
            return Err(AppError::not_found(format!(
                "Session {} not found",
                session.id
            )));
        }
        state.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }
}

#[async_trait]
impl AuditLogRepository for InMemoryStore {
    async fn insert(&self, record: &AuditRecord) -> AppResult<()> {
        self.state.lock().await.audit.push(record.clone());
        Ok(())
    }

    async fn find_by_username(
        &self,
        username: &str,
        pagination: &Pagination,
    ) -> AppResult<Vec<AuditRecord>> {
        let state = self.state.lock().await;
        let mut records: Vec<_> = state
            .audit
            .iter()
            .filter(|r| r.username == username)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records
            .into_iter()
            .skip(pagination.offset() as usize)
            .take(pagination.page_size as usize)
            .collect())
    }
}

/// 内存工作单元。写入立即生效,提交与回滚都是空操作。
pub struct InMemoryUnitOfWork {
    store: InMemoryStore,
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    fn accounts(&self) -> &dyn AccountRepository {
        &self.store
    }

    fn sessions(&self) -> &dyn SessionRepository {
        &self.store
    }

    fn audit_records(&self) -> &dyn AuditLogRepository {
        &self.store
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        Ok(())
    }
}

pub struct InMemoryUnitOfWorkFactory {
    store: InMemoryStore,
}

impl InMemoryUnitOfWorkFactory {
    pub fn new(store: InMemoryStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl UnitOfWorkFactory for InMemoryUnitOfWorkFactory {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        Ok(Box::new(InMemoryUnitOfWork {
            store: self.store.clone(),
        }))
    }
}
