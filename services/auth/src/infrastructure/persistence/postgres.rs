//! 连接池级别的 Postgres 仓储。
//!
//! 每个方法从池里取一条连接执行,自动提交。需要跨写入原子性的
//! 场景使用 [`super::unit_of_work::PostgresUnitOfWorkFactory`]。

use async_trait::async_trait;
use janua_common::{AccountId, Pagination};
use janua_errors::{AppError, AppResult};
use sqlx::PgPool;

use crate::domain::{
    Account, AccountRepository, AuditLogRepository, AuditRecord, FailedAttemptOutcome,
    LoginAttemptStore, Role, RoleName, RoleRepository, Session, SessionRepository,
};

use super::queries;

fn acquire_err(err: sqlx::Error) -> AppError {
    AppError::database(format!("Failed to acquire connection: {err}"))
}

pub struct PostgresAccountRepository {
    pool: PgPool,
}

impl PostgresAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepository for PostgresAccountRepository {
    async fn find_by_id(&self, id: &AccountId) -> AppResult<Option<Account>> {
        let mut conn = self.pool.acquire().await.map_err(acquire_err)?;
        queries::account_by_id(&mut conn, id).await
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<Account>> {
        let mut conn = self.pool.acquire().await.map_err(acquire_err)?;
        queries::account_by_username(&mut conn, username).await
    }

    async fn find_by_username_or_email(&self, identifier: &str) -> AppResult<Option<Account>> {
        let mut conn = self.pool.acquire().await.map_err(acquire_err)?;
        queries::account_by_username_or_email(&mut conn, identifier).await
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        let mut conn = self.pool.acquire().await.map_err(acquire_err)?;
        queries::account_by_email(&mut conn, email).await
    }

    async fn exists_by_username(&self, username: &str) -> AppResult<bool> {
        let mut conn = self.pool.acquire().await.map_err(acquire_err)?;
        queries::account_exists_by_username(&mut conn, username).await
    }

    async fn exists_by_email(&self, email: &str) -> AppResult<bool> {
        let mut conn = self.pool.acquire().await.map_err(acquire_err)?;
        queries::account_exists_by_email(&mut conn, email).await
    }

    async fn insert(&self, account: &Account) -> AppResult<()> {
        let mut conn = self.pool.acquire().await.map_err(acquire_err)?;
        queries::insert_account(&mut conn, account).await
    }

    async fn save(&self, account: &Account) -> AppResult<()> {
        let mut conn = self.pool.acquire().await.map_err(acquire_err)?;
        queries::update_account(&mut conn, account).await
    }
}

/// 失败计数器的 Postgres 实现。
///
/// 刻意不走工作单元:计数更新在自己的连接上立即提交,调用方的
/// 登录请求失败返回也不会把它回滚掉。
pub struct PostgresLoginAttemptStore {
    pool: PgPool,
}

impl PostgresLoginAttemptStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoginAttemptStore for PostgresLoginAttemptStore {
    async fn record_failed_attempt(
        &self,
        account_id: &AccountId,
        threshold: i32,
    ) -> AppResult<FailedAttemptOutcome> {
        let mut conn = self.pool.acquire().await.map_err(acquire_err)?;
        queries::record_failed_attempt(&mut conn, account_id, threshold).await
    }
}

pub struct PostgresRoleRepository {
    pool: PgPool,
}

impl PostgresRoleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleRepository for PostgresRoleRepository {
    async fn find_by_name(&self, name: &RoleName) -> AppResult<Option<Role>> {
        let mut conn = self.pool.acquire().await.map_err(acquire_err)?;
        queries::role_by_name(&mut conn, name).await
    }
}

pub struct PostgresSessionRepository {
    pool: PgPool,
}

impl PostgresSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PostgresSessionRepository {
    async fn insert(&self, session: &Session) -> AppResult<()> {
        let mut conn = self.pool.acquire().await.map_err(acquire_err)?;
        queries::insert_session(&mut conn, session).await
    }

    async fn find_by_token(&self, token: &str) -> AppResult<Option<Session>> {
        let mut conn = self.pool.acquire().await.map_err(acquire_err)?;
        queries::session_by_token(&mut conn, token).await
    }

    async fn save(&self, session: &Session) -> AppResult<()> {
        let mut conn = self.pool.acquire().await.map_err(acquire_err)?;
        queries::update_session(&mut conn, session).await
    }
}

pub struct PostgresAuditLogRepository {
    pool: PgPool,
}

impl PostgresAuditLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditLogRepository for PostgresAuditLogRepository {
    async fn insert(&self, record: &AuditRecord) -> AppResult<()> {
        let mut conn = self.pool.acquire().await.map_err(acquire_err)?;
        queries::insert_audit_record(&mut conn, record).await
    }

    async fn find_by_username(
        &self,
        username: &str,
        pagination: &Pagination,
    ) -> AppResult<Vec<AuditRecord>> {
        let mut conn = self.pool.acquire().await.map_err(acquire_err)?;
        queries::audit_records_by_username(&mut conn, username, pagination).await
    }
}
