//! Postgres 工作单元。
//!
//! 事务句柄放在 `Arc<Mutex<Option<_>>>` 里,事务内的各个仓储共享
//! 同一个事务;`commit`/`rollback` 把事务从 Option 里取走,之后的
//! 任何访问都会得到明确的错误而不是悄悄落在新连接上。

use std::sync::Arc;

use async_trait::async_trait;
use janua_common::{AccountId, Pagination};
use janua_errors::{AppError, AppResult};
use sqlx::{PgPool, Postgres, Transaction};
use tokio::sync::Mutex;

use crate::domain::{
    Account, AccountRepository, AuditLogRepository, AuditRecord, Session, SessionRepository,
    UnitOfWork, UnitOfWorkFactory,
};

use super::queries;

type SharedTx = Arc<Mutex<Option<Transaction<'static, Postgres>>>>;

fn completed_err() -> AppError {
    AppError::database("Transaction already completed")
}

macro_rules! define_tx_repo {
    ($name:ident) => {
        pub(crate) struct $name {
            tx: SharedTx,
        }

        impl $name {
            fn new(tx: SharedTx) -> Self {
                Self { tx }
            }
        }
    };
}

define_tx_repo!(TxAccountRepository);
define_tx_repo!(TxSessionRepository);
define_tx_repo!(TxAuditLogRepository);

#[async_trait]
impl AccountRepository for TxAccountRepository {
    async fn find_by_id(&self, id: &AccountId) -> AppResult<Option<Account>> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(completed_err)?;
        queries::account_by_id(&mut **tx, id).await
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<Account>> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(completed_err)?;
        queries::account_by_username(&mut **tx, username).await
    }

    async fn find_by_username_or_email(&self, identifier: &str) -> AppResult<Option<Account>> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(completed_err)?;
        queries::account_by_username_or_email(&mut **tx, identifier).await
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(completed_err)?;
        queries::account_by_email(&mut **tx, email).await
    }

    async fn exists_by_username(&self, username: &str) -> AppResult<bool> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(completed_err)?;
        queries::account_exists_by_username(&mut **tx, username).await
    }

    async fn exists_by_email(&self, email: &str) -> AppResult<bool> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(completed_err)?;
        queries::account_exists_by_email(&mut **tx, email).await
    }

    async fn insert(&self, account: &Account) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(completed_err)?;
        queries::insert_account(&mut **tx, account).await
    }

    async fn save(&self, account: &Account) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(completed_err)?;
        queries::update_account(&mut **tx, account).await
    }
}

#[async_trait]
impl SessionRepository for TxSessionRepository {
    async fn insert(&self, session: &Session) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(completed_err)?;
        queries::insert_session(&mut **tx, session).await
    }

    async fn find_by_token(&self, token: &str) -> AppResult<Option<Session>> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(completed_err)?;
        queries::session_by_token(&mut **tx, token).await
    }

    async fn save(&self, session: &Session) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(completed_err)?;
        queries::update_session(&mut **tx, session).await
    }
}

#[async_trait]
impl AuditLogRepository for TxAuditLogRepository {
    async fn insert(&self, record: &AuditRecord) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(completed_err)?;
        queries::insert_audit_record(&mut **tx, record).await
    }

    async fn find_by_username(
        &self,
        username: &str,
        pagination: &Pagination,
    ) -> AppResult<Vec<AuditRecord>> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(completed_err)?;
        queries::audit_records_by_username(&mut **tx, username, pagination).await
    }
}

pub struct PostgresUnitOfWork {
    tx: SharedTx,
    accounts: TxAccountRepository,
    sessions: TxSessionRepository,
    audit_records: TxAuditLogRepository,
}

impl PostgresUnitOfWork {
    fn new(tx: Transaction<'static, Postgres>) -> Self {
        let tx: SharedTx = Arc::new(Mutex::new(Some(tx)));
        Self {
            accounts: TxAccountRepository::new(Arc::clone(&tx)),
            sessions: TxSessionRepository::new(Arc::clone(&tx)),
            audit_records: TxAuditLogRepository::new(Arc::clone(&tx)),
            tx,
        }
    }
}

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    fn accounts(&self) -> &dyn AccountRepository {
        &self.accounts
    }

    fn sessions(&self) -> &dyn SessionRepository {
        &self.sessions
    }

    fn audit_records(&self) -> &dyn AuditLogRepository {
        &self.audit_records
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let tx = self.tx.lock().await.take().ok_or_else(completed_err)?;
        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit transaction: {e}")))
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        let tx = self.tx.lock().await.take().ok_or_else(completed_err)?;
        tx.rollback()
            .await
            .map_err(|e| AppError::database(format!("Failed to roll back transaction: {e}")))
    }
}

pub struct PostgresUnitOfWorkFactory {
    pool: PgPool,
}

impl PostgresUnitOfWorkFactory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UnitOfWorkFactory for PostgresUnitOfWorkFactory {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {e}")))?;
        Ok(Box::new(PostgresUnitOfWork::new(tx)))
    }
}
