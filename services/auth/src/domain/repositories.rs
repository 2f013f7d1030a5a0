//! 持久化端口。
//!
//! 领域层只依赖这些 trait,具体实现位于 infrastructure 层
//! (Postgres 实现与测试用的内存实现)。

use async_trait::async_trait;
use janua_common::{AccountId, Pagination};
use janua_errors::AppResult;

use super::account::Account;
use super::audit::AuditRecord;
use super::role::{Role, RoleName};
use super::session::Session;

/// 账户仓储。
#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn find_by_id(&self, id: &AccountId) -> AppResult<Option<Account>>;
    async fn find_by_username(&self, username: &str) -> AppResult<Option<Account>>;
    /// 同时匹配用户名与邮箱,登录入口允许两种标识符。
    async fn find_by_username_or_email(&self, identifier: &str) -> AppResult<Option<Account>>;
    async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>>;
    async fn exists_by_username(&self, username: &str) -> AppResult<bool>;
    async fn exists_by_email(&self, email: &str) -> AppResult<bool>;
    async fn insert(&self, account: &Account) -> AppResult<()>;
    async fn save(&self, account: &Account) -> AppResult<()>;
}

/// 一次失败登录记账的结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailedAttemptOutcome {
    /// 累计失败次数(本次计入后)。
    pub attempts: i32,
    /// 账户当前是否处于锁定状态。
    pub locked: bool,
    /// 本次记账是否触发了锁定。
    pub locked_now: bool,
}

/// 失败登录计数器。
///
/// 实现必须让每次记账立即独立持久化:失败计数与锁定状态属于
/// 安全状态,不能因调用方所在事务回滚而丢失。Postgres 实现用
/// 一条原子 UPDATE 在连接池上直接完成。
#[async_trait]
pub trait LoginAttemptStore: Send + Sync {
    async fn record_failed_attempt(
        &self,
        account_id: &AccountId,
        threshold: i32,
    ) -> AppResult<FailedAttemptOutcome>;
}

/// 角色仓储。角色是播种数据,只读。
#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn find_by_name(&self, name: &RoleName) -> AppResult<Option<Role>>;
}

/// 会话仓储。
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn insert(&self, session: &Session) -> AppResult<()>;
    async fn find_by_token(&self, token: &str) -> AppResult<Option<Session>>;
    async fn save(&self, session: &Session) -> AppResult<()>;
}

/// 审计日志仓储。只追加,没有更新与删除。
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    async fn insert(&self, record: &AuditRecord) -> AppResult<()>;
    async fn find_by_username(
        &self,
        username: &str,
        pagination: &Pagination,
    ) -> AppResult<Vec<AuditRecord>>;
}
