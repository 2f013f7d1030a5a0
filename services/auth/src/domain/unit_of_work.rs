//! 工作单元。
//!
//! 登录成功路径上的三次写入(账户状态、会话、审计)必须同生共死,
//! 工作单元把它们收进同一个数据库事务。

use async_trait::async_trait;
use janua_errors::AppResult;

use super::repositories::{AccountRepository, AuditLogRepository, SessionRepository};

/// 一个进行中的事务,到期要么整体提交,要么整体回滚。
///
/// `commit`/`rollback` 消费 `Box<Self>`,类型系统保证事务结束后
/// 不会再有代码拿着仓储句柄写入。
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    fn accounts(&self) -> &dyn AccountRepository;
    fn sessions(&self) -> &dyn SessionRepository;
    fn audit_records(&self) -> &dyn AuditLogRepository;

    async fn commit(self: Box<Self>) -> AppResult<()>;
    async fn rollback(self: Box<Self>) -> AppResult<()>;
}

/// 工作单元工厂。
#[async_trait]
pub trait UnitOfWorkFactory: Send + Sync {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>>;
}
