//! 认证领域模型。

pub mod account;
pub mod audit;
pub mod repositories;
pub mod role;
pub mod session;
pub mod unit_of_work;
pub mod value_objects;

pub use account::Account;
pub use audit::{AuditEventType, AuditRecord, AuditRecordId};
pub use repositories::{
    AccountRepository, AuditLogRepository, FailedAttemptOutcome, LoginAttemptStore,
    RoleRepository, SessionRepository,
};
pub use role::{Role, RoleId, RoleName};
pub use session::{Session, SessionId};
pub use unit_of_work::{UnitOfWork, UnitOfWorkFactory};
pub use value_objects::{Email, HashedPassword, Username};
