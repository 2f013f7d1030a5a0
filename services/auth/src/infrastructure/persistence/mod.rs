//! 持久化实现。

pub mod in_memory;
pub mod postgres;
mod queries;
pub mod unit_of_work;

pub use in_memory::{InMemoryStore, InMemoryUnitOfWorkFactory};
pub use postgres::{
    PostgresAccountRepository, PostgresAuditLogRepository, PostgresLoginAttemptStore,
    PostgresRoleRepository, PostgresSessionRepository,
};
pub use unit_of_work::PostgresUnitOfWorkFactory;
