//! PostgreSQL 适配器
//!
//! 提供连接池构建和健康检查

mod connection;

pub use connection::*;
