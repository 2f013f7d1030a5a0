//! 基础设施层:持久化、事件发布与通知分发。

pub mod events;
pub mod notification;
pub mod persistence;
