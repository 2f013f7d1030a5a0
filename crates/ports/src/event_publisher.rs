//! Event Publisher trait 定义

use async_trait::async_trait;
use janua_errors::AppResult;
use serde::Serialize;

/// 事件发布者 trait
///
/// 传输层实现（如 Kafka）只负责投递，不保证重试。
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// 发布事件
    async fn publish<E: Serialize + Send + Sync>(&self, topic: &str, event: &E) -> AppResult<()>;

    /// 发布带分区键的事件，同一 key 的事件保持有序
    async fn publish_with_key<E: Serialize + Send + Sync>(
        &self,
        topic: &str,
        key: &str,
        event: &E,
    ) -> AppResult<()>;
}
