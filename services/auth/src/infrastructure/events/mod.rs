//! 登录事件的发布。
//!
//! 登录、注销等事件以 fire-and-forget 的方式广播到 Kafka,供
//! 下游(风控、统计)消费。发布失败只记日志,不影响认证结果。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use janua_adapter_kafka::KafkaEventPublisher;
use janua_errors::AppResult;
use janua_ports::EventPublisher;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::domain::Account;

/// 登录事件类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoginEventType {
    LoginSuccess,
    Logout,
}

/// 广播到事件总线的登录事件。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginEvent {
    pub event_id: Uuid,
    pub event_type: LoginEventType,
    pub account_id: Uuid,
    pub username: String,
    pub email: String,
    pub event_time: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl LoginEvent {
    fn from_account(
        event_type: LoginEventType,
        account: &Account,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type,
            account_id: account.id.0,
            username: account.username.as_str().to_string(),
            email: account.email.as_str().to_string(),
            event_time: Utc::now(),
            ip_address: ip_address.map(str::to_string),
            user_agent: user_agent.map(str::to_string),
        }
    }

    pub fn login_success(
        account: &Account,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Self {
        Self::from_account(LoginEventType::LoginSuccess, account, ip_address, user_agent)
    }

    pub fn logout(account: &Account, ip_address: Option<&str>, user_agent: Option<&str>) -> Self {
        Self::from_account(LoginEventType::Logout, account, ip_address, user_agent)
    }
}

/// 登录事件发布端口。
#[async_trait]
pub trait LoginEventPublisher: Send + Sync {
    async fn publish(&self, event: &LoginEvent) -> AppResult<()>;
}

/// 走 [`EventPublisher`] 端口的实现,生产环境绑定 Kafka。
/// 以用户名为分区键,同一用户的事件保持有序。
pub struct KafkaLoginEventPublisher<P: EventPublisher = KafkaEventPublisher> {
    publisher: P,
    topic: String,
}

impl<P: EventPublisher> KafkaLoginEventPublisher<P> {
    pub fn new(publisher: P, topic: impl Into<String>) -> Self {
        Self {
            publisher,
            topic: topic.into(),
        }
    }
}

#[async_trait]
impl<P: EventPublisher> LoginEventPublisher for KafkaLoginEventPublisher<P> {
    async fn publish(&self, event: &LoginEvent) -> AppResult<()> {
        self.publisher
            .publish_with_key(&self.topic, &event.username, event)
            .await
    }
}

/// 未配置 Kafka 时的空实现。
pub struct NoOpLoginEventPublisher;

#[async_trait]
impl LoginEventPublisher for NoOpLoginEventPublisher {
    async fn publish(&self, event: &LoginEvent) -> AppResult<()> {
        debug!(event_type = ?event.event_type, username = %event.username, "Event publishing disabled, dropping event");
        Ok(())
    }
}

/// 测试用的内存事件总线。
#[derive(Default)]
pub struct InMemoryLoginEventBus {
    events: RwLock<Vec<LoginEvent>>,
}

impl InMemoryLoginEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<LoginEvent> {
        self.events.read().await.clone()
    }
}

#[async_trait]
impl LoginEventPublisher for InMemoryLoginEventBus {
    async fn publish(&self, event: &LoginEvent) -> AppResult<()> {
        self.events.write().await.push(event.clone());
        Ok(())
    }
}
