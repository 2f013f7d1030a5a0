//! Kafka Producer
//!
//! 提供消息发布功能

use std::time::Duration;

use async_trait::async_trait;
use janua_errors::{AppError, AppResult};
use janua_ports::EventPublisher;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use serde::Serialize;
use tracing::debug;

/// Kafka Producer 配置
#[derive(Debug, Clone)]
pub struct KafkaProducerConfig {
    pub brokers: String,
    pub client_id: Option<String>,
    /// 单次投递超时
    pub request_timeout: Duration,
}

impl KafkaProducerConfig {
    pub fn new(brokers: impl Into<String>) -> Self {
        Self {
            brokers: brokers.into(),
            client_id: None,
            request_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Kafka Event Publisher
pub struct KafkaEventPublisher {
    producer: FutureProducer,
    timeout: Duration,
}

impl KafkaEventPublisher {
    pub fn new(config: &KafkaProducerConfig) -> AppResult<Self> {
        let mut client_config = ClientConfig::new();
        client_config.set("bootstrap.servers", &config.brokers);
        client_config.set(
            "message.timeout.ms",
            config.request_timeout.as_millis().to_string(),
        );

        if let Some(client_id) = &config.client_id {
            client_config.set("client.id", client_id);
        }

        let producer: FutureProducer = client_config
            .create()
            .map_err(|e| AppError::internal(format!("Failed to create Kafka producer: {}", e)))?;

        Ok(Self {
            producer,
            timeout: config.request_timeout,
        })
    }

    /// 从 broker 地址创建
    pub fn from_brokers(brokers: &str) -> AppResult<Self> {
        Self::new(&KafkaProducerConfig::new(brokers))
    }

    fn serialize<E: Serialize>(event: &E) -> AppResult<String> {
        serde_json::to_string(event)
            .map_err(|e| AppError::internal(format!("Failed to serialize event: {}", e)))
    }
}

#[async_trait]
impl EventPublisher for KafkaEventPublisher {
    async fn publish<E: Serialize + Send + Sync>(&self, topic: &str, event: &E) -> AppResult<()> {
        let payload = Self::serialize(event)?;
        let record: FutureRecord<'_, str, str> = FutureRecord::to(topic).payload(&payload);

        self.producer
            .send(record, Timeout::After(self.timeout))
            .await
            .map_err(|(e, _)| {
                AppError::external_service(format!("Failed to publish event: {}", e))
            })?;

        debug!(topic = topic, "Message published");

        Ok(())
    }

    async fn publish_with_key<E: Serialize + Send + Sync>(
        &self,
        topic: &str,
        key: &str,
        event: &E,
    ) -> AppResult<()> {
        let payload = Self::serialize(event)?;
        let record = FutureRecord::to(topic).payload(&payload).key(key);

        let (partition, offset) = self
            .producer
            .send(record, Timeout::After(self.timeout))
            .await
            .map_err(|(e, _)| {
                AppError::external_service(format!("Failed to publish event: {}", e))
            })?;

        debug!(
            topic = topic,
            key = key,
            partition = partition,
            offset = offset,
            "Message published with key"
        );

        Ok(())
    }
}
