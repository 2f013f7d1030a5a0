//! Kafka 适配器
//!
//! 提供消息发布功能

mod producer;

pub use producer::{KafkaEventPublisher, KafkaProducerConfig};
