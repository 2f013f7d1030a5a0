//! 服务装配。

use std::sync::Arc;
use std::time::Duration;

use janua_adapter_email::{EmailClient, EmailSender, EmailTemplate};
use janua_adapter_kafka::KafkaEventPublisher;
use janua_auth_core::TokenService;
use janua_config::AppConfig;
use janua_errors::AppResult;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use tracing::info;

use crate::application::{AuthService, OAuth2Service};
use crate::infrastructure::events::{
    KafkaLoginEventPublisher, LoginEventPublisher, NoOpLoginEventPublisher,
};
use crate::infrastructure::notification::NotificationDispatcher;
use crate::infrastructure::persistence::{
    PostgresAccountRepository, PostgresAuditLogRepository, PostgresLoginAttemptStore,
    PostgresRoleRepository, PostgresSessionRepository, PostgresUnitOfWorkFactory,
};

/// 装配完成的认证引擎。
pub struct AuthEngine {
    pub auth: Arc<AuthService>,
    pub oauth2: Arc<OAuth2Service>,
}

/// 按配置装配认证引擎。
///
/// Kafka 或邮件配置缺省时,对应的通知通道降级为禁用,认证流程
/// 本身不受影响。
pub fn build_engine(config: &AppConfig, pool: PgPool) -> AppResult<AuthEngine> {
    let token_service = Arc::new(TokenService::new(
        config.jwt.secret.expose_secret(),
        config.jwt.expires_in as i64,
        config.jwt.issuer.clone(),
    ));

    let events: Arc<dyn LoginEventPublisher> = match &config.kafka {
        Some(kafka) => {
            info!(brokers = %kafka.brokers, topic = %kafka.login_events_topic, "Kafka event publishing enabled");
            Arc::new(KafkaLoginEventPublisher::new(
                KafkaEventPublisher::from_brokers(&kafka.brokers)?,
                kafka.login_events_topic.clone(),
            ))
        }
        None => {
            info!("Kafka not configured, event publishing disabled");
            Arc::new(NoOpLoginEventPublisher)
        }
    };

    let email: Option<Arc<dyn EmailSender>> = match &config.email {
        Some(email_config) => {
            info!(smtp_host = %email_config.smtp_host, "Email notifications enabled");
            Some(Arc::new(EmailClient::new(email_config.clone())))
        }
        None => {
            info!("Email not configured, login notifications disabled");
            None
        }
    };

    let dispatcher = Arc::new(NotificationDispatcher::new(
        email,
        Arc::new(EmailTemplate::builtin()?),
        events,
        Duration::from_secs(config.security.dispatch_timeout_secs),
    ));

    let uow_factory = Arc::new(PostgresUnitOfWorkFactory::new(pool.clone()));
    let accounts = Arc::new(PostgresAccountRepository::new(pool.clone()));
    let roles = Arc::new(PostgresRoleRepository::new(pool.clone()));
    let sessions = Arc::new(PostgresSessionRepository::new(pool.clone()));
    let attempts = Arc::new(PostgresLoginAttemptStore::new(pool.clone()));
    let audit = Arc::new(PostgresAuditLogRepository::new(pool));

    let auth = Arc::new(AuthService::new(
        uow_factory.clone(),
        accounts.clone(),
        roles.clone(),
        sessions,
        attempts,
        audit.clone(),
        token_service.clone(),
        dispatcher.clone(),
        config.security.clone(),
    ));

    let oauth2 = Arc::new(OAuth2Service::new(
        uow_factory,
        accounts,
        roles,
        audit,
        token_service,
        dispatcher,
    ));

    Ok(AuthEngine { auth, oauth2 })
}
