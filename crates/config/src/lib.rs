//! janua-config - 配置加载库

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use thiserror::Error;

use secrecy::Secret;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] figment::Error),
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    match std::env::var("APP_ENV").as_deref() {
        Ok("production") => 50,
        _ => 10,
    }
}

/// Kafka 配置
#[derive(Debug, Clone, Deserialize)]
pub struct KafkaConfig {
    pub brokers: String,
    #[serde(default = "default_login_events_topic")]
    pub login_events_topic: String,
}

fn default_login_events_topic() -> String {
    "auth.login-events".to_string()
}

/// JWT 配置
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: Secret<String>,
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
    #[serde(default = "default_issuer")]
    pub issuer: String,
}

fn default_expires_in() -> u64 {
    3600
}

fn default_issuer() -> String {
    "janua".to_string()
}

/// 安全策略配置
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// 连续失败多少次后锁定账户
    #[serde(default = "default_lockout_threshold")]
    pub lockout_threshold: i32,
    /// 通知分发的单次调用超时（秒）
    #[serde(default = "default_dispatch_timeout_secs")]
    pub dispatch_timeout_secs: u64,
}

fn default_lockout_threshold() -> i32 {
    5
}

fn default_dispatch_timeout_secs() -> u64 {
    10
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            lockout_threshold: default_lockout_threshold(),
            dispatch_timeout_secs: default_dispatch_timeout_secs(),
        }
    }
}

/// 遥测配置
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

/// 邮件配置
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: Secret<String>,
    pub from_email: String,
    pub from_name: String,
    #[serde(default)]
    pub use_tls: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app_name: String,
    pub app_env: String,
    pub database: DatabaseConfig,
    /// Kafka 缺省表示事件发布被禁用，而不是错误
    pub kafka: Option<KafkaConfig>,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    pub telemetry: TelemetryConfig,
    /// 邮件缺省表示登录通知邮件被禁用
    pub email: Option<EmailConfig>,
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序：default.toml -> {APP_ENV}.toml -> 环境变量，后者覆盖前者。
    /// 进程启动时加载一次，之后不可变。
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config: Self = Figment::new()
            .merge(Toml::file(format!("{}/default.toml", config_dir)))
            .merge(Toml::file(format!("{}/{}.toml", config_dir, env)))
            .merge(Env::prefixed("").split("_"))
            .extract()?;

        Ok(config)
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }

    /// 是否为开发环境
    pub fn is_development(&self) -> bool {
        self.app_env == "development"
    }
}

#[cfg(test)]
mod tests;
