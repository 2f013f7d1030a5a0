//! 审计记录。
//!
//! 审计日志是只追加的:任何安全相关事件都会留下一条不可变记录,
//! 失败分支的记录不随业务回滚消失。

use std::fmt;

use chrono::{DateTime, Utc};
use janua_errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 审计记录 ID。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditRecordId(pub Uuid);

impl AuditRecordId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for AuditRecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AuditRecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 审计事件类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditEventType {
    Registered,
    LoginSuccess,
    LoginFailure,
    AccountLocked,
    Logout,
}

impl AuditEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registered => "REGISTERED",
            Self::LoginSuccess => "LOGIN_SUCCESS",
            Self::LoginFailure => "LOGIN_FAILURE",
            Self::AccountLocked => "ACCOUNT_LOCKED",
            Self::Logout => "LOGOUT",
        }
    }

    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "REGISTERED" => Ok(Self::Registered),
            "LOGIN_SUCCESS" => Ok(Self::LoginSuccess),
            "LOGIN_FAILURE" => Ok(Self::LoginFailure),
            "ACCOUNT_LOCKED" => Ok(Self::AccountLocked),
            "LOGOUT" => Ok(Self::Logout),
            other => Err(AppError::validation(format!(
                "Unknown audit event type: {other}"
            ))),
        }
    }
}

impl fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一条审计记录。
///
/// `username` 记录的是事件主体的标识符,对于"用户不存在"的失败
/// 登录,这里保存的是调用方提交的原始标识符。
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub id: AuditRecordId,
    pub username: String,
    pub event_type: AuditEventType,
    pub success: bool,
    pub message: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(
        username: impl Into<String>,
        event_type: AuditEventType,
        success: bool,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: AuditRecordId::new(),
            username: username.into(),
            event_type,
            success,
            message: message.into(),
            ip_address: None,
            user_agent: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_context(
        mut self,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Self {
        self.ip_address = ip_address.map(str::to_string);
        self.user_agent = user_agent.map(str::to_string);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_types_round_trip() {
        for event_type in [
            AuditEventType::Registered,
            AuditEventType::LoginSuccess,
            AuditEventType::LoginFailure,
            AuditEventType::AccountLocked,
            AuditEventType::Logout,
        ] {
            assert_eq!(
                AuditEventType::parse(event_type.as_str()).unwrap(),
                event_type
            );
        }
    }

    #[test]
    fn context_is_optional() {
        let record = AuditRecord::new("alice", AuditEventType::LoginFailure, false, "Bad password");
        assert!(record.ip_address.is_none());

        let record = record.with_context(Some("203.0.113.7"), None);
        assert_eq!(record.ip_address.as_deref(), Some("203.0.113.7"));
        assert!(record.user_agent.is_none());
    }
}
