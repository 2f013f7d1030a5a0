//! 会话实体。
//!
//! 每次成功登录创建一条会话,记录令牌与客户端上下文;
//! 注销时关闭会话但不删除,保留完整的登录历史。

use std::fmt;

use chrono::{DateTime, Utc};
use janua_common::AccountId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 会话 ID。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 登录会话。
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub account_id: AccountId,
    pub token: String,
    pub login_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub logout_at: Option<DateTime<Utc>>,
    pub active: bool,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl Session {
    pub fn new(account_id: AccountId, token: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            account_id,
            token: token.into(),
            login_at: now,
            last_activity_at: now,
            logout_at: None,
            active: true,
            ip_address: None,
            user_agent: None,
        }
    }

    pub fn with_ip_address(mut self, ip_address: impl Into<String>) -> Self {
        self.ip_address = Some(ip_address.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// 刷新最近活动时间。
    pub fn touch(&mut self) {
        self.last_activity_at = Utc::now();
    }

    /// 关闭会话。重复关闭是幂等的,保留首次的注销时间。
    pub fn close(&mut self) {
        if self.active {
            self.active = false;
            self.logout_at = Some(Utc::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_session() -> Session {
        Session::new(AccountId::new(), "token-123")
            .with_ip_address("203.0.113.7")
            .with_user_agent("Mozilla/5.0 (Windows NT 10.0)")
    }

    #[test]
    fn new_session_is_active() {
        let session = test_session();
        assert!(session.active);
        assert!(session.logout_at.is_none());
        assert_eq!(session.ip_address.as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn close_records_logout_time() {
        let mut session = test_session();
        session.close();
        assert!(!session.active);
        assert!(session.logout_at.is_some());
    }

    #[test]
    fn close_is_idempotent() {
        let mut session = test_session();
        session.close();
        let first_logout = session.logout_at;
        session.close();
        assert_eq!(session.logout_at, first_logout);
    }

    #[test]
    fn touch_advances_activity() {
        let mut session = test_session();
        let before = session.last_activity_at;
        session.touch();
        assert!(session.last_activity_at >= before);
    }
}
