//! 应用层命令与结果类型。

use chrono::{DateTime, Utc};
use janua_common::AccountId;
use serde::{Deserialize, Serialize};

use crate::domain::SessionId;

/// 本地注册。
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterCommand {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// 密码登录。`identifier` 可以是用户名或邮箱。
#[derive(Debug, Clone, Deserialize)]
pub struct LoginCommand {
    pub identifier: String,
    pub password: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// 联合身份登录。调用方已在上游完成对身份提供方令牌的验证,
/// 这里收到的是提供方断言的用户资料。
#[derive(Debug, Clone, Deserialize)]
pub struct OAuth2LoginCommand {
    pub provider: String,
    pub email: String,
    pub display_name: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// 注销。
#[derive(Debug, Clone, Deserialize)]
pub struct LogoutCommand {
    pub token: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// 登录成功的结果,两条登录路径共用。
#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub token: String,
    pub token_type: String,
    pub account_id: AccountId,
    pub username: String,
    pub email: String,
    pub roles: Vec<String>,
    pub session_id: SessionId,
    pub login_time: DateTime<Utc>,
    /// 令牌有效期,单位秒。
    pub expires_in: i64,
}

/// 令牌校验结果。校验从不报错,无效令牌返回 `valid = false`。
#[derive(Debug, Clone, Serialize)]
pub struct TokenValidation {
    pub valid: bool,
    pub username: Option<String>,
    pub roles: Vec<String>,
}

impl TokenValidation {
    pub fn invalid() -> Self {
        Self {
            valid: false,
            username: None,
            roles: Vec::new(),
        }
    }
}
