//! 邮箱地址值对象。

use std::fmt;

use janua_errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// 邮箱长度上限,与数据库列宽保持一致。
pub const MAX_EMAIL_LENGTH: usize = 255;

/// 经过校验并归一化(小写)的邮箱地址。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim().to_lowercase();

        if trimmed.is_empty() {
            return Err(AppError::validation("Email must not be empty"));
        }
        if trimmed.len() > MAX_EMAIL_LENGTH {
            return Err(AppError::validation(format!(
                "Email must be at most {MAX_EMAIL_LENGTH} characters"
            )));
        }

        // 轻量的结构校验:一个 `@`,两侧非空,域名部分带点。
        let Some((local, domain)) = trimmed.split_once('@') else {
            return Err(AppError::validation("Email must contain '@'"));
        };
        if local.is_empty() || domain.is_empty() || !domain.contains('.') {
            return Err(AppError::validation("Email format is invalid"));
        }
        if trimmed.contains(char::is_whitespace) {
            return Err(AppError::validation("Email must not contain whitespace"));
        }

        Ok(Self(trimmed))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 邮箱的本地部分(`@` 之前),用于为联合登录账户派生用户名。
    pub fn local_part(&self) -> &str {
        self.0.split('@').next().unwrap_or(&self.0)
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_and_normalizes() {
        let email = Email::new("  Alice@Example.COM ").unwrap();
        assert_eq!(email.as_str(), "alice@example.com");
    }

    #[test]
    fn exposes_local_part() {
        let email = Email::new("john.doe@example.com").unwrap();
        assert_eq!(email.local_part(), "john.doe");
    }

    #[test]
    fn rejects_malformed() {
        assert!(Email::new("").is_err());
        assert!(Email::new("no-at-sign").is_err());
        assert!(Email::new("@example.com").is_err());
        assert!(Email::new("alice@").is_err());
        assert!(Email::new("alice@localhost").is_err());
    }
}
