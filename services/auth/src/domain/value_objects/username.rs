//! 用户名值对象。
//!
//! 用户名在系统内作为令牌主体与审计主体使用,必须在构造时完成校验,
//! 之后的任何代码都可以假定其格式合法。

use std::fmt;

use janua_errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// 用户名长度下限。
pub const MIN_USERNAME_LENGTH: usize = 3;
/// 用户名长度上限。
pub const MAX_USERNAME_LENGTH: usize = 50;

/// 经过校验的用户名。
///
/// 允许字母、数字以及 `_` `.` `-`。点号与连字符需要被允许,
/// 因为联合登录账户的用户名取自邮箱本地部分。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();

        if trimmed.len() < MIN_USERNAME_LENGTH {
            return Err(AppError::validation(format!(
                "Username must be at least {MIN_USERNAME_LENGTH} characters"
            )));
        }
        if trimmed.len() > MAX_USERNAME_LENGTH {
            return Err(AppError::validation(format!(
                "Username must be at most {MAX_USERNAME_LENGTH} characters"
            )));
        }
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-')
        {
            return Err(AppError::validation(
                "Username may only contain letters, digits, '_', '.' and '-'",
            ));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_usernames() {
        assert!(Username::new("alice").is_ok());
        assert!(Username::new("bob_99").is_ok());
        assert!(Username::new("john.doe").is_ok());
        assert!(Username::new("jane-smith").is_ok());
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let username = Username::new("  alice  ").unwrap();
        assert_eq!(username.as_str(), "alice");
    }

    #[test]
    fn rejects_too_short() {
        assert!(Username::new("ab").is_err());
    }

    #[test]
    fn rejects_too_long() {
        assert!(Username::new("a".repeat(51)).is_err());
    }

    #[test]
    fn rejects_invalid_characters() {
        assert!(Username::new("alice bob").is_err());
        assert!(Username::new("alice@example").is_err());
        assert!(Username::new("alice/../etc").is_err());
    }
}
