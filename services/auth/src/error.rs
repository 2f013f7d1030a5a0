//! 认证服务的错误类型。
//!
//! 调用方需要区分"凭证错误""账户锁定"等结果并映射到不同的
//! 响应,所以这里不直接用通用的 [`AppError`],而是给出有限的
//! 错误枚举。故意不区分"用户不存在"与"密码错误",避免账户
//! 枚举。

use janua_errors::AppError;
use thiserror::Error;

/// 认证流程可能返回的错误。
#[derive(Debug, Error)]
pub enum AuthError {
    /// 用户名或邮箱已被占用。
    #[error("Username or email already exists")]
    DuplicateIdentity,

    /// 标识符未知或密码不匹配,对外是同一种失败。
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// 账户因连续失败登录被锁定。
    #[error("Account is locked due to multiple failed login attempts")]
    AccountLocked,

    /// 账户被管理员停用。
    #[error("Account is inactive")]
    AccountInactive,

    /// 令牌缺失、过期或签名无效。
    #[error("Invalid or expired token")]
    InvalidToken,

    /// 输入未通过校验。
    #[error("Validation failed: {0}")]
    Validation(String),

    /// 基础设施故障。
    #[error(transparent)]
    Internal(AppError),
}

impl From<AppError> for AuthError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Validation(msg) => Self::Validation(msg),
            other => Self::Internal(other),
        }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_keep_their_message() {
        let err: AuthError = AppError::validation("Email must contain '@'").into();
        assert!(matches!(err, AuthError::Validation(_)));
        assert!(err.to_string().contains("Email must contain '@'"));
    }

    #[test]
    fn other_app_errors_become_internal() {
        let err: AuthError = AppError::database("connection refused").into();
        assert!(matches!(err, AuthError::Internal(_)));
    }
}
