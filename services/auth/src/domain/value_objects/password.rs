//! 密码值对象。
//!
//! 明文密码只在校验与散列的瞬间存在,领域模型中持有的始终是
//! Argon2id 散列后的 [`HashedPassword`]。

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use janua_errors::{AppError, AppResult};

/// 密码长度下限。
pub const MIN_PASSWORD_LENGTH: usize = 8;
/// 密码长度上限,防止对散列函数的资源滥用。
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Argon2id 散列后的密码。
///
/// 注意:不派生 `Debug` 的自定义实现以避免散列值进入日志。
#[derive(Clone, PartialEq, Eq)]
pub struct HashedPassword(String);

impl HashedPassword {
    /// 校验明文密码强度并散列。
    pub fn from_plain(plain: &str) -> AppResult<Self> {
        validate_strength(plain)?;

        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| AppError::internal(format!("Failed to hash password: {e}")))?;

        Ok(Self(hash.to_string()))
    }

    /// 从已持久化的散列值恢复,不做强度校验。
    pub fn from_hash(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    /// 比对明文密码与散列。散列格式损坏视为内部错误而非密码错误。
    pub fn verify(&self, plain: &str) -> AppResult<bool> {
        let parsed = PasswordHash::new(&self.0)
            .map_err(|e| AppError::internal(format!("Stored password hash is invalid: {e}")))?;

        Ok(Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("HashedPassword(***)")
    }
}

fn validate_strength(plain: &str) -> AppResult<()> {
    if plain.len() < MIN_PASSWORD_LENGTH {
        return Err(AppError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if plain.len() > MAX_PASSWORD_LENGTH {
        return Err(AppError::validation(format!(
            "Password must be at most {MAX_PASSWORD_LENGTH} characters"
        )));
    }
    if !plain.chars().any(|c| c.is_ascii_alphabetic()) {
        return Err(AppError::validation("Password must contain a letter"));
    }
    if !plain.chars().any(|c| c.is_ascii_digit()) {
        return Err(AppError::validation("Password must contain a digit"));
    }
    Ok(())
}
