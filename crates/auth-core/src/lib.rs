//! janua-auth-core - 认证核心库
//!
//! JWT/Claims 核心逻辑

use chrono::{Duration, Utc};
use janua_errors::{AppError, AppResult};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT Claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,
    /// Role names
    #[serde(default)]
    pub roles: Vec<String>,
    /// Expiration time
    pub exp: i64,
    /// Issued at
    pub iat: i64,
    /// JWT ID
    pub jti: String,
    /// Issuer
    #[serde(default)]
    pub iss: String,
}

impl Claims {
    pub fn new(subject: &str, roles: Vec<String>, expires_in_secs: i64, issuer: &str) -> Self {
        let now = Utc::now();
        Self {
            sub: subject.to_string(),
            roles,
            exp: (now + Duration::seconds(expires_in_secs)).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::now_v7().to_string(),
            iss: issuer.to_string(),
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_expired_at(&self, now: chrono::DateTime<Utc>) -> bool {
        self.exp <= now.timestamp()
    }
}

/// Token 服务
///
/// 密钥在进程启动时加载一次，之后不可变。
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expires_in: i64,
    issuer: String,
}

impl TokenService {
    pub fn new(secret: &str, expires_in: i64, issuer: impl Into<String>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expires_in,
            issuer: issuer.into(),
        }
    }

    /// 签发令牌
    pub fn generate_token(&self, subject: &str, roles: Vec<String>) -> AppResult<String> {
        let claims = Claims::new(subject, roles, self.expires_in, &self.issuer);

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to generate token: {}", e)))
    }

    /// 验证令牌
    ///
    /// 校验签名、过期时间和签发者，任何一项被篡改都会失败。
    pub fn validate_token(&self, token: &str) -> AppResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.leeway = 0; // 不允许时间偏差

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| AppError::unauthorized(format!("Invalid token: {}", e)))?;

        let claims = token_data.claims;

        // 额外验证：检查 JTI 存在
        if claims.jti.is_empty() {
            return Err(AppError::unauthorized("Token ID (jti) missing"));
        }

        Ok(claims)
    }

    /// 令牌有效期（秒）
    pub fn expires_in(&self) -> i64 {
        self.expires_in
    }
}
