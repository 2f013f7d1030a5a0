//! janua-auth - 认证与会话生命周期引擎
//!
//! 覆盖凭证校验、防暴力破解锁定、JWT 令牌、联合身份收敛、会话
//! 与只追加的审计日志。对外的传输层(HTTP/gRPC)不在本 crate 内,
//! 上层直接调用 [`application::AuthService`] 与
//! [`application::OAuth2Service`]。

pub mod application;
pub mod bootstrap;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use application::{
    AuthService, LoginCommand, LoginResult, LogoutCommand, OAuth2LoginCommand, OAuth2Service,
    RegisterCommand, TokenValidation,
};
pub use bootstrap::{build_engine, AuthEngine};
pub use error::{AuthError, AuthResult};
