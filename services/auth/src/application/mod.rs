//! 应用层:用例编排。

pub mod auth_service;
pub mod commands;
pub mod oauth2_service;

pub use auth_service::AuthService;
pub use commands::{
    LoginCommand, LoginResult, LogoutCommand, OAuth2LoginCommand, RegisterCommand,
    TokenValidation,
};
pub use oauth2_service::OAuth2Service;
