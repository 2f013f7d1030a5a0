//! 认证服务:注册、密码登录、注销、令牌校验。

use std::sync::Arc;

use janua_auth_core::TokenService;
use janua_common::Pagination;
use janua_config::SecurityConfig;
use janua_errors::AppError;
use tracing::{debug, info, warn};

use crate::domain::{
    Account, AccountRepository, AuditEventType, AuditLogRepository, AuditRecord, Email,
    HashedPassword, LoginAttemptStore, Role, RoleName, RoleRepository, Session,
    SessionRepository, UnitOfWorkFactory, Username,
};
use crate::error::{AuthError, AuthResult};
use crate::infrastructure::notification::NotificationDispatcher;

use super::commands::{
    LoginCommand, LoginResult, LogoutCommand, RegisterCommand, TokenValidation,
};

/// 认证服务。
///
/// 读路径与失败分支直接走连接池仓储;成功路径的多次写入收进
/// 同一个工作单元,提交之后才触发通知分发。
pub struct AuthService {
    uow_factory: Arc<dyn UnitOfWorkFactory>,
    accounts: Arc<dyn AccountRepository>,
    roles: Arc<dyn RoleRepository>,
    sessions: Arc<dyn SessionRepository>,
    attempts: Arc<dyn LoginAttemptStore>,
    audit: Arc<dyn AuditLogRepository>,
    token_service: Arc<TokenService>,
    dispatcher: Arc<NotificationDispatcher>,
    security: SecurityConfig,
}

impl AuthService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        uow_factory: Arc<dyn UnitOfWorkFactory>,
        accounts: Arc<dyn AccountRepository>,
        roles: Arc<dyn RoleRepository>,
        sessions: Arc<dyn SessionRepository>,
        attempts: Arc<dyn LoginAttemptStore>,
        audit: Arc<dyn AuditLogRepository>,
        token_service: Arc<TokenService>,
        dispatcher: Arc<NotificationDispatcher>,
        security: SecurityConfig,
    ) -> Self {
        Self {
            uow_factory,
            accounts,
            roles,
            sessions,
            attempts,
            audit,
            token_service,
            dispatcher,
            security,
        }
    }

    /// 注册新账户。
    ///
    /// 用户名与邮箱都必须未被占用;成功后写入账户与注册审计记录。
    pub async fn register(&self, cmd: RegisterCommand) -> AuthResult<Account> {
        let username = Username::new(&cmd.username)?;
        let email = Email::new(&cmd.email)?;
        info!(username = %username, "Registering new account");

        if self.accounts.exists_by_username(username.as_str()).await? {
            return Err(AuthError::DuplicateIdentity);
        }
        if self.accounts.exists_by_email(email.as_str()).await? {
            return Err(AuthError::DuplicateIdentity);
        }

        let password_hash = HashedPassword::from_plain(&cmd.password)?;
        let role = self.default_role().await?;
        let account = Account::register(username, email, password_hash, role);

        let uow = self.uow_factory.begin().await?;
        // 预检查挡不住并发注册,唯一索引兜底时同样报身份占用。
        uow.accounts().insert(&account).await.map_err(|err| match err {
            AppError::Conflict(_) => AuthError::DuplicateIdentity,
            other => other.into(),
        })?;
        uow.audit_records()
            .insert(&AuditRecord::new(
                account.username.as_str(),
                AuditEventType::Registered,
                true,
                "Account registered",
            ))
            .await?;
        uow.commit().await?;

        info!(username = %account.username, account_id = %account.id, "Account registered");
        Ok(account)
    }

    /// 密码登录。
    pub async fn login(&self, cmd: LoginCommand) -> AuthResult<LoginResult> {
        let ip = cmd.ip_address.as_deref();
        let ua = cmd.user_agent.as_deref();
        debug!(identifier = %cmd.identifier, "Login attempt");

        let account = match self
            .accounts
            .find_by_username_or_email(&cmd.identifier)
            .await?
        {
            Some(account) => account,
            None => {
                self.audit_login_failure(&cmd.identifier, "Unknown identifier", ip, ua)
                    .await?;
                return Err(AuthError::InvalidCredentials);
            }
        };

        if account.locked {
            self.audit_login_failure(account.username.as_str(), "Account is locked", ip, ua)
                .await?;
            return Err(AuthError::AccountLocked);
        }
        if !account.active {
            self.audit_login_failure(account.username.as_str(), "Account is inactive", ip, ua)
                .await?;
            return Err(AuthError::AccountInactive);
        }

        let password_matches = match &account.password_hash {
            Some(hash) => hash.verify(&cmd.password)?,
            // 联合登录账户没有本地密码,密码登录一律失败。
            None => false,
        };
        if !password_matches {
            self.handle_failed_login(&account, ip, ua).await?;
            return Err(AuthError::InvalidCredentials);
        }

        let mut account = account;
        account.reset_failed_attempts();
        account.record_login();

        let roles = account.role_names();
        let token = self
            .token_service
            .generate_token(account.username.as_str(), roles.clone())?;

        let mut session = Session::new(account.id.clone(), token.clone());
        if let Some(ip) = &cmd.ip_address {
            session = session.with_ip_address(ip.clone());
        }
        if let Some(ua) = &cmd.user_agent {
            session = session.with_user_agent(ua.clone());
        }

        let uow = self.uow_factory.begin().await?;
        uow.accounts().save(&account).await?;
        uow.sessions().insert(&session).await?;
        uow.audit_records()
            .insert(
                &AuditRecord::new(
                    account.username.as_str(),
                    AuditEventType::LoginSuccess,
                    true,
                    "Login successful",
                )
                .with_context(ip, ua),
            )
            .await?;
        uow.commit().await?;

        // 事务提交之后才分发通知,通知失败不影响已完成的登录。
        self.dispatcher.notify_login(&account, ip, ua);

        info!(username = %account.username, session_id = %session.id, "Login successful");
        Ok(LoginResult {
            token,
            token_type: "Bearer".to_string(),
            account_id: account.id.clone(),
            username: account.username.as_str().to_string(),
            email: account.email.as_str().to_string(),
            roles,
            session_id: session.id.clone(),
            login_time: session.login_at,
            expires_in: self.token_service.expires_in(),
        })
    }

    /// 注销。
    ///
    /// 关闭令牌对应的会话(若存在且仍活跃),写注销审计并广播
    /// 注销事件。令牌无效时直接拒绝。
    pub async fn logout(&self, cmd: LogoutCommand) -> AuthResult<()> {
        let claims = self
            .token_service
            .validate_token(&cmd.token)
            .map_err(|_| AuthError::InvalidToken)?;
        let ip = cmd.ip_address.as_deref();
        let ua = cmd.user_agent.as_deref();

        if let Some(mut session) = self.sessions.find_by_token(&cmd.token).await? {
            if session.active {
                session.close();
                self.sessions.save(&session).await?;
            }
        }

        self.audit
            .insert(
                &AuditRecord::new(
                    claims.sub.as_str(),
                    AuditEventType::Logout,
                    true,
                    "User logged out",
                )
                    .with_context(ip, ua),
            )
            .await?;

        if let Some(account) = self.accounts.find_by_username(&claims.sub).await? {
            self.dispatcher.notify_logout(&account, ip, ua);
        }

        info!(username = %claims.sub, "Logout complete");
        Ok(())
    }

    /// 某个主体的认证历史,按时间倒序分页。
    pub async fn login_history(
        &self,
        username: &str,
        pagination: &Pagination,
    ) -> AuthResult<Vec<AuditRecord>> {
        Ok(self.audit.find_by_username(username, pagination).await?)
    }

    /// 校验令牌。从不返回错误,无效令牌得到 `valid = false`。
    pub fn validate_token(&self, token: &str) -> TokenValidation {
        match self.token_service.validate_token(token) {
            Ok(claims) => TokenValidation {
                valid: true,
                username: Some(claims.sub),
                roles: claims.roles,
            },
            Err(err) => {
                debug!(error = %err, "Token validation failed");
                TokenValidation::invalid()
            }
        }
    }

    /// 失败登录记账。
    ///
    /// 计数器更新由 [`LoginAttemptStore`] 独立持久化,即便调用方
    /// 的登录请求以错误收场也不会回滚。锁定与失败两条审计记录
    /// 同样直接落库。
    async fn handle_failed_login(
        &self,
        account: &Account,
        ip: Option<&str>,
        ua: Option<&str>,
    ) -> AuthResult<()> {
        let outcome = self
            .attempts
            .record_failed_attempt(&account.id, self.security.lockout_threshold)
            .await?;

        if outcome.locked_now {
            warn!(
                username = %account.username,
                attempts = outcome.attempts,
                "Account locked after repeated login failures"
            );
            self.audit
                .insert(
                    &AuditRecord::new(
                        account.username.as_str(),
                        AuditEventType::AccountLocked,
                        true,
                        "Account locked due to multiple failed login attempts",
                    )
                    .with_context(ip, ua),
                )
                .await?;
        }

        self.audit_login_failure(account.username.as_str(), "Invalid password", ip, ua)
            .await
    }

    async fn audit_login_failure(
        &self,
        subject: &str,
        reason: &str,
        ip: Option<&str>,
        ua: Option<&str>,
    ) -> AuthResult<()> {
        self.audit
            .insert(
                &AuditRecord::new(subject, AuditEventType::LoginFailure, false, reason)
                    .with_context(ip, ua),
            )
            .await?;
        Ok(())
    }

    async fn default_role(&self) -> AuthResult<Role> {
        self.roles
            .find_by_name(&RoleName::User)
            .await?
            .ok_or_else(|| {
                AuthError::Internal(AppError::internal("Default role ROLE_USER is not seeded"))
            })
    }
}
