//! 联合身份登录服务。
//!
//! 身份提供方的令牌验证发生在上游,这里处理已验证的断言:按邮箱
//! 收敛到唯一账户,必要时自动开通,然后走与密码登录相同的成功
//! 路径(会话、审计、通知)。

use std::sync::Arc;

use janua_auth_core::TokenService;
use janua_errors::AppError;
use tracing::{debug, info};

use crate::domain::{
    Account, AccountRepository, AuditEventType, AuditLogRepository, AuditRecord, Email, Role,
    RoleName, RoleRepository, Session, UnitOfWorkFactory, Username,
};
use crate::error::{AuthError, AuthResult};
use crate::infrastructure::notification::NotificationDispatcher;

use super::commands::{LoginResult, OAuth2LoginCommand};

pub struct OAuth2Service {
    uow_factory: Arc<dyn UnitOfWorkFactory>,
    accounts: Arc<dyn AccountRepository>,
    roles: Arc<dyn RoleRepository>,
    audit: Arc<dyn AuditLogRepository>,
    token_service: Arc<TokenService>,
    dispatcher: Arc<NotificationDispatcher>,
}

impl OAuth2Service {
    pub fn new(
        uow_factory: Arc<dyn UnitOfWorkFactory>,
        accounts: Arc<dyn AccountRepository>,
        roles: Arc<dyn RoleRepository>,
        audit: Arc<dyn AuditLogRepository>,
        token_service: Arc<TokenService>,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            uow_factory,
            accounts,
            roles,
            audit,
            token_service,
            dispatcher,
        }
    }

    /// 联合身份登录。
    ///
    /// 邮箱是收敛键:同一邮箱多次从任意提供方登录,始终命中
    /// 同一个账户。令牌主体与密码登录一致,使用本系统的用户名
    /// 而不是提供方邮箱。
    pub async fn login(&self, cmd: OAuth2LoginCommand) -> AuthResult<LoginResult> {
        match self.attempt_login(&cmd).await {
            // 并发开通撞上唯一索引:此时账户或用户名已经存在,
            // 重试一次会收敛到它。
            Err(AuthError::Internal(AppError::Conflict(_))) => {
                debug!(provider = %cmd.provider, "Provisioning raced, retrying federated login");
                self.attempt_login(&cmd).await
            }
            other => other,
        }
    }

    async fn attempt_login(&self, cmd: &OAuth2LoginCommand) -> AuthResult<LoginResult> {
        let email = Email::new(&cmd.email)?;
        let ip = cmd.ip_address.as_deref();
        let ua = cmd.user_agent.as_deref();
        debug!(provider = %cmd.provider, email = %email, "Federated login");

        let (mut account, provisioned) = match self.accounts.find_by_email(email.as_str()).await? {
            Some(account) => (account, false),
            None => (self.provision_account(cmd, &email).await?, true),
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
        if provisioned {
            uow.accounts().insert(&account).await?;
        } else {
            uow.accounts().save(&account).await?;
        }
        uow.sessions().insert(&session).await?;
        uow.audit_records()
            .insert(
                &AuditRecord::new(
                    account.username.as_str(),
                    AuditEventType::LoginSuccess,
                    true,
                    format!("Federated login via {}", cmd.provider),
                )
                .with_context(ip, ua),
            )
            .await?;
        uow.commit().await?;

        self.dispatcher.notify_login(&account, ip, ua);

        info!(
            username = %account.username,
            provider = %cmd.provider,
            provisioned,
            "Federated login successful"
        );
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

    /// 提供方令牌的验证占位。
    ///
    /// 当前信任上游网关已向身份提供方完成验证,这里始终放行;
    /// 接入直连提供方校验时只需替换此处。
    pub fn verify_provider_token(&self, provider: &str, _provider_token: &str) -> bool {
        debug!(provider = %provider, "Trusting upstream verification of provider token");
        true
    }

    /// 首次联合登录时开通账户。用户名由邮箱本地部分推导。
    async fn provision_account(
        &self,
        cmd: &OAuth2LoginCommand,
        email: &Email,
    ) -> AuthResult<Account> {
        info!(email = %email, provider = %cmd.provider, "Provisioning account from federated identity");
        let username = self.derive_username(email.local_part()).await?;
        let role = self.default_role().await?;
        Ok(Account::provision_federated(
            username,
            email.clone(),
            cmd.provider.clone(),
            email.as_str(),
            cmd.display_name.clone(),
            role,
        ))
    }

    /// 从邮箱本地部分推导一个可用的用户名。
    ///
    /// 提供方侧合法的邮箱不一定直接是合法用户名("ab@x.com"、
    /// "jane+shop@x.com"),所以先剔除不允许的字符、补足最短长度,
    /// 再在被占用时追加序号。开通不能因为用户名推导失败而拒绝
    /// 一个已验证的身份。
    async fn derive_username(&self, local_part: &str) -> AuthResult<Username> {
        let mut base: String = local_part
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
            .take(42)
            .collect();
        if base.len() < 3 {
            base = format!("user-{base}");
        }

        if !self.accounts.exists_by_username(&base).await? {
            return Username::new(&base).map_err(Into::into);
        }
        for n in 2..=50u32 {
            let candidate = format!("{base}-{n}");
            if !self.accounts.exists_by_username(&candidate).await? {
                return Username::new(&candidate).map_err(Into::into);
            }
        }
        // 同名挤爆序号段的情况,退回随机后缀。
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        Username::new(&format!("{base}-{}", &suffix[..6])).map_err(Into::into)
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
