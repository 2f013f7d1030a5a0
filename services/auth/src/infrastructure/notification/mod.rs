//! 登录通知分发。
//!
//! 邮件与事件都在后台任务里发送,带超时上限。任何失败只记日志,
//! 已经提交的登录不受影响。

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use janua_adapter_email::{EmailSender, EmailTemplate};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::domain::Account;

use super::events::{LoginEvent, LoginEventPublisher};

/// 登录通知邮件的主题。
const LOGIN_NOTIFICATION_SUBJECT: &str = "New login to your account";

/// 审计展示用的登录时间格式,如 `07 Mar 2026, 14:32:05`。
const LOGIN_TIME_FORMAT: &str = "%d %b %Y, %H:%M:%S";

/// 通知分发器。
///
/// `notify_login` / `notify_logout` 立即返回,实际发送在
/// `tokio::spawn` 出的任务中进行,单个任务受 `dispatch_timeout`
/// 约束。
pub struct NotificationDispatcher {
    email: Option<Arc<dyn EmailSender>>,
    template: Arc<EmailTemplate>,
    events: Arc<dyn LoginEventPublisher>,
    dispatch_timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(
        email: Option<Arc<dyn EmailSender>>,
        template: Arc<EmailTemplate>,
        events: Arc<dyn LoginEventPublisher>,
        dispatch_timeout: Duration,
    ) -> Self {
        Self {
            email,
            template,
            events,
            dispatch_timeout,
        }
    }

    /// 分发登录成功通知:一封提醒邮件加一条登录事件。
    pub fn notify_login(&self, account: &Account, ip: Option<&str>, user_agent: Option<&str>) {
        self.spawn_event(LoginEvent::login_success(account, ip, user_agent));
        self.spawn_login_email(account, ip, user_agent);
    }

    /// 分发注销事件。注销不发邮件。
    pub fn notify_logout(&self, account: &Account, ip: Option<&str>, user_agent: Option<&str>) {
        self.spawn_event(LoginEvent::logout(account, ip, user_agent));
    }

    fn spawn_event(&self, event: LoginEvent) {
        let events = Arc::clone(&self.events);
        let dispatch_timeout = self.dispatch_timeout;
        tokio::spawn(async move {
            match timeout(dispatch_timeout, events.publish(&event)).await {
                Ok(Ok(())) => {
                    debug!(event_type = ?event.event_type, username = %event.username, "Login event published");
                }
                Ok(Err(err)) => {
                    warn!(error = %err, username = %event.username, "Failed to publish login event");
                }
                Err(_) => {
                    warn!(username = %event.username, "Publishing login event timed out");
                }
            }
        });
    }

    fn spawn_login_email(&self, account: &Account, ip: Option<&str>, user_agent: Option<&str>) {
        let Some(email) = &self.email else {
            debug!(username = %account.username, "Email notifications disabled");
            return;
        };

        let email = Arc::clone(email);
        let template = Arc::clone(&self.template);
        let dispatch_timeout = self.dispatch_timeout;

        let to = account.email.as_str().to_string();
        let username = account.username.as_str().to_string();
        let login_time = Utc::now().format(LOGIN_TIME_FORMAT).to_string();
        let ip_address = ip.unwrap_or("Unknown").to_string();
        let device_info = device_summary(user_agent).to_string();

        tokio::spawn(async move {
            let send = async {
                let (html, text) = template.render_login_notification(
                    &username,
                    &login_time,
                    &ip_address,
                    &device_info,
                    "Unknown",
                )?;
                email
                    .send_html_email(&to, LOGIN_NOTIFICATION_SUBJECT, &html, Some(&text))
                    .await
            };

            match timeout(dispatch_timeout, send).await {
                Ok(Ok(())) => {
                    debug!(username = %username, "Login notification email sent");
                }
                Ok(Err(err)) => {
                    warn!(error = %err, username = %username, "Failed to send login notification email");
                }
                Err(_) => {
                    warn!(username = %username, "Sending login notification email timed out");
                }
            }
        });
    }
}

/// 从 User-Agent 推断一个人类可读的设备描述。
pub fn device_summary(user_agent: Option<&str>) -> &'static str {
    let Some(ua) = user_agent else {
        return "Unknown Device";
    };

    if ua.contains("Windows") {
        "Windows Desktop"
    } else if ua.contains("Android") {
        "Android Mobile"
    } else if ua.contains("iPhone") || ua.contains("iPad") {
        "iOS Mobile"
    } else if ua.contains("Mac") {
        "Mac Desktop"
    } else if ua.contains("Linux") {
        "Linux Desktop"
    } else {
        "Unknown Device"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_common_user_agents() {
        assert_eq!(
            device_summary(Some("Mozilla/5.0 (Windows NT 10.0; Win64; x64)")),
            "Windows Desktop"
        );
        assert_eq!(
            device_summary(Some("Mozilla/5.0 (Linux; Android 14; Pixel 8)")),
            "Android Mobile"
        );
        assert_eq!(
            device_summary(Some("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0)")),
            "iOS Mobile"
        );
        assert_eq!(
            device_summary(Some("Mozilla/5.0 (Macintosh; Intel Mac OS X 14_0)")),
            "Mac Desktop"
        );
        assert_eq!(
            device_summary(Some("Mozilla/5.0 (X11; Linux x86_64)")),
            "Linux Desktop"
        );
    }

    #[test]
    fn android_wins_over_linux() {
        // Android 的 UA 同时带有 Linux 字样。
        assert_eq!(
            device_summary(Some("Mozilla/5.0 (Linux; Android 14)")),
            "Android Mobile"
        );
    }

    #[test]
    fn unknown_or_missing_user_agent() {
        assert_eq!(device_summary(None), "Unknown Device");
        assert_eq!(device_summary(Some("curl/8.5.0")), "Unknown Device");
    }
}
