//! 邮件模板系统

use janua_errors::{AppError, AppResult};
use std::collections::HashMap;
use tera::Tera;
use tracing::debug;

const LOGIN_NOTIFICATION_HTML: &str = r#"<html>
<body>
  <h2>New login to your account</h2>
  <p>Hello {{ username }},</p>
  <p>We noticed a new login to your account:</p>
  <ul>
    <li>Time: {{ login_time }}</li>
    <li>IP address: {{ ip_address }}</li>
    <li>Device: {{ device_info }}</li>
    <li>Location: {{ location }}</li>
  </ul>
  <p>If this was you, no action is needed. If you do not recognize this
  activity, please change your password immediately.</p>
</body>
</html>
"#;

const LOGIN_NOTIFICATION_TXT: &str = r#"Hello {{ username }},

We noticed a new login to your account:

  Time: {{ login_time }}
  IP address: {{ ip_address }}
  Device: {{ device_info }}
  Location: {{ location }}

If this was you, no action is needed. If you do not recognize this
activity, please change your password immediately.
"#;

/// 邮件模板管理器
pub struct EmailTemplate {
    tera: Tera,
}

impl EmailTemplate {
    /// 从模板目录创建
    pub fn new(template_dir: &str) -> AppResult<Self> {
        let pattern = format!("{}/**/*.html", template_dir);
        let tera = Tera::new(&pattern)
            .map_err(|e| AppError::internal(format!("Failed to load email templates: {}", e)))?;

        debug!(template_dir = %template_dir, "Email templates loaded");

        Ok(Self { tera })
    }

    /// 使用内置模板创建
    pub fn builtin() -> AppResult<Self> {
        let mut templates = HashMap::new();
        templates.insert(
            "login_notification.html".to_string(),
            LOGIN_NOTIFICATION_HTML.to_string(),
        );
        templates.insert(
            "login_notification.txt".to_string(),
            LOGIN_NOTIFICATION_TXT.to_string(),
        );
        Self::from_strings(templates)
    }

    /// 从内存中的模板字符串创建
    pub fn from_strings(templates: HashMap<String, String>) -> AppResult<Self> {
        let mut tera = Tera::default();

        for (name, content) in templates {
            tera.add_raw_template(&name, &content).map_err(|e| {
                AppError::internal(format!("Failed to add template {}: {}", name, e))
            })?;
        }

        Ok(Self { tera })
    }

    /// 渲染模板
    pub fn render(&self, template_name: &str, context: &serde_json::Value) -> AppResult<String> {
        let context = tera::Context::from_serialize(context)
            .map_err(|e| AppError::internal(format!("Failed to create template context: {}", e)))?;

        self.tera.render(template_name, &context).map_err(|e| {
            AppError::internal(format!(
                "Failed to render template {}: {}",
                template_name, e
            ))
        })
    }

    /// 渲染登录通知邮件，返回 (html, text)
    pub fn render_login_notification(
        &self,
        username: &str,
        login_time: &str,
        ip_address: &str,
        device_info: &str,
        location: &str,
    ) -> AppResult<(String, String)> {
        let mut context = tera::Context::new();
        context.insert("username", username);
        context.insert("login_time", login_time);
        context.insert("ip_address", ip_address);
        context.insert("device_info", device_info);
        context.insert("location", location);

        let html = self
            .tera
            .render("login_notification.html", &context)
            .map_err(|e| AppError::internal(format!("Failed to render HTML template: {}", e)))?;

        let text = self
            .tera
            .render("login_notification.txt", &context)
            .map_err(|e| AppError::internal(format!("Failed to render text template: {}", e)))?;

        Ok((html, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_from_strings() {
        let mut templates = HashMap::new();
        templates.insert(
            "test.html".to_string(),
            "<h1>Hello {{ name }}!</h1>".to_string(),
        );

        let template = EmailTemplate::from_strings(templates).unwrap();
        let rendered = template
            .render("test.html", &serde_json::json!({ "name": "world" }))
            .unwrap();

        assert_eq!(rendered, "<h1>Hello world!</h1>");
    }

    #[test]
    fn test_render_login_notification() {
        let template = EmailTemplate::builtin().unwrap();
        let (html, text) = template
            .render_login_notification(
                "alice",
                "01 Jan 2026, 09:30:00",
                "203.0.113.9",
                "Windows Desktop",
                "Unknown",
            )
            .unwrap();

        assert!(html.contains("alice"));
        assert!(html.contains("Windows Desktop"));
        assert!(text.contains("203.0.113.9"));
    }

    #[test]
    fn test_missing_template_errors() {
        let template = EmailTemplate::from_strings(HashMap::new()).unwrap();
        assert!(template
            .render("nope.html", &serde_json::json!({}))
            .is_err());
    }
}
