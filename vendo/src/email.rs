//! Outbound email.
//!
//! Two transports, selected by configuration: SMTP for real deployments and
//! a file transport that drops `.eml` files into a directory for local
//! development and tests. Bodies are plain text rendered from minijinja
//! templates.

use lettre::{
    AsyncFileTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use minijinja::{Environment, context};

use crate::{
    config::{Config, EmailTransportConfig},
    errors::Error,
};

const PASSWORD_RESET_TEMPLATE: &str = "\
Hi {{ name }},

A password reset was requested for your {{ app_name }} account.
Use the link below to choose a new password. The link expires in
{{ expiry_minutes }} minutes.

{{ reset_url }}

If you did not request this, you can safely ignore this email.

The {{ app_name }} team
";

const SUBSCRIPTION_ACTIVATED_TEMPLATE: &str = "\
Hi {{ name }},

Your {{ plan_name }} subscription on {{ app_name }} is now active\
{% if period_end %} until {{ period_end }}{% endif %}.

Manage your subscription at {{ dashboard_url }}.

The {{ app_name }} team
";

enum Mailer {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    File(AsyncFileTransport<Tokio1Executor>),
}

pub struct EmailService {
    mailer: Mailer,
    from: Mailbox,
    reply_to: Option<Mailbox>,
    app_name: String,
    dashboard_url: String,
    reset_token_expiry_minutes: u64,
    templates: Environment<'static>,
}

impl EmailService {
    pub fn new(config: &Config) -> Result<Self, Error> {
        let email_config = &config.auth.native.email;

        let mailer = match &email_config.transport {
            EmailTransportConfig::Smtp {
                host,
                port,
                username,
                password,
                use_tls,
            } => {
                let mut builder = if *use_tls {
                    AsyncSmtpTransport::<Tokio1Executor>::relay(host).map_err(anyhow::Error::new)?
                } else {
                    AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
                };
                builder = builder.port(*port);
                if !username.is_empty() {
                    builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
                }
                Mailer::Smtp(builder.build())
            }
            EmailTransportConfig::File { path } => Mailer::File(AsyncFileTransport::new(path)),
        };

        let from = format!("{} <{}>", email_config.from_name, email_config.from_email)
            .parse()
            .map_err(anyhow::Error::new)?;
        let reply_to = email_config
            .reply_to
            .as_deref()
            .map(str::parse)
            .transpose()
            .map_err(anyhow::Error::new)?;

        let mut templates = Environment::new();
        templates
            .add_template("password_reset", PASSWORD_RESET_TEMPLATE)
            .map_err(anyhow::Error::new)?;
        templates
            .add_template("subscription_activated", SUBSCRIPTION_ACTIVATED_TEMPLATE)
            .map_err(anyhow::Error::new)?;

        Ok(Self {
            mailer,
            from,
            reply_to,
            app_name: config.metadata.app_name.clone(),
            dashboard_url: config.dashboard_url.clone(),
            reset_token_expiry_minutes: config.auth.native.password_reset_token_duration.as_secs() / 60,
            templates,
        })
    }

    /// Send the password reset link for `raw_token`.
    #[tracing::instrument(skip(self, raw_token))]
    pub async fn send_password_reset_email(
        &self,
        to: &str,
        display_name: Option<&str>,
        raw_token: &str,
    ) -> Result<(), Error> {
        let reset_url = format!("{}/reset-password?token={raw_token}", self.dashboard_url);
        let body = self
            .templates
            .get_template("password_reset")
            .and_then(|t| {
                t.render(context! {
                    name => display_name.unwrap_or("there"),
                    app_name => self.app_name,
                    expiry_minutes => self.reset_token_expiry_minutes,
                    reset_url => reset_url,
                })
            })
            .map_err(anyhow::Error::new)?;

        self.send(to, format!("Reset your {} password", self.app_name), body).await
    }

    /// Send the contract email after a subscription goes active.
    #[tracing::instrument(skip(self))]
    pub async fn send_subscription_activated(
        &self,
        to: &str,
        display_name: Option<&str>,
        plan_name: &str,
        period_end: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<(), Error> {
        let body = self
            .templates
            .get_template("subscription_activated")
            .and_then(|t| {
                t.render(context! {
                    name => display_name.unwrap_or("there"),
                    app_name => self.app_name,
                    plan_name => plan_name,
                    period_end => period_end.map(|end| end.format("%-d %B %Y").to_string()),
                    dashboard_url => self.dashboard_url,
                })
            })
            .map_err(anyhow::Error::new)?;

        self.send(to, format!("Your {plan_name} subscription is active"), body)
            .await
    }

    async fn send(&self, to: &str, subject: String, body: String) -> Result<(), Error> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .to(to.parse().map_err(anyhow::Error::new)?)
            .subject(subject);
        if let Some(reply_to) = &self.reply_to {
            builder = builder.reply_to(reply_to.clone());
        }
        let message = builder
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(anyhow::Error::new)?;

        match &self.mailer {
            Mailer::Smtp(transport) => {
                transport.send(message).await.map_err(anyhow::Error::new)?;
            }
            Mailer::File(transport) => {
                transport.send(message).await.map_err(anyhow::Error::new)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_config;

    fn config_with_file_transport(dir: &std::path::Path) -> Config {
        let mut config = create_test_config();
        config.auth.native.email.transport = EmailTransportConfig::File {
            path: dir.to_string_lossy().into_owned(),
        };
        config
    }

    #[tokio::test]
    async fn test_password_reset_email_written_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with_file_transport(dir.path());

        let service = EmailService::new(&config).unwrap();
        service
            .send_password_reset_email("reseller@example.com", Some("Asha"), "tok-123")
            .await
            .unwrap();

        let mut entries = std::fs::read_dir(dir.path()).unwrap();
        let entry = entries.next().unwrap().unwrap();
        let content = std::fs::read_to_string(entry.path()).unwrap();

        assert!(content.contains("reseller@example.com"));
        assert!(content.contains("Reset your"));
        assert!(content.contains("Asha"));
    }

    #[tokio::test]
    async fn test_subscription_email_names_the_plan() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with_file_transport(dir.path());

        let service = EmailService::new(&config).unwrap();
        service
            .send_subscription_activated("reseller@example.com", None, "Starter", None)
            .await
            .unwrap();

        let entry = std::fs::read_dir(dir.path()).unwrap().next().unwrap().unwrap();
        let content = std::fs::read_to_string(entry.path()).unwrap();

        assert!(content.contains("Starter"));
        // No display name falls back to a generic greeting
        assert!(content.contains("Hi there"));
    }
}
