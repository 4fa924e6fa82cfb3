use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{info, warn};

use crate::config::MailConfig;

pub mod templates;

/// A rendered HTML email ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> anyhow::Result<()>;
}

/// SMTP relay transport (Gmail by default).
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(host: &str, username: &str, password: &str) -> anyhow::Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .with_context(|| format!("smtp relay {}", host))?
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .build();
        Ok(Self { transport })
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, mail: &OutgoingMail) -> anyhow::Result<()> {
        let message = Message::builder()
            .from(mail.from.parse().context("parse from address")?)
            .to(mail.to.parse().context("parse to address")?)
            .subject(mail.subject.as_str())
            .header(ContentType::TEXT_HTML)
            .body(mail.html.clone())
            .context("build message")?;
        self.transport.send(message).await.context("smtp send")?;
        Ok(())
    }
}

/// How a caller treats a delivery failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailPolicy {
    /// Log and carry on.
    BestEffort,
    /// Report the failure to the caller.
    Required,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailOutcome {
    Sent,
    /// Mail is switched off; counts as success.
    Skipped,
    /// Delivery failed under [`MailPolicy::BestEffort`].
    Dropped,
}

/// Mail capability: either a live transport or switched off by configuration.
#[derive(Clone)]
pub enum Mailer {
    Enabled(Arc<dyn MailTransport>),
    Disabled,
}

impl Mailer {
    pub fn from_config(cfg: &MailConfig) -> anyhow::Result<Self> {
        if !cfg.enabled {
            info!("email service disabled (ENABLE_EMAIL=false)");
            return Ok(Mailer::Disabled);
        }
        let (Some(user), Some(pass)) = (cfg.username.as_deref(), cfg.password.as_deref()) else {
            anyhow::bail!("email enabled but credentials are missing");
        };
        let smtp = SmtpMailer::new(&cfg.smtp_host, user, pass)?;
        info!(host = %cfg.smtp_host, "email service enabled");
        Ok(Mailer::Enabled(Arc::new(smtp)))
    }

    pub async fn dispatch(
        &self,
        mail: &OutgoingMail,
        policy: MailPolicy,
    ) -> anyhow::Result<MailOutcome> {
        let transport = match self {
            Mailer::Enabled(t) => t,
            Mailer::Disabled => {
                info!(subject = %mail.subject, "email disabled, skipping send");
                return Ok(MailOutcome::Skipped);
            }
        };
        match transport.send(mail).await {
            Ok(()) => {
                info!(to = %mail.to, subject = %mail.subject, "email sent");
                Ok(MailOutcome::Sent)
            }
            Err(e) => match policy {
                MailPolicy::BestEffort => {
                    warn!(error = %e, to = %mail.to, "email send failed, continuing");
                    Ok(MailOutcome::Dropped)
                }
                MailPolicy::Required => Err(e.context("email send failed")),
            },
        }
    }
}

#[cfg(test)]
pub mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Records every message; fails every send when `fail` is set.
    #[derive(Default)]
    pub struct FakeTransport {
        pub sent: Mutex<Vec<OutgoingMail>>,
        pub fail: bool,
    }

    impl FakeTransport {
        pub fn failing() -> Self {
            Self { fail: true, ..Default::default() }
        }

        pub fn sent(&self) -> Vec<OutgoingMail> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MailTransport for FakeTransport {
        async fn send(&self, mail: &OutgoingMail) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("smtp connection refused");
            }
            self.sent.lock().unwrap().push(mail.clone());
            Ok(())
        }
    }
}
