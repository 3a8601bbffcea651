use super::{Notification, Notifier, NotifyError};
use crate::config::SmtpConfig;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

/// Delivers notifications over SMTP
#[derive(Clone)]
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpNotifier {
    pub fn new(config: &SmtpConfig) -> Result<Self, NotifyError> {
        let credentials = Credentials::new(config.username.clone(), config.password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|e| NotifyError::Transport(format!("SMTP relay error: {e}")))?
            .port(config.port)
            .credentials(credentials)
            .build();

        Ok(Self {
            transport,
            from: format!("{} <{}>", config.sender_name, config.sender_email),
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let email = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| NotifyError::InvalidAddress(format!("from: {e}")))?,
            )
            .to(notification
                .recipient
                .parse()
                .map_err(|e| NotifyError::InvalidAddress(format!("to: {e}")))?)
            .subject(notification.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(notification.html_body.clone())
            .map_err(|e| NotifyError::Build(e.to_string()))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        Ok(())
    }
}
