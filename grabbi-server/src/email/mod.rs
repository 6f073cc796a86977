//! Transactional email
//!
//! Handlers never send mail directly: they build a [`Notification`] after
//! their transaction commits and hand it to the [`Notifier`], which queues it
//! for the background [`MailWorker`].

mod worker;

pub use worker::{MailWorker, Notifier, QUEUE_CAPACITY};

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use rust_decimal::Decimal;
use shared::models::OrderStatus;
use thiserror::Error;

use crate::config::SmtpConfig;

#[derive(Error, Debug)]
pub enum MailError {
    #[error("invalid address '{0}'")]
    Address(String),

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("SMTP transport error: {0}")]
    Transport(String),
}

/// Rendered, ready-to-send email
#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body_text: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError>;
}

/// SMTP delivery over STARTTLS
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| MailError::Transport(e.to_string()))?
            .port(config.port);
        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }
        Ok(Self {
            transport: builder.build(),
            from: config.from.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        let email = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|_| MailError::Address(self.from.clone()))?,
            )
            .to(message
                .to
                .parse()
                .map_err(|_| MailError::Address(message.to.clone()))?)
            .subject(&message.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(message.body_text)
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        Ok(())
    }
}

/// Used when SMTP is not configured
pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        tracing::debug!(to = %message.to, subject = %message.subject, "Email disabled, message discarded");
        Ok(())
    }
}

/// Events that produce an email
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    OrderConfirmation {
        to: String,
        name: String,
        order_number: String,
        total: Decimal,
    },
    StatusUpdate {
        to: String,
        name: String,
        order_number: String,
        status: OrderStatus,
    },
    PasswordReset {
        to: String,
        name: String,
        reset_link: String,
    },
}

impl Notification {
    pub fn render(&self) -> EmailMessage {
        match self {
            Notification::OrderConfirmation {
                to,
                name,
                order_number,
                total,
            } => EmailMessage {
                to: to.clone(),
                subject: format!("Order {order_number} received"),
                body_text: format!(
                    "Hi {name},\n\n\
                     Thanks for your order {order_number}.\n\
                     Total: {total}\n\n\
                     We'll let you know as it moves along.\n\n\
                     Grabbi"
                ),
            },
            Notification::StatusUpdate {
                to,
                name,
                order_number,
                status,
            } => EmailMessage {
                to: to.clone(),
                subject: format!("Order {order_number}: {}", status_label(*status)),
                body_text: format!(
                    "Hi {name},\n\n\
                     Your order {order_number} is now {}.\n\n\
                     Grabbi",
                    status_label(*status).to_lowercase()
                ),
            },
            Notification::PasswordReset {
                to,
                name,
                reset_link,
            } => EmailMessage {
                to: to.clone(),
                subject: "Reset your Grabbi password".to_string(),
                body_text: format!(
                    "Hi {name},\n\n\
                     Use the link below to choose a new password:\n\
                     {reset_link}\n\n\
                     The link is valid for 1 hour. If you did not ask for this, ignore this email.\n\n\
                     Grabbi"
                ),
            },
        }
    }
}

fn status_label(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "Pending",
        OrderStatus::Confirmed => "Confirmed",
        OrderStatus::Preparing => "Being prepared",
        OrderStatus::Ready => "Ready",
        OrderStatus::OutForDelivery => "Out for delivery",
        OrderStatus::Delivered => "Delivered",
        OrderStatus::Cancelled => "Cancelled",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_order_confirmation() {
        let msg = Notification::OrderConfirmation {
            to: "ana@example.com".into(),
            name: "Ana".into(),
            order_number: "ORD20250101120000ABCDEF12".into(),
            total: Decimal::new(4299, 2),
        }
        .render();
        assert_eq!(msg.to, "ana@example.com");
        assert_eq!(msg.subject, "Order ORD20250101120000ABCDEF12 received");
        assert!(msg.body_text.contains("42.99"));
    }

    #[test]
    fn test_render_status_update() {
        let msg = Notification::StatusUpdate {
            to: "ana@example.com".into(),
            name: "Ana".into(),
            order_number: "ORD1".into(),
            status: OrderStatus::OutForDelivery,
        }
        .render();
        assert_eq!(msg.subject, "Order ORD1: Out for delivery");
        assert!(msg.body_text.contains("is now out for delivery"));
    }

    #[test]
    fn test_render_password_reset_contains_link() {
        let msg = Notification::PasswordReset {
            to: "ana@example.com".into(),
            name: "Ana".into(),
            reset_link: "http://localhost:3000/reset-password?token=abc".into(),
        }
        .render();
        assert!(
            msg.body_text
                .contains("http://localhost:3000/reset-password?token=abc")
        );
    }
}
