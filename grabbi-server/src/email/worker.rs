//! Mail queue
//!
//! Bounded mpsc channel drained by one background task. Sending never blocks
//! a request: when the queue is full the message is dropped with a warning.

use std::sync::Arc;
use tokio::sync::mpsc;

use super::{Mailer, Notification};

pub const QUEUE_CAPACITY: usize = 256;

/// Producer half, cloned into `AppState`
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::Sender<Notification>,
}

impl Notifier {
    /// Create the queue; spawn the returned worker with `tokio::spawn(worker.run())`
    pub fn new(mailer: Arc<dyn Mailer>, capacity: usize) -> (Self, MailWorker) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, MailWorker { mailer, rx })
    }

    /// Queue a notification; returns false if it was dropped
    pub fn send(&self, notification: Notification) -> bool {
        match self.tx.try_send(notification) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(n)) => {
                tracing::warn!(to = %n.render().to, "Mail queue full, notification dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!("Mail worker stopped, notification dropped");
                false
            }
        }
    }
}

/// Consumer half
pub struct MailWorker {
    mailer: Arc<dyn Mailer>,
    rx: mpsc::Receiver<Notification>,
}

impl MailWorker {
    /// Runs until every `Notifier` is dropped
    pub async fn run(mut self) {
        tracing::info!("Mail worker started");

        while let Some(notification) = self.rx.recv().await {
            let message = notification.render();
            let to = message.to.clone();
            let subject = message.subject.clone();
            match self.mailer.send(message).await {
                Ok(()) => tracing::debug!(to = %to, subject = %subject, "Email sent"),
                Err(e) => tracing::error!(to = %to, subject = %subject, error = %e, "Failed to send email"),
            }
        }

        tracing::info!("Mail channel closed, worker stopping");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::{EmailMessage, MailError};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<EmailMessage>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }
    }

    fn reset(to: &str) -> Notification {
        Notification::PasswordReset {
            to: to.into(),
            name: "N".into(),
            reset_link: "http://x/reset-password?token=t".into(),
        }
    }

    #[tokio::test]
    async fn test_worker_delivers_in_order() {
        let mailer = Arc::new(RecordingMailer::default());
        let (notifier, worker) = Notifier::new(mailer.clone(), 8);

        assert!(notifier.send(reset("a@example.com")));
        assert!(notifier.send(reset("b@example.com")));
        drop(notifier);
        worker.run().await;

        let sent = mailer.sent.lock().unwrap();
        let to: Vec<_> = sent.iter().map(|m| m.to.as_str()).collect();
        assert_eq!(to, vec!["a@example.com", "b@example.com"]);
    }

    #[tokio::test]
    async fn test_full_queue_drops() {
        let mailer = Arc::new(RecordingMailer::default());
        let (notifier, worker) = Notifier::new(mailer.clone(), 1);

        assert!(notifier.send(reset("a@example.com")));
        assert!(!notifier.send(reset("b@example.com")));
        drop(notifier);
        worker.run().await;

        assert_eq!(mailer.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_send_after_worker_stopped() {
        let (notifier, worker) = Notifier::new(Arc::new(RecordingMailer::default()), 4);
        drop(worker);
        assert!(!notifier.send(reset("a@example.com")));
    }
}
