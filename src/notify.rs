//! User-facing error notifications for code outside the UI layer.
//!
//! Non-UI modules receive an [`ErrorReporter`] and publish through it; the
//! UI holds a receiver from [`ErrorBus::subscribe`] and decides how to show
//! each notice.

use tokio::sync::broadcast;

/// One message meant for the person using the app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorNotice {
    /// Short heading, e.g. the failed action.
    pub title: String,
    /// Human-readable detail.
    pub message: String,
}

/// Owner of the notification channel.
#[derive(Debug, Clone)]
pub struct ErrorBus {
    tx: broadcast::Sender<ErrorNotice>,
}

impl ErrorBus {
    /// Creates a bus retaining up to `capacity` unread notices per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Receives every notice published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ErrorNotice> {
        self.tx.subscribe()
    }

    /// Publishing side to hand to non-UI code.
    pub fn reporter(&self) -> ErrorReporter {
        ErrorReporter {
            tx: self.tx.clone(),
        }
    }
}

impl Default for ErrorBus {
    fn default() -> Self {
        Self::new(64)
    }
}

/// Cloneable publisher of [`ErrorNotice`]s.
#[derive(Debug, Clone)]
pub struct ErrorReporter {
    tx: broadcast::Sender<ErrorNotice>,
}

impl ErrorReporter {
    /// Publishes a notice; dropped silently when nobody listens.
    pub fn report(&self, title: impl Into<String>, message: impl Into<String>) {
        let _ = self.tx.send(ErrorNotice {
            title: title.into(),
            message: message.into(),
        });
    }
}
