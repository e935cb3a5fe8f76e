//! User Notifications
//!
//! Transient warnings and errors for the shell to display. The organizer
//! only sends; whoever owns the receiver decides how to show them.

use chrono::{DateTime, Local};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
    pub at: DateTime<Local>,
}

pub type NotificationReceiver = mpsc::UnboundedReceiver<Notification>;

/// Sending half of the notification channel
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl Notifier {
    pub fn channel() -> (Self, NotificationReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.send(NotificationLevel::Warning, String::new(), message.into());
    }

    pub fn error(&self, title: impl Into<String>, message: impl Into<String>) {
        self.send(NotificationLevel::Error, title.into(), message.into());
    }

    fn send(&self, level: NotificationLevel, title: String, message: String) {
        let notification = Notification {
            level,
            title,
            message,
            at: Local::now(),
        };
        if self.tx.send(notification).is_err() {
            log::debug!("Notification dropped, no receiver");
        }
    }
}
