//! User-facing notifications and the audit message sink.
//!
//! Rendering belongs to the view layer. The pipeline only decides what to
//! say and when, then hands a [`Notification`] to a [`Notifier`].

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Icon shown next to a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Icon {
    Success,
    Error,
    Warning,
    Info,
}

/// A user-facing alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub icon: Icon,
    pub title: String,
    pub text: String,
}

impl Notification {
    pub fn new(icon: Icon, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            icon,
            title: title.into(),
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(Icon::Error, "Error", text)
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(Icon::Success, "Success", text)
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(Icon::Warning, "Warning", text)
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(Icon::Info, "Information", text)
    }
}

/// Receives user-facing alerts.
pub trait Notifier: Send + Sync + std::fmt::Debug {
    fn notify(&self, notification: Notification);
}

/// Notifier that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, n: Notification) {
        match n.icon {
            Icon::Error => tracing::error!(title = %n.title, "{}", n.text),
            Icon::Warning => tracing::warn!(title = %n.title, "{}", n.text),
            Icon::Success | Icon::Info => tracing::info!(title = %n.title, "{}", n.text),
        }
    }
}

/// Notifier that keeps every notification in memory.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.notifications.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.lock().is_empty()
    }

    /// Remove and return everything recorded so far.
    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.notifications.lock())
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: Notification) {
        self.notifications.lock().push(notification);
    }
}

/// External sink for one-line audit messages.
pub trait MessageSink: Send + Sync + std::fmt::Debug {
    fn add(&self, message: String);
}

/// Sink that keeps messages in memory.
#[derive(Debug, Default)]
pub struct MessageLog {
    messages: Mutex<Vec<String>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

impl MessageSink for MessageLog {
    fn add(&self, message: String) {
        self.messages.lock().push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_notifier_records_in_order() {
        let notifier = MemoryNotifier::new();
        notifier.notify(Notification::warning("first"));
        notifier.notify(Notification::error("second"));

        let all = notifier.drain();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].title, "Warning");
        assert_eq!(all[1].icon, Icon::Error);
        assert!(notifier.is_empty());
    }

    #[test]
    fn test_notification_serializes_lowercase_icon() {
        let json = serde_json::to_value(Notification::info("hi")).unwrap();
        assert_eq!(json["icon"], "info");
        assert_eq!(json["title"], "Information");
    }
}
