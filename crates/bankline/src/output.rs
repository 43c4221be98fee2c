//! Console rendering for notifications and audit lines.
//!
//! Everything here goes to stderr so stdout stays parseable.

use bankline_client::{Icon, MessageSink, Notification, Notifier};
use console::Style;

/// Prints notifications as styled one-liners.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleNotifier {
    plain: bool,
}

impl ConsoleNotifier {
    pub fn new(plain: bool) -> Self {
        Self { plain }
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, n: Notification) {
        if self.plain {
            eprintln!("{}: {}", n.title, n.text);
            return;
        }
        let (marker, style) = match n.icon {
            Icon::Success => ("✓", Style::new().green()),
            Icon::Error => ("✗", Style::new().red()),
            Icon::Warning => ("!", Style::new().yellow()),
            Icon::Info => ("i", Style::new().cyan()),
        };
        eprintln!(
            "{} {} {}",
            style.apply_to(marker),
            style.clone().bold().apply_to(&n.title),
            n.text
        );
    }
}

/// Prints audit lines dimmed.
#[derive(Debug, Clone, Copy)]
pub struct AuditSink;

impl MessageSink for AuditSink {
    fn add(&self, message: String) {
        eprintln!("{}", Style::new().dim().apply_to(message));
    }
}
