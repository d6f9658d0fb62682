use std::time::{Duration, Instant};
use colored::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Warning,
    Error,
}

/// A transient message for the user, independent of how it is displayed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub text: String,
    pub duration: Duration,
}

impl Notification {
    pub fn new(kind: NotificationKind, text: impl Into<String>, duration: Duration) -> Self {
        Self {
            kind,
            text: text.into(),
            duration,
        }
    }
}

pub trait Notifier {
    fn notify(&mut self, kind: NotificationKind, text: &str, duration: Duration);
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub kind: NotificationKind,
    pub text: String,
    expires_at: Instant,
}

/// Toast overlay state for the TUI. Toasts expire on their own and the newest
/// one can be dismissed early.
#[derive(Debug, Default)]
pub struct ToastCenter {
    toasts: Vec<Toast>,
}

impl ToastCenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_at(&mut self, kind: NotificationKind, text: &str, duration: Duration, now: Instant) {
        self.toasts.push(Toast {
            kind,
            text: text.to_string(),
            expires_at: now + duration,
        });
    }

    /// Drop every toast whose display time has elapsed
    pub fn prune(&mut self, now: Instant) {
        self.toasts.retain(|t| t.expires_at > now);
    }

    /// Dismiss the newest toast. Returns false when nothing was showing.
    pub fn dismiss(&mut self) -> bool {
        self.toasts.pop().is_some()
    }

    pub fn visible(&self) -> &[Toast] {
        &self.toasts
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }
}

impl Notifier for ToastCenter {
    fn notify(&mut self, kind: NotificationKind, text: &str, duration: Duration) {
        self.push_at(kind, text, duration, Instant::now());
    }
}

/// Prints notifications straight to stderr for the headless command
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&mut self, kind: NotificationKind, text: &str, _duration: Duration) {
        let line = match kind {
            NotificationKind::Success => format!("✔ {}", text).green(),
            NotificationKind::Warning => format!("⚠ {}", text).yellow(),
            NotificationKind::Error => format!("✘ {}", text).red(),
        };
        eprintln!("{}", line);
        tracing::debug!(?kind, text, "notification");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toast_expires_after_duration() {
        let start = Instant::now();
        let mut center = ToastCenter::new();
        center.push_at(NotificationKind::Success, "saved", Duration::from_millis(5000), start);

        center.prune(start + Duration::from_millis(4999));
        assert_eq!(center.visible().len(), 1);

        center.prune(start + Duration::from_millis(5000));
        assert!(center.is_empty());
    }

    #[test]
    fn test_dismiss_removes_newest() {
        let start = Instant::now();
        let mut center = ToastCenter::new();
        center.push_at(NotificationKind::Success, "one", Duration::from_secs(5), start);
        center.push_at(NotificationKind::Warning, "two", Duration::from_secs(5), start);

        assert!(center.dismiss());
        assert_eq!(center.visible().len(), 1);
        assert_eq!(center.visible()[0].text, "one");
        assert!(center.dismiss());
        assert!(!center.dismiss());
    }
}
