/// User-visible notifications (toasts)

use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub title: String,
    pub detail: Option<String>,
}

impl Notification {
    pub fn new(level: Level, title: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Forwards notifications to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, n: Notification) {
        let detail = n.detail.as_deref().unwrap_or("");
        match n.level {
            Level::Info | Level::Success => log::info!("{} {}", n.title, detail),
            Level::Warning => log::warn!("{} {}", n.title, detail),
            Level::Error => log::error!("{} {}", n.title, detail),
        }
    }
}

/// Keeps every notification in memory.
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl CollectingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn count(&self, level: Level) -> usize {
        self.notifications().iter().filter(|n| n.level == level).count()
    }
}

impl Notifier for CollectingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collecting_notifier_records_in_order() {
        let n = CollectingNotifier::new();
        n.notify(Notification::new(Level::Warning, "User not found"));
        n.notify(Notification::new(Level::Error, "Unable to fetch user").with_detail("HTTP 500"));
        let all = n.notifications();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].detail.as_deref(), Some("HTTP 500"));
        assert_eq!(n.count(Level::Error), 1);
    }
}
