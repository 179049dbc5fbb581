use serde::Serialize;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NotificationLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

/// Surface for short user-visible messages (toast, snackbar, stderr...).
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Routes notifications to the `log` facade.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Info => log::info!("{}", notification.message),
            NotificationLevel::Error => log::error!("{}", notification.message),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryNotifier {
    pub notifications: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub fn take(&self) -> Vec<Notification> {
        match self.notifications.lock() {
            Ok(mut v) => std::mem::take(&mut *v),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: Notification) {
        match self.notifications.lock() {
            Ok(mut v) => v.push(notification),
            Err(poisoned) => poisoned.into_inner().push(notification),
        }
    }
}
