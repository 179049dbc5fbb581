pub mod notify;
pub mod service;

pub use notify::{LogNotifier, MemoryNotifier, Notification, NotificationLevel, Notifier};
pub use service::{IntakeService, IntakeState, ServiceError, user_facing_error};
