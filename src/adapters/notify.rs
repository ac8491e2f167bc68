use crate::core::{Notification, Notifier, Severity};
use tokio::sync::mpsc;

/// Writes notifications to the log. Used by the CLI and in headless runs.
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.severity {
            Severity::Success => tracing::info!("✅ {}", notification.message),
            Severity::Info => tracing::info!("ℹ️ {}", notification.message),
            Severity::Error => tracing::error!("❌ {}", notification.message),
        }
    }
}

/// Forwards notifications to whatever presents them (toasts, status bar).
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        if self.sender.send(notification).is_err() {
            tracing::debug!("Notification receiver dropped");
        }
    }
}
