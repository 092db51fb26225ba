use std::sync::{Mutex, PoisonError};

const APP_NAME: &str = "ChronoMap";

/// Display-only surface for collaborator failures and confirmations.
pub trait Notifier: Send + Sync {
    fn notify(&self, body: &str);
}

/// Desktop notifications through the session's notification daemon.
#[derive(Debug, Clone, Copy, Default)]
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn notify(&self, body: &str) {
        send(body);
    }
}

pub fn send(body: impl Into<String>) {
    let body = body.into();
    if let Err(err) = notify_rust::Notification::new()
        .appname(APP_NAME)
        .summary(APP_NAME)
        .body(&body)
        .show()
    {
        tracing::warn!("system notification failed: {err}");
    }
}

/// Keeps every message; used by tests and the headless shell.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.messages.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, body: &str) {
        tracing::info!(message = body, "notification");
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(body.to_string());
    }
}
