//! Transient notification queue. Adding a toast returns immediately and
//! spawns a timer that removes it after its duration; removal by id is a
//! no-op when the toast is already gone, so a timer racing a manual removal
//! is harmless. The queue is a cheap-clone handle; consumers read snapshots
//! and only `add`/`remove` mutate.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::sleep;
use ulid::Ulid;

pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Warning,
    Info,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toast {
    pub id: String,
    pub kind: ToastKind,
    pub title: String,
    pub message: Option<String>,
    pub duration: Duration,
}

#[derive(Clone, Default)]
pub struct ToastQueue {
    inner: Arc<Mutex<Vec<Toast>>>,
}

impl ToastQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a toast and schedule its removal after `duration` (default 5s).
    /// Returns the toast id without waiting. Must be called within a tokio
    /// runtime; the expiry timer is spawned onto it.
    pub fn add(
        &self,
        kind: ToastKind,
        title: &str,
        message: Option<&str>,
        duration: Option<Duration>,
    ) -> String {
        let id = Ulid::new().to_string();
        let duration = duration.unwrap_or(DEFAULT_TOAST_DURATION);

        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Toast {
                id: id.clone(),
                kind,
                title: title.to_string(),
                message: message.map(str::to_string),
                duration,
            });

        let queue = self.clone();
        let expired_id = id.clone();
        tokio::spawn(async move {
            sleep(duration).await;
            queue.remove(&expired_id);
        });

        id
    }

    /// Remove the toast with the given id, if it is still present.
    pub fn remove(&self, id: &str) {
        let mut toasts = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(index) = toasts.iter().position(|toast| toast.id == id) {
            toasts.remove(index);
        }
    }

    /// Read-only snapshot of the active toasts, in insertion order.
    #[must_use]
    pub fn toasts(&self) -> Vec<Toast> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn success(&self, title: &str, message: Option<&str>, duration: Option<Duration>) -> String {
        self.add(ToastKind::Success, title, message, duration)
    }

    pub fn error(&self, title: &str, message: Option<&str>, duration: Option<Duration>) -> String {
        self.add(ToastKind::Error, title, message, duration)
    }

    pub fn warning(&self, title: &str, message: Option<&str>, duration: Option<Duration>) -> String {
        self.add(ToastKind::Warning, title, message, duration)
    }

    pub fn info(&self, title: &str, message: Option<&str>, duration: Option<Duration>) -> String {
        self.add(ToastKind::Info, title, message, duration)
    }
}

impl std::fmt::Debug for ToastQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToastQueue")
            .field("toasts", &self.toasts())
            .finish()
    }
}
