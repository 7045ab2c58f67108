//! Best-effort user notification seam.

use tracing::info;

/// Fire-and-forget notification channel.
///
/// Delivery failures are reported back as strings so callers can log them;
/// they are never propagated as operation failures.
pub trait Notifier: Send + Sync {
    /// Attempts to show `title`/`message` to the user.
    fn notify(&self, title: &str, message: &str) -> Result<(), String>;
}

impl<T: Notifier + ?Sized> Notifier for std::sync::Arc<T> {
    fn notify(&self, title: &str, message: &str) -> Result<(), String> {
        (**self).notify(title, message)
    }
}

/// Notifier that writes to the log instead of a desktop channel.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, message: &str) -> Result<(), String> {
        info!(title, message, "user notification");
        Ok(())
    }
}
