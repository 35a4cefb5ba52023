//! Timed clipboard clearing.
//!
//! Addresses and (worse) recovery phrases routinely pass through the
//! clipboard, where any process can read them. `protect` writes through
//! the platform seam and schedules a clear that fires regardless of
//! application foreground state — but only if the clipboard still holds
//! what we put there; content the user copied afterwards is left alone.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

use palisade_crypto::hskdf::log_fingerprint;

use crate::config::ClipboardConfig;

pub const DEFAULT_CLEAR_TIMEOUT_SECS: u64 = 60;
pub const SENSITIVE_CLEAR_TIMEOUT_SECS: u64 = 30;

/// Platform clipboard seam. Implementations wrap the OS pasteboard; the
/// mock backs tests and headless environments.
pub trait ClipboardPlatform: Send + Sync {
    fn set_text(&self, content: &str);
    fn get_text(&self) -> Option<String>;
    fn clear(&self);
}

/// In-memory clipboard double.
#[derive(Default)]
pub struct MockClipboard {
    content: Mutex<Option<String>>,
}

impl MockClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClipboardPlatform for MockClipboard {
    fn set_text(&self, content: &str) {
        *self.content.lock() = Some(content.to_string());
    }

    fn get_text(&self) -> Option<String> {
        self.content.lock().clone()
    }

    fn clear(&self) {
        *self.content.lock() = None;
    }
}

pub struct ClipboardGuard {
    platform: Arc<dyn ClipboardPlatform>,
    default_timeout: Duration,
    sensitive_timeout: Duration,
}

impl ClipboardGuard {
    pub fn new(platform: Arc<dyn ClipboardPlatform>, config: &ClipboardConfig) -> Self {
        Self {
            platform,
            default_timeout: Duration::from_secs(config.default_clear_secs),
            sensitive_timeout: Duration::from_secs(config.sensitive_clear_secs),
        }
    }

    /// Copy `content` and schedule automatic clearing. `timeout` of
    /// `None` picks the configured default (the shorter sensitive window
    /// when `is_sensitive`). Returns the clearing task's handle.
    pub fn protect(
        &self,
        content: &str,
        timeout: Option<Duration>,
        is_sensitive: bool,
    ) -> JoinHandle<()> {
        let timeout = timeout.unwrap_or(if is_sensitive {
            self.sensitive_timeout
        } else {
            self.default_timeout
        });

        self.platform.set_text(content);
        if is_sensitive {
            debug!(
                content = %log_fingerprint(content.as_bytes()),
                clear_in = timeout.as_secs(),
                "sensitive content on clipboard"
            );
        }

        let platform = self.platform.clone();
        let expected = content.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            // Best effort: only clear what we set. Anything copied in the
            // interim belongs to the user.
            if platform.get_text().as_deref() == Some(expected.as_str()) {
                platform.clear();
            }
        })
    }

    pub fn get_content(&self) -> Option<String> {
        self.platform.get_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoreConfig;

    fn guard() -> (ClipboardGuard, Arc<MockClipboard>) {
        let platform = Arc::new(MockClipboard::new());
        let guard = ClipboardGuard::new(platform.clone(), &CoreConfig::default().clipboard);
        (guard, platform)
    }

    #[tokio::test(start_paused = true)]
    async fn clears_own_content_after_timeout() {
        let (guard, _) = guard();
        let task = guard.protect("0xdeadbeef", Some(Duration::from_secs(5)), false);
        assert_eq!(guard.get_content().as_deref(), Some("0xdeadbeef"));
        task.await.unwrap();
        assert!(guard.get_content().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn leaves_interim_user_content_alone() {
        let (guard, platform) = guard();
        let task = guard.protect("0xdeadbeef", Some(Duration::from_secs(5)), false);
        platform.set_text("user copied this meanwhile");
        task.await.unwrap();
        assert_eq!(
            guard.get_content().as_deref(),
            Some("user copied this meanwhile")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn sensitive_content_uses_the_short_window() {
        let (guard, _) = guard();
        let task = guard.protect("ordinary address", None, false);
        let sensitive = guard.protect("recovery phrase words", None, true);
        // The sensitive task finishes first by construction (30s < 60s);
        // both end with the clipboard cleared of whatever they set.
        sensitive.await.unwrap();
        task.await.unwrap();
        assert!(guard.get_content().is_none());
    }
}
