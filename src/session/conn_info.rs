use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

/// Per-connection transient state (§3 ConnInfo). The outbound queue itself
/// lives on `Connection`; this struct is the part handlers read/mutate.
pub struct ConnInfo {
    subscriptions: Mutex<HashSet<String>>,
    logged_in: AtomicBool,
    username: Mutex<String>,
}

impl Default for ConnInfo {
    fn default() -> Self {
        Self {
            subscriptions: Mutex::new(HashSet::new()),
            logged_in: AtomicBool::new(false),
            username: Mutex::new("<unknown>".to_string()),
        }
    }
}

impl ConnInfo {
    pub fn is_logged_in(&self) -> bool {
        self.logged_in.load(Ordering::Acquire)
    }

    /// Becomes logged-in exactly once per session; later calls are no-ops
    /// on the flag but still update the username (not expected to happen
    /// in practice, since login/register reject an already logged-in caller).
    pub fn log_in(&self, username: &str) {
        *self.username.lock() = username.to_string();
        self.logged_in.store(true, Ordering::Release);
    }

    pub fn username(&self) -> String {
        self.username.lock().clone()
    }

    pub fn subscribe(&self, channel: &str) {
        self.subscriptions.lock().insert(channel.to_string());
    }

    pub fn unsubscribe(&self, channel: &str) {
        self.subscriptions.lock().remove(channel);
    }

    pub fn is_subscribed(&self, channel: &str) -> bool {
        self.subscriptions.lock().contains(channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_logged_out_with_unknown_username() {
        let info = ConnInfo::default();
        assert!(!info.is_logged_in());
        assert_eq!(info.username(), "<unknown>");
    }

    #[test]
    fn subscribe_toggle() {
        let info = ConnInfo::default();
        info.subscribe("general");
        assert!(info.is_subscribed("general"));
        info.unsubscribe("general");
        assert!(!info.is_subscribed("general"));
    }
}
