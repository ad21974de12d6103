//! One-time user notices
//!
//! When the remote database rejects an operation for permission or
//! availability reasons the store switches to local storage and tells
//! the user once, through a `Notifier`.

use tracing::warn;

/// Text shown the first time the store falls back to local storage
pub const PERMISSION_NOTICE: &str = "Remote database permission error.\n\n\
The app is switching to local storage so you can continue working.\n\n\
To fix this permanently:\n\
1. In the Firebase console, open Authentication > Sign-in method\n\
2. Enable the \"Anonymous\" provider\n\
3. Check that your Firestore rules are not blocking access";

/// Receives user-facing notices
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Sends notices to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        warn!("{}", message);
    }
}
