//! Pending correlation tokens.

use crate::installer::{CallbackToken, OperationKind};
use crate::package::PackageIdentity;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Tokens for asynchronous requests whose outcome has not arrived yet.
///
/// The orchestrator registers a token right before handing it to the
/// installer; the completion receiver releases it on a terminal status.
#[derive(Debug, Default)]
pub struct CorrelationRegistry {
    pending: Mutex<HashMap<CallbackToken, Instant>>,
}

impl CorrelationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `token` as pending. Returns `false` if it already was.
    pub fn register(&self, token: CallbackToken) -> bool {
        self.pending.lock().insert(token, Instant::now()).is_none()
    }

    /// Drop `token`. Returns `false` if it was not pending.
    pub fn release(&self, token: &CallbackToken) -> bool {
        self.pending.lock().remove(token).is_some()
    }

    /// Drop every token for `package`. Returns how many were pending.
    pub fn release_package(&self, package: &PackageIdentity) -> usize {
        let mut pending = self.pending.lock();
        let before = pending.len();
        pending.retain(|token, _| &token.package != package);
        before - pending.len()
    }

    pub fn is_pending(&self, token: &CallbackToken) -> bool {
        self.pending.lock().contains_key(token)
    }

    /// Operation kinds still pending for `package`.
    pub fn pending_for(&self, package: &PackageIdentity) -> Vec<OperationKind> {
        self.pending
            .lock()
            .keys()
            .filter(|token| &token.package == package)
            .map(|token| token.kind)
            .collect()
    }

    /// When `token` was registered, if it is still pending.
    pub fn pending_since(&self, token: &CallbackToken) -> Option<Instant> {
        self.pending.lock().get(token).copied()
    }

    /// Tokens that have been pending for at least `age`.
    ///
    /// A callback that never arrives leaves its token here; hosts can use
    /// this to notice and surface such requests.
    pub fn overdue(&self, age: Duration) -> Vec<CallbackToken> {
        let now = Instant::now();
        self.pending
            .lock()
            .iter()
            .filter(|(_, since)| now.duration_since(**since) >= age)
            .map(|(token, _)| token.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}
