//! Completion receivers.
//!
//! The platform installer reports the outcome of preapproval, commit and
//! uninstall requests out of band. Each report is a [`CompletionEvent`]
//! carrying the [`CallbackToken`] the request was made with. The
//! [`CompletionReceiver`] classifies it:
//!
//! - pending user action: hand the attached [`UserAction`] to the host so it
//!   can raise a foreground interaction
//! - success: release the correlation and log
//! - anything else: release the correlation and report an
//!   [`OperationFailure`] to the host
//!
//! # Example
//!
//! ```rust
//! use catalog_installer::{
//!     CallbackToken, CompletionEvent, CompletionOutcome, CompletionReceiver,
//!     CorrelationRegistry, InstallerHost, OperationFailure, PackageIdentity, UserAction,
//! };
//! use std::sync::Arc;
//!
//! struct Host;
//!
//! impl InstallerHost for Host {
//!     fn launch_user_action(&self, _token: &CallbackToken, action: &UserAction) {
//!         println!("confirm: {}", action.target);
//!     }
//!     fn report_failure(&self, failure: &OperationFailure) {
//!         eprintln!("{}", failure);
//!     }
//! }
//!
//! let registry = Arc::new(CorrelationRegistry::new());
//! let receiver = CompletionReceiver::new(registry, Arc::new(Host));
//! let token = CallbackToken::install(PackageIdentity::new("com.example.app"));
//!
//! let outcome = receiver.handle(CompletionEvent::new(token, 0)).unwrap();
//! assert_eq!(outcome, CompletionOutcome::Succeeded);
//! ```

mod registry;
mod status;

pub use registry::CorrelationRegistry;
pub use status::{FailureKind, InstallStatus, STATUS_PENDING_USER_ACTION, STATUS_SUCCESS};

use crate::installer::{CallbackToken, OperationKind, PreapprovalDetails};
use crate::package::PackageIdentity;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Follow-up interaction embedded in a pending-user-action callback.
///
/// The target is opaque to this crate; the host knows how to launch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAction {
    pub target: String,
}

impl UserAction {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

/// An outcome delivered by the platform installer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionEvent {
    /// Token the originating request was made with.
    pub token: CallbackToken,
    /// Raw status code, if the installer sent one.
    pub status: Option<i32>,
    /// Human-readable status message.
    pub message: Option<String>,
    /// Preapproval details, for preapproval callbacks.
    pub preapproval: Option<PreapprovalDetails>,
    /// Follow-up interaction, for pending-user-action callbacks.
    pub user_action: Option<UserAction>,
}

impl CompletionEvent {
    pub fn new(token: CallbackToken, status: i32) -> Self {
        Self {
            token,
            status: Some(status),
            message: None,
            preapproval: None,
            user_action: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_preapproval(mut self, details: PreapprovalDetails) -> Self {
        self.preapproval = Some(details);
        self
    }

    pub fn with_user_action(mut self, action: UserAction) -> Self {
        self.user_action = Some(action);
        self
    }
}

/// A terminal failure of an asynchronous operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationFailure {
    pub package: PackageIdentity,
    pub kind: OperationKind,
    pub failure: FailureKind,
    /// Raw status code, `None` when the status was missing.
    pub code: Option<i32>,
    pub message: String,
    /// Preapproval details, when the failure is a preapproval failure.
    pub details: Option<PreapprovalDetails>,
}

impl fmt::Display for OperationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.kind {
            OperationKind::Preapproval => "Preapproval",
            OperationKind::Install => "Install",
            OperationKind::Uninstall => "Uninstall",
        };
        write!(f, "{} failed for {}: {}", what, self.package, self.message)
    }
}

/// What handling a completion event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    Succeeded,
    UserActionLaunched,
    Failed(OperationFailure),
}

/// Errors from handling a completion event.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum CompletionError {
    /// A pending-user-action callback arrived without its follow-up.
    #[error("No follow-up user action attached to pending {token}")]
    MissingUserAction { token: CallbackToken },
}

/// Host-side surfaces the receiver drives.
pub trait InstallerHost: Send + Sync {
    /// Raise the foreground interaction the installer asked for.
    fn launch_user_action(&self, token: &CallbackToken, action: &UserAction);

    /// Surface a terminal failure to the user.
    fn report_failure(&self, failure: &OperationFailure);
}

/// Classifies completion events and drives the host accordingly.
pub struct CompletionReceiver {
    registry: Arc<CorrelationRegistry>,
    host: Arc<dyn InstallerHost>,
}

impl CompletionReceiver {
    pub fn new(registry: Arc<CorrelationRegistry>, host: Arc<dyn InstallerHost>) -> Self {
        Self { registry, host }
    }

    /// Handle one completion event.
    pub fn handle(&self, event: CompletionEvent) -> Result<CompletionOutcome, CompletionError> {
        let CompletionEvent {
            token,
            status,
            message,
            preapproval,
            user_action,
        } = event;

        if !self.registry.is_pending(&token) {
            debug!(token = %token, "Completion for a token that is not pending");
        }

        match InstallStatus::from_raw(status) {
            InstallStatus::PendingUserAction => {
                let Some(action) = user_action else {
                    warn!(token = %token, "Pending user action without a follow-up");
                    return Err(CompletionError::MissingUserAction { token });
                };
                debug!(token = %token, action = %action.target, "Launching user action");
                self.host.launch_user_action(&token, &action);
                Ok(CompletionOutcome::UserActionLaunched)
            }
            InstallStatus::Success => {
                // An approved preapproval still has its install ahead of it.
                if token.kind == OperationKind::Preapproval {
                    self.registry.release(&token);
                } else {
                    self.registry.release_package(&token.package);
                }
                info!(package = %token.package, operation = %token.kind, "Operation succeeded");
                Ok(CompletionOutcome::Succeeded)
            }
            InstallStatus::Failure { kind, code } => {
                self.registry.release(&token);
                let message = message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| kind.description().to_string());
                let failure = OperationFailure {
                    package: token.package,
                    kind: token.kind,
                    failure: kind,
                    code,
                    message,
                    details: preapproval,
                };
                error!(
                    package = %failure.package,
                    operation = %failure.kind,
                    failure = %failure.failure,
                    code = ?failure.code,
                    "{}",
                    failure
                );
                self.host.report_failure(&failure);
                Ok(CompletionOutcome::Failed(failure))
            }
        }
    }

    /// Handle events from `events` until every sender is dropped.
    pub async fn run(self, mut events: mpsc::Receiver<CompletionEvent>) {
        while let Some(event) = events.recv().await {
            if let Err(e) = self.handle(event) {
                error!(error = %e, "Failed to handle completion event");
            }
        }
        debug!("Completion channel closed");
    }
}
