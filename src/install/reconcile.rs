//! Stale session reconciliation.
//!
//! Platform installers keep sessions across install → uninstall → install
//! cycles. Before a new session is created for a package, the first
//! non-active session left for that package is abandoned. This is
//! best-effort cleanup: failures are logged and never block the install.

use crate::installer::{PackageInstaller, SessionId, SessionInfo};
use crate::package::PackageIdentity;
use tracing::{debug, info, warn};

/// What reconciliation did for a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// No stale session existed.
    Clean,
    /// The stale session was abandoned.
    Abandoned(SessionId),
    /// A stale session existed but abandoning it failed.
    AbandonFailed(SessionId),
    /// The installer's session list could not be read.
    ListingFailed,
}

/// First session in `sessions` that targets `package` and is not active.
///
/// Only the first match is returned; the list order is whatever the
/// installer reported.
pub fn find_stale_session<'a>(
    sessions: &'a [SessionInfo],
    package: &PackageIdentity,
) -> Option<&'a SessionInfo> {
    sessions.iter().find(|session| session.is_stale_for(package))
}

/// Abandon the stale session for `package`, if there is one.
pub async fn reconcile_stale_session(
    installer: &dyn PackageInstaller,
    package: &PackageIdentity,
) -> ReconcileOutcome {
    let sessions = match installer.sessions().await {
        Ok(sessions) => sessions,
        Err(e) => {
            warn!(package = %package, error = %e, "Failed to list installer sessions");
            return ReconcileOutcome::ListingFailed;
        }
    };

    let Some(stale) = find_stale_session(&sessions, package) else {
        debug!(package = %package, "No stale session to reconcile");
        return ReconcileOutcome::Clean;
    };

    match installer.abandon(stale.id).await {
        Ok(()) => {
            info!(package = %package, session = %stale.id, "Abandoned stale session");
            ReconcileOutcome::Abandoned(stale.id)
        }
        Err(e) => {
            warn!(
                package = %package,
                session = %stale.id,
                error = %e,
                "Failed to abandon stale session"
            );
            ReconcileOutcome::AbandonFailed(stale.id)
        }
    }
}
