//! Error types for installation operations.
//!
//! This module defines the errors the orchestrator reports synchronously.
//! Each variant includes an actionable fix suggestion. Outcomes that
//! arrive after a request was accepted are not errors here; they travel
//! through the completion receiver instead.

use crate::catalog::CatalogError;
use crate::installer::{InstallerError, SessionId};
use crate::package::PackageIdentity;
use thiserror::Error;

/// Errors that can occur while installing or uninstalling a package.
///
/// Each variant includes contextual information about what went wrong and
/// a `fix` field with an actionable suggestion for resolving the issue.
///
/// # Example
///
/// ```rust
/// use catalog_installer::InstallError;
///
/// fn handle_error(error: InstallError) {
///     eprintln!("Installation failed: {}", error);
///     eprintln!("To fix: {}", error.fix_suggestion());
/// }
/// ```
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InstallError {
    /// The installer refused to create a session.
    ///
    /// Nothing was created, so there is nothing to clean up.
    #[error("Failed to create install session for {package}: {source}")]
    SessionCreation {
        /// Package being installed.
        package: PackageIdentity,
        /// Error reported by the installer.
        #[source]
        source: InstallerError,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// A freshly created session could not be opened.
    #[error("Failed to open install session {session}: {source}")]
    SessionOpen {
        /// Session that could not be opened.
        session: SessionId,
        #[source]
        source: InstallerError,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// The session refused to open a write channel.
    #[error("Failed to open write channel on session {session}: {source}")]
    WriteChannel {
        session: SessionId,
        #[source]
        source: InstallerError,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// The catalog could not resolve an artifact for the package.
    #[error("Failed to resolve {package} in catalog: {source}")]
    Resolve {
        package: PackageIdentity,
        #[source]
        source: CatalogError,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// The catalog could not produce the artifact bytes.
    ///
    /// The session stays open and unwritten; the next attempt for the same
    /// package reconciles it away.
    #[error("Download failed for {package}: {source}")]
    Download {
        package: PackageIdentity,
        #[source]
        source: CatalogError,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// Copying artifact bytes into the session failed.
    #[error("Transfer into session {session} failed: {source}")]
    Transfer {
        session: SessionId,
        #[source]
        source: std::io::Error,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// The installer could not make the written bytes durable.
    #[error("Failed to sync session {session}: {source}")]
    Fsync {
        session: SessionId,
        #[source]
        source: InstallerError,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// The installer did not accept the commit request.
    #[error("Failed to commit session {session}: {source}")]
    Commit {
        session: SessionId,
        #[source]
        source: InstallerError,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// The installer did not accept the removal request.
    #[error("Failed to request uninstall of {package}: {source}")]
    Uninstall {
        package: PackageIdentity,
        #[source]
        source: InstallerError,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },
}

impl InstallError {
    /// Get an actionable suggestion for fixing this error.
    ///
    /// Every error variant includes a fix suggestion that users can follow
    /// to resolve the issue.
    pub fn fix_suggestion(&self) -> &str {
        match self {
            Self::SessionCreation { fix, .. } => fix,
            Self::SessionOpen { fix, .. } => fix,
            Self::WriteChannel { fix, .. } => fix,
            Self::Resolve { fix, .. } => fix,
            Self::Download { fix, .. } => fix,
            Self::Transfer { fix, .. } => fix,
            Self::Fsync { fix, .. } => fix,
            Self::Commit { fix, .. } => fix,
            Self::Uninstall { fix, .. } => fix,
        }
    }

    /// Session left behind by the failed attempt, if one was created.
    pub fn session(&self) -> Option<SessionId> {
        match self {
            Self::SessionOpen { session, .. }
            | Self::WriteChannel { session, .. }
            | Self::Transfer { session, .. }
            | Self::Fsync { session, .. }
            | Self::Commit { session, .. } => Some(*session),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package() -> PackageIdentity {
        PackageIdentity::new("com.example.app")
    }

    #[test]
    fn test_install_error_display() {
        let error = InstallError::SessionCreation {
            package: package(),
            source: InstallerError::Rejected("quota exceeded".to_string()),
            fix: "Free installer sessions and retry".to_string(),
        };
        assert!(error.to_string().contains("com.example.app"));
        assert!(error.to_string().contains("quota exceeded"));
    }

    #[test]
    fn test_fix_suggestion() {
        let error = InstallError::Transfer {
            session: SessionId(3),
            source: std::io::Error::other("disk full"),
            fix: "Free storage and retry".to_string(),
        };
        assert_eq!(error.fix_suggestion(), "Free storage and retry");
    }

    #[test]
    fn test_all_variants_have_fix() {
        let errors = vec![
            InstallError::SessionCreation {
                package: package(),
                source: InstallerError::Rejected("no".to_string()),
                fix: "Retry".to_string(),
            },
            InstallError::SessionOpen {
                session: SessionId(1),
                source: InstallerError::SessionNotFound(SessionId(1)),
                fix: "Retry".to_string(),
            },
            InstallError::WriteChannel {
                session: SessionId(1),
                source: InstallerError::Rejected("no".to_string()),
                fix: "Retry".to_string(),
            },
            InstallError::Resolve {
                package: package(),
                source: CatalogError::NotFound(package()),
                fix: "Check the package name".to_string(),
            },
            InstallError::Download {
                package: package(),
                source: CatalogError::Download {
                    package: package(),
                    message: "timeout".to_string(),
                },
                fix: "Check network connectivity".to_string(),
            },
            InstallError::Transfer {
                session: SessionId(1),
                source: std::io::Error::other("eio"),
                fix: "Retry".to_string(),
            },
            InstallError::Fsync {
                session: SessionId(1),
                source: InstallerError::Rejected("no".to_string()),
                fix: "Retry".to_string(),
            },
            InstallError::Commit {
                session: SessionId(1),
                source: InstallerError::Rejected("no".to_string()),
                fix: "Retry".to_string(),
            },
            InstallError::Uninstall {
                package: package(),
                source: InstallerError::Rejected("no".to_string()),
                fix: "Retry".to_string(),
            },
        ];

        for error in errors {
            assert!(
                !error.fix_suggestion().is_empty(),
                "fix_suggestion() should return non-empty string for {:?}",
                error
            );
        }
    }

    #[test]
    fn test_session_left_behind() {
        let error = InstallError::Commit {
            session: SessionId(9),
            source: InstallerError::Rejected("no".to_string()),
            fix: "Retry".to_string(),
        };
        assert_eq!(error.session(), Some(SessionId(9)));

        let error = InstallError::Uninstall {
            package: package(),
            source: InstallerError::Rejected("no".to_string()),
            fix: "Retry".to_string(),
        };
        assert_eq!(error.session(), None);
    }

    #[test]
    fn test_error_source_chain() {
        use std::error::Error;

        let error = InstallError::Commit {
            session: SessionId(2),
            source: InstallerError::Rejected("busy".to_string()),
            fix: "Retry".to_string(),
        };
        let source = error.source().expect("commit error should carry a source");
        assert_eq!(source.to_string(), "Installer rejected request: busy");
    }
}
