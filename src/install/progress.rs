//! Progress reporting types for installation operations.
//!
//! The [`InstallProgress`] enum represents the discrete stages of the
//! synchronous part of an install, reported through the callback passed to
//! [`Orchestrator::install_package_with_progress`](crate::Orchestrator::install_package_with_progress).
//! Everything after the commit request is reported by the completion
//! receiver instead.

use crate::installer::SessionId;
use crate::package::PackageIdentity;

/// Progress stages during package installation.
///
/// # Example
///
/// ```rust
/// use catalog_installer::InstallProgress;
///
/// fn on_progress(progress: InstallProgress) {
///     match &progress {
///         InstallProgress::Started { package } => println!("Installing {}", package),
///         InstallProgress::Transferring { bytes: Some(n) } => println!("Copying {} bytes", n),
///         other => println!("{}", other.description()),
///     }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallProgress {
    /// Installation has started.
    Started {
        /// The package being installed.
        package: PackageIdentity,
    },

    /// Looking for a stale session left by an earlier attempt.
    Reconciling,

    /// A stale session was abandoned.
    StaleSessionAbandoned {
        /// The abandoned session.
        session: SessionId,
    },

    /// A new installer session was created and opened.
    SessionCreated {
        /// The new session.
        session: SessionId,
    },

    /// User preapproval was requested.
    PreapprovalRequested,

    /// Materializing the artifact bytes.
    Downloading,

    /// Copying bytes into the session.
    Transferring {
        /// Size of the artifact, if known.
        bytes: Option<u64>,
    },

    /// The commit request was accepted.
    Committed {
        /// The committed session.
        session: SessionId,
        /// Number of bytes written into the session.
        bytes: u64,
    },
}

impl InstallProgress {
    /// Get a human-readable description of the current progress stage.
    ///
    /// # Example
    ///
    /// ```rust
    /// use catalog_installer::InstallProgress;
    ///
    /// assert_eq!(InstallProgress::Downloading.description(), "Downloading artifact");
    /// ```
    pub fn description(&self) -> &'static str {
        match self {
            Self::Started { .. } => "Starting installation",
            Self::Reconciling => "Checking for stale sessions",
            Self::StaleSessionAbandoned { .. } => "Abandoned stale session",
            Self::SessionCreated { .. } => "Session created",
            Self::PreapprovalRequested => "Waiting for user preapproval",
            Self::Downloading => "Downloading artifact",
            Self::Transferring { .. } => "Writing artifact",
            Self::Committed { .. } => "Committed",
        }
    }

    /// Check if this stage ends the synchronous part of the install.
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_progress_description() {
        assert_eq!(
            InstallProgress::Started {
                package: PackageIdentity::new("a")
            }
            .description(),
            "Starting installation"
        );
        assert_eq!(
            InstallProgress::Reconciling.description(),
            "Checking for stale sessions"
        );
        assert_eq!(
            InstallProgress::Transferring { bytes: None }.description(),
            "Writing artifact"
        );
        assert_eq!(
            InstallProgress::Committed {
                session: SessionId(1),
                bytes: 10
            }
            .description(),
            "Committed"
        );
    }

    #[test]
    fn test_install_progress_is_complete() {
        assert!(InstallProgress::Committed {
            session: SessionId(1),
            bytes: 0
        }
        .is_complete());

        assert!(!InstallProgress::Reconciling.is_complete());
        assert!(!InstallProgress::PreapprovalRequested.is_complete());
        assert!(!InstallProgress::SessionCreated {
            session: SessionId(1)
        }
        .is_complete());
    }
}
