//! Platform package-installer boundary.
//!
//! The platform installer is an external, trusted service that works
//! through session objects. This module defines the contract the
//! orchestrator consumes: listing and abandoning sessions, creating and
//! opening them, writing artifact bytes, requesting preapproval, committing,
//! and uninstalling.
//!
//! Results of preapproval, commit and uninstall requests are not returned
//! here. They arrive later as [`CompletionEvent`](crate::CompletionEvent)s
//! correlated by the [`CallbackToken`] passed with the request.

mod memory;

pub use memory::{FailPoint, InMemoryInstaller, InstallerCall};

use crate::package::{PackageIdentity, RepositoryInfo};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::pin::Pin;
use thiserror::Error;
use tokio::io::AsyncWrite;

/// Handle of an installer session, as assigned by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub i32);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Snapshot of a session known to the installer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// Session handle.
    pub id: SessionId,
    /// Package the session targets. The platform may not know it yet.
    pub app_package_name: Option<PackageIdentity>,
    /// Whether the installer is currently working on this session.
    pub is_active: bool,
}

impl SessionInfo {
    /// True if this session targets `package` and is not active.
    pub fn is_stale_for(&self, package: &PackageIdentity) -> bool {
        !self.is_active && self.app_package_name.as_ref() == Some(package)
    }
}

/// Where the platform should place the installed package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallLocation {
    /// Let the platform decide.
    #[default]
    Auto,
    /// Internal storage only.
    InternalOnly,
    /// External storage when available.
    PreferExternal,
}

/// Parameters for creating a full-install session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionParams {
    /// Package being installed.
    pub app_package_name: PackageIdentity,
    /// Label the platform may show while installing.
    pub app_label: Option<String>,
    /// Total size of the artifact, if known.
    pub size_bytes: Option<u64>,
    /// Requested install location.
    pub install_location: InstallLocation,
    /// Referrer recorded by the installer.
    pub referrer: Option<String>,
}

/// Details shown to the user when asking for preapproval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreapprovalDetails {
    pub package_name: PackageIdentity,
    pub label: String,
    pub locale: String,
}

impl PreapprovalDetails {
    /// Build preapproval details from repository metadata.
    pub fn from_repository(info: &RepositoryInfo, locale: impl Into<String>) -> Self {
        Self {
            package_name: info.package_name.clone(),
            label: info.app_label.clone(),
            locale: locale.into(),
        }
    }
}

/// Kind of asynchronous operation a completion callback belongs to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OperationKind {
    /// User preapproval of an install session.
    Preapproval,
    /// Commit of an install session.
    Install,
    /// Removal of an installed package.
    Uninstall,
}

/// Correlation token handed to the installer with an asynchronous request.
///
/// The installer echoes it back in the completion event so the receiver can
/// match the outcome to the package and operation that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallbackToken {
    pub package: PackageIdentity,
    pub kind: OperationKind,
}

impl CallbackToken {
    pub fn new(package: PackageIdentity, kind: OperationKind) -> Self {
        Self { package, kind }
    }

    pub fn preapproval(package: PackageIdentity) -> Self {
        Self::new(package, OperationKind::Preapproval)
    }

    pub fn install(package: PackageIdentity) -> Self {
        Self::new(package, OperationKind::Install)
    }

    pub fn uninstall(package: PackageIdentity) -> Self {
        Self::new(package, OperationKind::Uninstall)
    }
}

impl fmt::Display for CallbackToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.package)
    }
}

/// Writable stream into an installer session.
pub type WriteChannel = Pin<Box<dyn AsyncWrite + Send>>;

/// Errors reported synchronously by the platform installer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InstallerError {
    /// The session handle does not refer to a live session.
    #[error("Session {0} not found")]
    SessionNotFound(SessionId),

    /// The installer refused the request.
    #[error("Installer rejected request: {0}")]
    Rejected(String),

    /// I/O failure while talking to the installer.
    #[error("Installer I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The platform installer service.
#[async_trait]
pub trait PackageInstaller: Send + Sync {
    /// Sessions this installer currently knows about for the caller.
    async fn sessions(&self) -> Result<Vec<SessionInfo>, InstallerError>;

    /// Create a new session and return its handle.
    async fn create_session(&self, params: &SessionParams) -> Result<SessionId, InstallerError>;

    /// Open a writable handle onto an existing session.
    async fn open_session(
        &self,
        id: SessionId,
    ) -> Result<Box<dyn InstallerSession>, InstallerError>;

    /// Abandon a session, discarding anything written to it.
    async fn abandon(&self, id: SessionId) -> Result<(), InstallerError>;

    /// Request removal of an installed package.
    async fn uninstall(
        &self,
        package: &PackageIdentity,
        token: CallbackToken,
    ) -> Result<(), InstallerError>;
}

/// An open handle onto an installer session.
#[async_trait]
pub trait InstallerSession: Send {
    /// Handle of the underlying session.
    fn id(&self) -> SessionId;

    /// Open a write channel for a named payload inside the session.
    async fn open_write(
        &mut self,
        name: &str,
        offset: u64,
        length: Option<u64>,
    ) -> Result<WriteChannel, InstallerError>;

    /// Ensure everything written to `channel` is durable.
    async fn fsync(&mut self, channel: &mut WriteChannel) -> Result<(), InstallerError>;

    /// Ask the user to preapprove the install before it is committed.
    async fn request_user_preapproval(
        &mut self,
        details: &PreapprovalDetails,
        token: CallbackToken,
    ) -> Result<(), InstallerError>;

    /// Commit the session. Returns once the request is accepted.
    async fn commit(&mut self, token: CallbackToken) -> Result<(), InstallerError>;

    /// Release this handle. Idempotent and safe while a commit is pending.
    async fn close(&mut self);
}
