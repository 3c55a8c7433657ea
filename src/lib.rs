//! # catalog-installer
//!
//! Installs and removes application packages obtained from a remote catalog
//! through a session-based platform installer.
//!
//! The [`Orchestrator`] sits between a pluggable [`CatalogProvider`], which
//! resolves artifacts and holds credentials, and a [`PackageInstaller`],
//! which works through sessions. An install reconciles stale sessions,
//! creates a session, optionally asks for user preapproval, copies the
//! artifact into the session and commits it. Outcomes arrive later as
//! [`CompletionEvent`]s handled by a [`CompletionReceiver`].
//!
//! ## Features
//!
//! - `Orchestrator::install_package()` / `uninstall_package()` async flows
//! - Stale-session reconciliation before every new session
//! - Bulk or buffered artifact transfer selected by capability flag
//! - `CredentialStore` sealing catalog credentials at rest
//! - `InMemoryInstaller` and `LocalCatalog` for dry runs and tests
//!
//! ## Example
//!
//! ```rust,no_run
//! use catalog_installer::{
//!     CredentialStore, InMemoryInstaller, InstallLocation, InstallerOptions, LocalCatalog,
//!     Orchestrator, OrchestratorConfig, PackageIdentity,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let catalog = LocalCatalog::new("local");
//!     catalog.add("com.example.app", "Example", "/srv/artifacts/example.apk");
//!
//!     let orchestrator = Orchestrator::new(OrchestratorConfig {
//!         installer: Arc::new(InMemoryInstaller::new()),
//!         catalog: Arc::new(catalog),
//!         credentials: CredentialStore::open("/var/lib/installer/credentials.json"),
//!         options: InstallerOptions::default(),
//!     });
//!
//!     let package = PackageIdentity::new("com.example.app");
//!     match orchestrator.install_from_catalog(&package, InstallLocation::Auto).await {
//!         Ok(session) => println!("Committed session {}", session),
//!         Err(e) => println!("Failed: {}. Fix: {}", e, e.fix_suggestion()),
//!     }
//! }
//! ```

mod catalog;
mod completion;
mod credentials;
mod install;
mod installer;
mod options;
mod orchestrator;
mod package;

pub use catalog::{CatalogError, CatalogProvider, LocalCatalog};
pub use completion::{
    CompletionError, CompletionEvent, CompletionOutcome, CompletionReceiver, CorrelationRegistry,
    FailureKind, InstallStatus, InstallerHost, OperationFailure, UserAction,
    STATUS_PENDING_USER_ACTION, STATUS_SUCCESS,
};
pub use credentials::{CredentialError, CredentialStore, Credentials, DEFAULT_NAMESPACE};
pub use install::{
    copy_artifact, find_stale_session, reconcile_stale_session, CopyStrategy, InstallError,
    InstallProgress, ReconcileOutcome, TRANSFER_BUFFER_SIZE,
};
pub use installer::{
    CallbackToken, FailPoint, InMemoryInstaller, InstallLocation, InstallerCall, InstallerError,
    InstallerSession, OperationKind, PackageInstaller, PreapprovalDetails, SessionId, SessionInfo,
    SessionParams, WriteChannel,
};
pub use options::{InstallerOptions, DEFAULT_LOCALE};
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use package::{ApplicationArtifact, PackageIdentity, Repository, RepositoryInfo};
