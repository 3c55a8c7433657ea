//! Installation and uninstallation flows.
//!
//! This module holds the pieces the [`Orchestrator`](crate::Orchestrator)
//! composes into an install: stale-session reconciliation, the artifact
//! transfer, progress reporting and the synchronous error taxonomy.
//!
//! # Example
//!
//! ```rust,no_run
//! use catalog_installer::{InstallLocation, Orchestrator, PackageIdentity};
//!
//! async fn install(orchestrator: &Orchestrator) {
//!     let package = PackageIdentity::new("com.example.app");
//!     match orchestrator.install_from_catalog(&package, InstallLocation::Auto).await {
//!         Ok(session) => println!("Committed session {}", session),
//!         Err(e) => println!("Failed: {}. Fix: {}", e, e.fix_suggestion()),
//!     }
//! }
//! ```

mod errors;
mod executor;
mod progress;
mod reconcile;
mod transfer;

pub use errors::InstallError;
pub use progress::InstallProgress;
pub use reconcile::{find_stale_session, reconcile_stale_session, ReconcileOutcome};
pub use transfer::{copy_artifact, CopyStrategy, TRANSFER_BUFFER_SIZE};
