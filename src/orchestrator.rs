//! The orchestrator composition root.
//!
//! An [`Orchestrator`] is built once per hosting application from an
//! [`OrchestratorConfig`] and owns every collaborator the install and
//! uninstall flows need. There is no global instance.

use crate::catalog::CatalogProvider;
use crate::completion::{CompletionReceiver, CorrelationRegistry, InstallerHost};
use crate::credentials::{CredentialError, CredentialStore, Credentials};
use crate::installer::PackageInstaller;
use crate::options::InstallerOptions;
use crate::package::PackageIdentity;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything an [`Orchestrator`] is built from.
pub struct OrchestratorConfig {
    /// Platform installer service.
    pub installer: Arc<dyn PackageInstaller>,
    /// Catalog the artifacts come from.
    pub catalog: Arc<dyn CatalogProvider>,
    /// Persistent credential storage for the catalog.
    pub credentials: CredentialStore,
    /// Capability flags and defaults.
    pub options: InstallerOptions,
}

/// Drives package installs and removals against the platform installer.
///
/// # Example
///
/// ```rust,no_run
/// use catalog_installer::{
///     CredentialStore, InMemoryInstaller, InstallerOptions, LocalCatalog, Orchestrator,
///     OrchestratorConfig,
/// };
/// use std::sync::Arc;
///
/// let orchestrator = Orchestrator::new(OrchestratorConfig {
///     installer: Arc::new(InMemoryInstaller::new()),
///     catalog: Arc::new(LocalCatalog::new("local")),
///     credentials: CredentialStore::open("/var/lib/installer/credentials.json"),
///     options: InstallerOptions::default(),
/// });
/// orchestrator.set_credentials("octocat", "ghp_token")?;
/// # Ok::<(), catalog_installer::CredentialError>(())
/// ```
pub struct Orchestrator {
    pub(crate) installer: Arc<dyn PackageInstaller>,
    pub(crate) catalog: Arc<dyn CatalogProvider>,
    pub(crate) registry: Arc<CorrelationRegistry>,
    pub(crate) options: InstallerOptions,
    pub(crate) locale: String,
    credentials: Mutex<CredentialStore>,
}

impl Orchestrator {
    /// Build an orchestrator and seed the catalog with the saved credentials.
    pub fn new(config: OrchestratorConfig) -> Self {
        let OrchestratorConfig {
            installer,
            catalog,
            credentials,
            options,
        } = config;

        match credentials.load() {
            Ok(saved) => catalog.update_credentials(&saved),
            Err(e) => warn!(
                catalog = catalog.name(),
                error = %e,
                "Failed to load saved catalog credentials"
            ),
        }

        let locale = options.resolved_locale();
        debug!(
            catalog = catalog.name(),
            preapproval = options.preapproval_supported,
            bulk_copy = options.bulk_copy_supported,
            locale = %locale,
            "Orchestrator configured"
        );

        Self {
            installer,
            catalog,
            registry: Arc::new(CorrelationRegistry::new()),
            options,
            locale,
            credentials: Mutex::new(credentials),
        }
    }

    pub fn options(&self) -> &InstallerOptions {
        &self.options
    }

    pub fn catalog(&self) -> &Arc<dyn CatalogProvider> {
        &self.catalog
    }

    /// Packages the catalog targets that are already installed.
    pub fn existing_packages(&self) -> Vec<PackageIdentity> {
        self.catalog.existing_packages()
    }

    /// Whether [`existing_packages`](Self::existing_packages) can be trusted
    /// to be complete.
    pub fn existing_packages_reliable(&self) -> bool {
        self.catalog.existing_packages_reliable()
    }

    /// Tokens of requests whose outcome has not arrived yet.
    pub fn registry(&self) -> Arc<CorrelationRegistry> {
        Arc::clone(&self.registry)
    }

    /// A receiver sharing this orchestrator's correlation state.
    pub fn completion_receiver(&self, host: Arc<dyn InstallerHost>) -> CompletionReceiver {
        CompletionReceiver::new(self.registry(), host)
    }

    /// Persist new catalog credentials and push them into the live catalog.
    ///
    /// Both happen under one lock, so no caller observes one updated
    /// without the other. If persisting fails the catalog is left as is.
    pub fn set_credentials(&self, principal: &str, secret: &str) -> Result<(), CredentialError> {
        let credentials = Credentials::new(principal, secret);
        let store = self.credentials.lock();
        store.save(&credentials)?;
        self.catalog.update_credentials(&credentials);
        info!(catalog = self.catalog.name(), principal = %principal, "Updated catalog credentials");
        Ok(())
    }

    /// Read the persisted credentials. Unset values are empty strings.
    pub fn credentials(&self) -> Result<Credentials, CredentialError> {
        self.credentials.lock().load()
    }
}
