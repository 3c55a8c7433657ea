//! Installation and uninstallation execution.
//!
//! This module provides the install flow on [`Orchestrator`]: reconcile
//! stale sessions, create a session, optionally request preapproval,
//! transfer the artifact, commit, and close. It also issues uninstall
//! requests. Final outcomes of commits and removals arrive later through
//! the [`CompletionReceiver`](crate::CompletionReceiver).

use super::reconcile::{reconcile_stale_session, ReconcileOutcome};
use super::transfer::copy_artifact;
use super::{InstallError, InstallProgress};
use crate::installer::{CallbackToken, InstallLocation, InstallerSession, PreapprovalDetails, SessionId};
use crate::orchestrator::Orchestrator;
use crate::package::{ApplicationArtifact, PackageIdentity};
use futures::future::join_all;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

impl Orchestrator {
    /// Ask the catalog for the artifact that installs `package`.
    pub async fn resolve_artifact(
        &self,
        package: &PackageIdentity,
    ) -> Result<ApplicationArtifact, InstallError> {
        self.catalog
            .resolve_artifact(package)
            .await
            .map_err(|source| InstallError::Resolve {
                package: package.clone(),
                fix: format!(
                    "Check that {} is published in the {} catalog and that the configured credentials can read it",
                    package,
                    self.catalog.name()
                ),
                source,
            })
    }

    /// Resolve `package` in the catalog and install it.
    pub async fn install_from_catalog(
        &self,
        package: &PackageIdentity,
        location: InstallLocation,
    ) -> Result<SessionId, InstallError> {
        let artifact = self.resolve_artifact(package).await?;
        self.install_package(&artifact, location).await
    }

    /// Install an artifact.
    ///
    /// Returns the committed session once the installer has accepted the
    /// commit request. Whether the install finally succeeds is reported
    /// through the completion receiver.
    pub async fn install_package(
        &self,
        artifact: &ApplicationArtifact,
        location: InstallLocation,
    ) -> Result<SessionId, InstallError> {
        self.install_package_with_progress(artifact, location, |_| {})
            .await
    }

    /// Install an artifact, reporting each stage to `on_progress`.
    ///
    /// This function:
    /// 1. Abandons a stale session left for the package, if any
    /// 2. Creates and opens a new session
    /// 3. Requests user preapproval when the platform supports it
    /// 4. Materializes the artifact through the catalog
    /// 5. Copies it into the session and syncs it
    /// 6. Registers the completion token and commits
    /// 7. Closes the session handle
    ///
    /// A failure after step 2 leaves the session open and unwritten; the
    /// next install of the same package reconciles it away.
    pub async fn install_package_with_progress<F>(
        &self,
        artifact: &ApplicationArtifact,
        location: InstallLocation,
        on_progress: F,
    ) -> Result<SessionId, InstallError>
    where
        F: Fn(InstallProgress) + Send + Sync,
    {
        let package = artifact.package_name().clone();
        on_progress(InstallProgress::Started {
            package: package.clone(),
        });

        // Step 1: Reconcile
        on_progress(InstallProgress::Reconciling);
        if let ReconcileOutcome::Abandoned(session) =
            reconcile_stale_session(self.installer.as_ref(), &package).await
        {
            on_progress(InstallProgress::StaleSessionAbandoned { session });
        }

        // Step 2: Create and open the session
        let params = artifact.session_params(location, self.options.session_referrer.clone());
        let session_id = self
            .installer
            .create_session(&params)
            .await
            .map_err(|source| InstallError::SessionCreation {
                package: package.clone(),
                source,
                fix: "Check that the installer accepts new sessions for this package and retry"
                    .to_string(),
            })?;
        let mut session =
            self.installer
                .open_session(session_id)
                .await
                .map_err(|source| InstallError::SessionOpen {
                    session: session_id,
                    source,
                    fix: "Retry the install; the unopened session will be reconciled".to_string(),
                })?;
        debug!(package = %package, session = %session_id, "Created install session");
        on_progress(InstallProgress::SessionCreated {
            session: session_id,
        });

        // Step 3: Preapproval, advisory only
        if self.options.preapproval_supported
            && self.request_preapproval(session.as_mut(), artifact).await
        {
            on_progress(InstallProgress::PreapprovalRequested);
        }

        // Steps 4-6
        let result = self
            .write_and_commit(session.as_mut(), artifact, &on_progress)
            .await;

        // Step 7
        session.close().await;
        result.map(|bytes| {
            on_progress(InstallProgress::Committed {
                session: session_id,
                bytes,
            });
            session_id
        })
    }

    /// Returns whether the request was accepted.
    async fn request_preapproval(
        &self,
        session: &mut dyn InstallerSession,
        artifact: &ApplicationArtifact,
    ) -> bool {
        let details = PreapprovalDetails::from_repository(&artifact.repository.info, &self.locale);
        let token = CallbackToken::preapproval(details.package_name.clone());
        self.registry.register(token.clone());

        match session.request_user_preapproval(&details, token.clone()).await {
            Ok(()) => {
                debug!(package = %details.package_name, session = %session.id(), "Requested user preapproval");
                true
            }
            Err(e) => {
                self.registry.release(&token);
                warn!(
                    package = %details.package_name,
                    session = %session.id(),
                    error = %e,
                    "Preapproval request failed; continuing without it"
                );
                false
            }
        }
    }

    /// Materialize, transfer, sync and commit. Returns the bytes written.
    async fn write_and_commit<F>(
        &self,
        session: &mut dyn InstallerSession,
        artifact: &ApplicationArtifact,
        on_progress: &F,
    ) -> Result<u64, InstallError>
    where
        F: Fn(InstallProgress) + Send + Sync,
    {
        let package = artifact.package_name();
        let session_id = session.id();

        // Step 4: Materialize the artifact
        on_progress(InstallProgress::Downloading);
        let path = self
            .catalog
            .materialize(artifact)
            .await
            .map_err(|source| InstallError::Download {
                package: package.clone(),
                source,
                fix: "Check network connectivity and catalog credentials, then retry".to_string(),
            })?;

        // Step 5: Transfer and sync
        let transfer_error = |source: std::io::Error| InstallError::Transfer {
            session: session_id,
            source,
            fix: format!(
                "Check that {} is readable and the device has free storage, then retry",
                path.display()
            ),
        };
        let mut source = tokio::fs::File::open(&path).await.map_err(transfer_error)?;
        let length = source.metadata().await.map_err(transfer_error)?.len();

        let mut channel = session
            .open_write(&artifact.file_name, 0, Some(length))
            .await
            .map_err(|source| InstallError::WriteChannel {
                session: session_id,
                source,
                fix: "Retry the install; the installer may be busy".to_string(),
            })?;

        on_progress(InstallProgress::Transferring {
            bytes: Some(length),
        });
        let written = copy_artifact(&mut source, &mut channel, self.options.copy_strategy())
            .await
            .map_err(transfer_error)?;
        session
            .fsync(&mut channel)
            .await
            .map_err(|source| InstallError::Fsync {
                session: session_id,
                source,
                fix: "Check free storage on the device and retry".to_string(),
            })?;
        channel.shutdown().await.map_err(transfer_error)?;
        debug!(package = %package, session = %session_id, bytes = written, "Transferred artifact");

        // Step 6: Commit
        let token = CallbackToken::install(package.clone());
        self.registry.register(token.clone());
        debug!(package = %package, label = artifact.app_label(), "Ready to install");
        if let Err(source) = session.commit(token.clone()).await {
            self.registry.release(&token);
            return Err(InstallError::Commit {
                session: session_id,
                source,
                fix: "Retry the install; the written session will be reconciled".to_string(),
            });
        }
        info!(package = %package, session = %session_id, "Install committed");
        Ok(written)
    }

    /// Request removal of `package`.
    ///
    /// Returns once the installer has accepted the request; the result of
    /// the removal arrives through the completion receiver.
    pub async fn uninstall_package(&self, package: &PackageIdentity) -> Result<(), InstallError> {
        let token = CallbackToken::uninstall(package.clone());
        self.registry.register(token.clone());

        match self.installer.uninstall(package, token.clone()).await {
            Ok(()) => {
                info!(package = %package, "Uninstall requested");
                Ok(())
            }
            Err(source) => {
                self.registry.release(&token);
                Err(InstallError::Uninstall {
                    package: package.clone(),
                    source,
                    fix: format!("Check that {} is installed and retry", package),
                })
            }
        }
    }

    /// Request removal of several packages concurrently.
    ///
    /// Results are returned in the order of `packages`.
    pub async fn uninstall_packages(
        &self,
        packages: &[PackageIdentity],
    ) -> Vec<Result<(), InstallError>> {
        join_all(packages.iter().map(|package| self.uninstall_package(package))).await
    }

    /// Request removal of every installed package the catalog targets.
    ///
    /// Returns each package with its result. When the catalog's list is
    /// not reliable, packages it does not know about are left alone.
    pub async fn uninstall_existing_packages(
        &self,
    ) -> Vec<(PackageIdentity, Result<(), InstallError>)> {
        let packages = self.existing_packages();
        if !self.existing_packages_reliable() {
            warn!(
                catalog = self.catalog.name(),
                count = packages.len(),
                "Installed package list may be incomplete"
            );
        }
        let results = self.uninstall_packages(&packages).await;
        packages.into_iter().zip(results).collect()
    }
}
