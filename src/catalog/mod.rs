//! Catalog provider boundary.
//!
//! A catalog provider knows how to turn a [`PackageIdentity`] into an
//! [`ApplicationArtifact`] and how to materialize that artifact's bytes as a
//! local file. How a provider talks to its backend is its own business.

mod local;

pub use local::LocalCatalog;

use crate::credentials::Credentials;
use crate::package::{ApplicationArtifact, PackageIdentity};
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by a catalog provider.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    /// The catalog has no entry for the package.
    #[error("Package {0} not found in catalog")]
    NotFound(PackageIdentity),

    /// The backend refused the configured credentials.
    #[error("Catalog rejected credentials for {principal:?}")]
    Unauthorized {
        /// Principal that was rejected (empty when unauthenticated).
        principal: String,
    },

    /// Fetching the artifact bytes failed.
    #[error("Download of {package} failed: {message}")]
    Download {
        package: PackageIdentity,
        message: String,
    },
}

/// Source of installable artifacts.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Name of this provider, used for logging.
    fn name(&self) -> &str;

    /// Resolve the artifact that installs `package`.
    ///
    /// May perform network I/O.
    async fn resolve_artifact(
        &self,
        package: &PackageIdentity,
    ) -> Result<ApplicationArtifact, CatalogError>;

    /// Produce the artifact bytes as a local file and return its path.
    ///
    /// May perform network I/O.
    async fn materialize(&self, artifact: &ApplicationArtifact) -> Result<PathBuf, CatalogError>;

    /// Replace the credentials used for subsequent requests.
    fn update_credentials(&self, credentials: &Credentials);

    /// Packages this catalog targets that are already installed.
    ///
    /// Installed apps cannot be enumerated in general, so each provider
    /// names its own targets. The default knows of none.
    fn existing_packages(&self) -> Vec<PackageIdentity> {
        Vec::new()
    }

    /// Whether [`existing_packages`](Self::existing_packages) is complete.
    ///
    /// When `false`, an empty list does not mean nothing is installed.
    fn existing_packages_reliable(&self) -> bool {
        false
    }
}
