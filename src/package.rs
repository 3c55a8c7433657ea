//! Package identity and catalog metadata types.

use crate::installer::{InstallLocation, SessionParams};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of an installable package (e.g. `com.example.app`).
///
/// This is the key used to correlate installer sessions, artifacts and
/// completion callbacks.
///
/// # Example
///
/// ```rust
/// use catalog_installer::PackageIdentity;
///
/// let id = PackageIdentity::new("com.example.app");
/// assert_eq!(id.as_str(), "com.example.app");
/// assert_eq!(id.to_string(), "com.example.app");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageIdentity(String);

impl PackageIdentity {
    /// Create an identity from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PackageIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PackageIdentity {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for PackageIdentity {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Display and identity metadata for a candidate package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryInfo {
    /// Package the repository produces.
    pub package_name: PackageIdentity,
    /// Human-readable application label.
    pub app_label: String,
}

/// A catalog entry: metadata plus provider-specific addressing data.
///
/// The `location` is opaque to the orchestrator; only the catalog provider
/// that produced the repository interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Display/identity metadata.
    pub info: RepositoryInfo,
    /// Provider-specific address (a path, an `owner/name` pair, a URL...).
    pub location: String,
}

/// An installable artifact resolved by a catalog provider.
///
/// The bytes are not held here. The provider materializes them into a local
/// file on demand, which may involve network I/O.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationArtifact {
    /// The repository the artifact belongs to.
    pub repository: Repository,
    /// File name used for the installer write channel.
    pub file_name: String,
    /// Expected size in bytes, if the provider knows it up front.
    pub size_hint: Option<u64>,
    /// Provider-specific locator for the bytes.
    pub locator: String,
}

impl ApplicationArtifact {
    /// The package this artifact installs.
    pub fn package_name(&self) -> &PackageIdentity {
        &self.repository.info.package_name
    }

    /// The label shown to users for this artifact.
    pub fn app_label(&self) -> &str {
        &self.repository.info.app_label
    }

    /// Derive installer session parameters from this artifact.
    pub fn session_params(
        &self,
        install_location: InstallLocation,
        referrer: Option<String>,
    ) -> SessionParams {
        SessionParams {
            app_package_name: self.package_name().clone(),
            app_label: Some(self.app_label().to_string()),
            size_bytes: self.size_hint,
            install_location,
            referrer,
        }
    }
}
