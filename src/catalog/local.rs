//! Catalog backed by artifact files on the local filesystem.

use super::{CatalogError, CatalogProvider};
use crate::credentials::Credentials;
use crate::package::{ApplicationArtifact, PackageIdentity, Repository, RepositoryInfo};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A catalog whose artifacts are files already present on disk.
///
/// Optionally guarded by a required credential pair, in which case every
/// request is checked against the credentials most recently pushed through
/// [`CatalogProvider::update_credentials`].
///
/// # Example
///
/// ```rust
/// use catalog_installer::{LocalCatalog, PackageIdentity};
///
/// let catalog = LocalCatalog::new("local");
/// catalog.add("com.example.app", "Example", "/srv/artifacts/example.apk");
/// assert!(catalog.contains(&PackageIdentity::new("com.example.app")));
/// ```
#[derive(Debug)]
pub struct LocalCatalog {
    name: String,
    entries: RwLock<HashMap<PackageIdentity, (RepositoryInfo, PathBuf)>>,
    credentials: RwLock<Credentials>,
    required: Option<Credentials>,
    installed: Option<Vec<PackageIdentity>>,
}

impl LocalCatalog {
    /// Create an empty catalog that accepts anonymous requests.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: RwLock::new(HashMap::new()),
            credentials: RwLock::new(Credentials::default()),
            required: None,
            installed: None,
        }
    }

    /// Require this exact credential pair for every request.
    pub fn requiring(mut self, credentials: Credentials) -> Self {
        self.required = Some(credentials);
        self
    }

    /// Declare the packages already installed on this device.
    ///
    /// A catalog built this way reports its list as reliable.
    pub fn installed<I, P>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PackageIdentity>,
    {
        self.installed = Some(packages.into_iter().map(Into::into).collect());
        self
    }

    /// Register an artifact file for a package.
    pub fn add(
        &self,
        package: impl Into<PackageIdentity>,
        label: impl Into<String>,
        path: impl AsRef<Path>,
    ) {
        let package = package.into();
        let info = RepositoryInfo {
            package_name: package.clone(),
            app_label: label.into(),
        };
        self.entries
            .write()
            .insert(package, (info, path.as_ref().to_path_buf()));
    }

    /// Whether the catalog has an entry for `package`.
    pub fn contains(&self, package: &PackageIdentity) -> bool {
        self.entries.read().contains_key(package)
    }

    /// Credentials currently in use.
    pub fn current_credentials(&self) -> Credentials {
        self.credentials.read().clone()
    }

    fn authorize(&self) -> Result<(), CatalogError> {
        let Some(required) = &self.required else {
            return Ok(());
        };
        let current = self.credentials.read();
        if *current != *required {
            return Err(CatalogError::Unauthorized {
                principal: current.principal.clone(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogProvider for LocalCatalog {
    fn name(&self) -> &str {
        &self.name
    }

    async fn resolve_artifact(
        &self,
        package: &PackageIdentity,
    ) -> Result<ApplicationArtifact, CatalogError> {
        self.authorize()?;
        let (info, path) = self
            .entries
            .read()
            .get(package)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(package.clone()))?;

        let size_hint = tokio::fs::metadata(&path).await.ok().map(|m| m.len());
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{}.apk", package));

        debug!(catalog = %self.name, package = %package, path = %path.display(), "Resolved artifact");
        Ok(ApplicationArtifact {
            repository: Repository {
                info,
                location: path.display().to_string(),
            },
            file_name,
            size_hint,
            locator: path.display().to_string(),
        })
    }

    async fn materialize(&self, artifact: &ApplicationArtifact) -> Result<PathBuf, CatalogError> {
        self.authorize()?;
        let path = PathBuf::from(&artifact.locator);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            Ok(_) => Err(CatalogError::Download {
                package: artifact.package_name().clone(),
                message: format!("{} is not a file", path.display()),
            }),
            Err(e) => Err(CatalogError::Download {
                package: artifact.package_name().clone(),
                message: format!("{}: {}", path.display(), e),
            }),
        }
    }

    fn update_credentials(&self, credentials: &Credentials) {
        *self.credentials.write() = credentials.clone();
    }

    fn existing_packages(&self) -> Vec<PackageIdentity> {
        self.installed.clone().unwrap_or_default()
    }

    fn existing_packages_reliable(&self) -> bool {
        self.installed.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn artifact_file(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file
    }

    #[tokio::test]
    async fn test_resolve_and_materialize() {
        let file = artifact_file(b"0123456789");
        let catalog = LocalCatalog::new("local");
        catalog.add("com.example.app", "Example", file.path());

        let package = PackageIdentity::new("com.example.app");
        let artifact = catalog.resolve_artifact(&package).await.unwrap();
        assert_eq!(artifact.package_name(), &package);
        assert_eq!(artifact.app_label(), "Example");
        assert_eq!(artifact.size_hint, Some(10));

        let path = catalog.materialize(&artifact).await.unwrap();
        assert_eq!(path, file.path());
    }

    #[tokio::test]
    async fn test_unknown_package() {
        let catalog = LocalCatalog::new("local");
        let result = catalog
            .resolve_artifact(&PackageIdentity::new("com.example.missing"))
            .await;
        assert!(matches!(result, Err(CatalogError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_materialize_missing_file() {
        let catalog = LocalCatalog::new("local");
        catalog.add("a", "A", "/nonexistent/path/a.apk");
        let artifact = catalog
            .resolve_artifact(&PackageIdentity::new("a"))
            .await
            .unwrap();
        assert_eq!(artifact.size_hint, None);

        let result = catalog.materialize(&artifact).await;
        assert!(matches!(result, Err(CatalogError::Download { .. })));
    }

    #[tokio::test]
    async fn test_required_credentials() {
        let file = artifact_file(b"x");
        let catalog = LocalCatalog::new("private").requiring(Credentials::new("u", "p"));
        catalog.add("a", "A", file.path());
        let package = PackageIdentity::new("a");

        let result = catalog.resolve_artifact(&package).await;
        assert!(matches!(result, Err(CatalogError::Unauthorized { .. })));

        catalog.update_credentials(&Credentials::new("u", "p"));
        assert!(catalog.resolve_artifact(&package).await.is_ok());
        assert_eq!(catalog.current_credentials(), Credentials::new("u", "p"));
    }

    #[test]
    fn test_existing_packages() {
        let catalog = LocalCatalog::new("local");
        assert!(catalog.existing_packages().is_empty());
        assert!(!catalog.existing_packages_reliable());

        let catalog = LocalCatalog::new("local").installed(["com.example.a", "com.example.b"]);
        assert_eq!(
            catalog.existing_packages(),
            vec![
                PackageIdentity::new("com.example.a"),
                PackageIdentity::new("com.example.b")
            ]
        );
        assert!(catalog.existing_packages_reliable());

        let catalog = LocalCatalog::new("local").installed(Vec::<PackageIdentity>::new());
        assert!(catalog.existing_packages().is_empty());
        assert!(catalog.existing_packages_reliable());
    }
}
