//! Encrypted credential persistence.
//!
//! [`CredentialStore`] keeps one principal/secret pair per namespace in a
//! JSON file. Both values are sealed before they reach the disk. Missing
//! files and missing entries read back as empty strings, since catalogs may
//! operate unauthenticated.

mod cipher;

use cipher::Cipher;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "CatalogPackageInstaller";

const PRINCIPAL_KEY: &str = "principal";
const SECRET_KEY: &str = "secret";

/// A principal/secret pair for a catalog backend.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// User name or account identifier.
    pub principal: String,
    /// Token or password.
    pub secret: String,
}

impl Credentials {
    pub fn new(principal: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
            secret: secret.into(),
        }
    }

    /// True when neither value is set.
    pub fn is_empty(&self) -> bool {
        self.principal.is_empty() && self.secret.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("principal", &self.principal)
            .field("secret", &if self.secret.is_empty() { "" } else { "<redacted>" })
            .finish()
    }
}

/// Errors from reading or writing the credential file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CredentialError {
    /// The credential file could not be read or written.
    #[error("Credential store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The credential file is not valid JSON of the expected shape.
    #[error("Credential store is corrupt: {0}")]
    Format(#[from] serde_json::Error),

    /// A stored value could not be decrypted.
    #[error("Cannot decrypt stored {key} in namespace {namespace}")]
    Decrypt { namespace: String, key: String },
}

type Namespaces = BTreeMap<String, BTreeMap<String, String>>;

/// Encrypted, file-backed credential storage.
///
/// # Example
///
/// ```rust,no_run
/// use catalog_installer::{CredentialStore, Credentials};
///
/// let store = CredentialStore::open("/var/lib/installer/credentials.json");
/// store.save(&Credentials::new("octocat", "ghp_token"))?;
/// assert_eq!(store.load()?.principal, "octocat");
/// # Ok::<(), catalog_installer::CredentialError>(())
/// ```
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
    namespace: String,
    cipher: Cipher,
}

impl CredentialStore {
    /// Open a store at `path`, keyed to this machine.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            cipher: Cipher::for_machine(),
        }
    }

    /// Open a store at `path` keyed by explicit key material.
    pub fn with_key(path: impl Into<PathBuf>, key_material: &[u8]) -> Self {
        Self {
            path: path.into(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            cipher: Cipher::from_key_material(key_material),
        }
    }

    /// Use a different namespace inside the same file.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Read the stored pair. Absent values come back empty.
    pub fn load(&self) -> Result<Credentials, CredentialError> {
        let namespaces = self.read_file()?;
        let Some(entries) = namespaces.get(&self.namespace) else {
            return Ok(Credentials::default());
        };
        Ok(Credentials {
            principal: self.open_entry(entries, PRINCIPAL_KEY)?,
            secret: self.open_entry(entries, SECRET_KEY)?,
        })
    }

    /// Seal and persist the pair, leaving other namespaces untouched.
    pub fn save(&self, credentials: &Credentials) -> Result<(), CredentialError> {
        let mut namespaces = self.read_file()?;
        let entries = namespaces.entry(self.namespace.clone()).or_default();
        entries.insert(
            PRINCIPAL_KEY.to_string(),
            self.cipher.seal(&credentials.principal),
        );
        entries.insert(SECRET_KEY.to_string(), self.cipher.seal(&credentials.secret));
        self.write_file(&namespaces)
    }

    fn open_entry(
        &self,
        entries: &BTreeMap<String, String>,
        key: &str,
    ) -> Result<String, CredentialError> {
        match entries.get(key) {
            None => Ok(String::new()),
            Some(sealed) => self
                .cipher
                .open(sealed)
                .map_err(|_| CredentialError::Decrypt {
                    namespace: self.namespace.clone(),
                    key: key.to_string(),
                }),
        }
    }

    fn read_file(&self) -> Result<Namespaces, CredentialError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(Namespaces::new()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Namespaces::new()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn write_file(&self, namespaces: &Namespaces) -> Result<(), CredentialError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let text = serde_json::to_string_pretty(namespaces)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, text).map_err(|e| self.io_error(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))
    }

    fn io_error(&self, source: io::Error) -> CredentialError {
        CredentialError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> CredentialStore {
        CredentialStore::with_key(dir.path().join("credentials.json"), b"test-key")
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let creds = store_in(&dir).load().unwrap();
        assert!(creds.is_empty());
        assert_eq!(creds, Credentials::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(&Credentials::new("octocat", "ghp_token")).unwrap();

        assert_eq!(store.load().unwrap(), Credentials::new("octocat", "ghp_token"));

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(!raw.contains("octocat"));
        assert!(!raw.contains("ghp_token"));
        assert!(raw.contains(DEFAULT_NAMESPACE));
    }

    #[test]
    fn test_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(&Credentials::new("a", "1")).unwrap();
        store.save(&Credentials::new("b", "2")).unwrap();
        assert_eq!(store.load().unwrap(), Credentials::new("b", "2"));
    }

    #[test]
    fn test_namespaces_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let github = store_in(&dir).with_namespace("github");
        let gitlab = store_in(&dir).with_namespace("gitlab");

        github.save(&Credentials::new("gh", "1")).unwrap();
        gitlab.save(&Credentials::new("gl", "2")).unwrap();

        assert_eq!(github.load().unwrap(), Credentials::new("gh", "1"));
        assert_eq!(gitlab.load().unwrap(), Credentials::new("gl", "2"));
    }

    #[test]
    fn test_missing_entry_defaults_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), r#"{ "CatalogPackageInstaller": {} }"#).unwrap();
        assert_eq!(store.load().unwrap(), Credentials::default());
    }

    #[test]
    fn test_wrong_key_fails_to_decrypt() {
        let dir = tempfile::tempdir().unwrap();
        store_in(&dir).save(&Credentials::new("u", "p")).unwrap();

        let other = CredentialStore::with_key(dir.path().join("credentials.json"), b"other");
        assert!(matches!(other.load(), Err(CredentialError::Decrypt { .. })));
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "not json").unwrap();
        assert!(matches!(store.load(), Err(CredentialError::Format(_))));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let debug = format!("{:?}", Credentials::new("octocat", "ghp_token"));
        assert!(debug.contains("octocat"));
        assert!(!debug.contains("ghp_token"));
    }
}
