//! Shared fixtures for integration tests.

#![allow(dead_code)]

use catalog_installer::{
    CallbackToken, CredentialStore, InMemoryInstaller, InstallerHost, InstallerOptions,
    LocalCatalog, OperationFailure, Orchestrator, OrchestratorConfig, UserAction,
};
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;
use tempfile::TempDir;

pub const PACKAGE: &str = "com.example.app";

/// Host that records what the completion receiver asked of it.
#[derive(Default)]
pub struct RecordingHost {
    pub launched: Mutex<Vec<(CallbackToken, UserAction)>>,
    pub failures: Mutex<Vec<OperationFailure>>,
}

impl InstallerHost for RecordingHost {
    fn launch_user_action(&self, token: &CallbackToken, action: &UserAction) {
        self.launched.lock().push((token.clone(), action.clone()));
    }

    fn report_failure(&self, failure: &OperationFailure) {
        self.failures.lock().push(failure.clone());
    }
}

/// An orchestrator wired to in-memory collaborators.
pub struct Harness {
    pub dir: TempDir,
    pub installer: InMemoryInstaller,
    pub catalog: Arc<LocalCatalog>,
    pub orchestrator: Orchestrator,
}

impl Harness {
    pub fn new(options: InstallerOptions) -> Self {
        Self::with_catalog(options, LocalCatalog::new("local"))
    }

    pub fn with_catalog(options: InstallerOptions, catalog: LocalCatalog) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let installer = InMemoryInstaller::new();
        let catalog = Arc::new(catalog);
        let orchestrator = Orchestrator::new(OrchestratorConfig {
            installer: Arc::new(installer.clone()),
            catalog: catalog.clone(),
            credentials: CredentialStore::with_key(dir.path().join("credentials.json"), b"test"),
            options,
        });
        Self {
            dir,
            installer,
            catalog,
            orchestrator,
        }
    }

    /// Write an artifact of `len` bytes and register it for `package`.
    pub fn publish(&self, package: &str, len: usize) -> Vec<u8> {
        let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        let path = self.dir.path().join(format!("{}.apk", package));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(&data).unwrap();
        self.catalog.add(package, "Example App", &path);
        data
    }
}
