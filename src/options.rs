//! Orchestrator options.
//!
//! This module provides the [`InstallerOptions`] struct holding the
//! capability flags the orchestrator resolves once at construction.

use crate::install::CopyStrategy;
use serde::{Deserialize, Serialize};

/// Locale used for preapproval details when nothing else is configured.
pub const DEFAULT_LOCALE: &str = "en-US";

/// Configuration options for the installation orchestrator.
///
/// The flags describe what the platform installer supports. They are read
/// once when the orchestrator is built and never queried per call, so the
/// install flow can be exercised under both settings.
///
/// # Default Behavior
///
/// Preapproval is disabled, bulk copy is enabled, no referrer is recorded
/// and the locale is taken from the environment.
///
/// # Example
///
/// ```rust
/// use catalog_installer::InstallerOptions;
///
/// let opts = InstallerOptions {
///     preapproval_supported: true,
///     ..Default::default()
/// };
/// assert!(opts.bulk_copy_supported);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerOptions {
    /// Whether the platform offers the two-phase user preapproval flow.
    ///
    /// Default: `false`
    pub preapproval_supported: bool,

    /// Whether the platform exposes a bulk stream-copy primitive.
    ///
    /// When `false`, artifact bytes are moved through a fixed 4096-byte
    /// buffer instead.
    ///
    /// Default: `true`
    pub bulk_copy_supported: bool,

    /// Installer referrer recorded on every created session.
    pub session_referrer: Option<String>,

    /// Locale attached to preapproval requests (e.g. `en-US`).
    ///
    /// When unset, derived from `LC_ALL`/`LANG`.
    pub locale: Option<String>,
}

impl Default for InstallerOptions {
    fn default() -> Self {
        Self {
            preapproval_supported: false,
            bulk_copy_supported: true,
            session_referrer: None,
            locale: None,
        }
    }
}

impl InstallerOptions {
    /// Copy strategy implied by the bulk-copy capability flag.
    pub fn copy_strategy(&self) -> CopyStrategy {
        if self.bulk_copy_supported {
            CopyStrategy::Bulk
        } else {
            CopyStrategy::Buffered
        }
    }

    /// The locale to put in preapproval details.
    pub fn resolved_locale(&self) -> String {
        if let Some(locale) = &self.locale {
            return locale.clone();
        }
        ["LC_ALL", "LANG"]
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find_map(|value| locale_from_env(&value))
            .unwrap_or_else(|| DEFAULT_LOCALE.to_string())
    }
}

/// Turn a POSIX locale such as `de_DE.UTF-8` into a language tag.
fn locale_from_env(value: &str) -> Option<String> {
    let base = value.split(['.', '@']).next().unwrap_or_default();
    if base.is_empty() || base == "C" || base == "POSIX" {
        return None;
    }
    Some(base.replace('_', "-"))
}
