//! Status codes delivered with completion callbacks.

use serde::{Deserialize, Serialize};

/// Raw status: the installer needs the user to confirm something.
pub const STATUS_PENDING_USER_ACTION: i32 = -1;
/// Raw status: the operation succeeded.
pub const STATUS_SUCCESS: i32 = 0;

/// Why an operation failed, decoded from the raw status code.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[non_exhaustive]
pub enum FailureKind {
    /// Unspecified failure (code 1).
    Generic,
    /// Blocked by policy or another installer (code 2).
    Blocked,
    /// Aborted, typically by the user (code 3).
    Aborted,
    /// The artifact was invalid or corrupt (code 4).
    Invalid,
    /// Conflicts with an installed package (code 5).
    Conflict,
    /// Not enough storage (code 6).
    Storage,
    /// Incompatible with this device (code 7).
    Incompatible,
    /// Timed out waiting for a response (code 8).
    Timeout,
    /// Missing or unrecognized status code.
    Unknown,
}

impl FailureKind {
    /// Decode a raw failure code.
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Generic,
            2 => Self::Blocked,
            3 => Self::Aborted,
            4 => Self::Invalid,
            5 => Self::Conflict,
            6 => Self::Storage,
            7 => Self::Incompatible,
            8 => Self::Timeout,
            _ => Self::Unknown,
        }
    }

    /// Human-readable description, used when the installer sends no message.
    ///
    /// # Example
    ///
    /// ```rust
    /// use catalog_installer::FailureKind;
    ///
    /// assert_eq!(FailureKind::Storage.description(), "Insufficient storage");
    /// ```
    pub fn description(&self) -> &'static str {
        match self {
            Self::Generic => "Operation failed",
            Self::Blocked => "Operation blocked",
            Self::Aborted => "Operation aborted",
            Self::Invalid => "Invalid package",
            Self::Conflict => "Conflicts with an installed package",
            Self::Storage => "Insufficient storage",
            Self::Incompatible => "Package incompatible with this device",
            Self::Timeout => "Operation timed out",
            Self::Unknown => "Unknown failure",
        }
    }
}

/// Outcome class of a completion callback.
///
/// The same three-way classification applies to preapproval, commit and
/// uninstall callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstallStatus {
    /// A follow-up user interaction must be surfaced; not terminal.
    PendingUserAction,
    /// Terminal success.
    Success,
    /// Terminal failure.
    Failure {
        kind: FailureKind,
        /// Raw code as delivered, `None` when the status was missing.
        code: Option<i32>,
    },
}

impl InstallStatus {
    /// Classify a raw status code. A missing status is a failure.
    ///
    /// # Example
    ///
    /// ```rust
    /// use catalog_installer::{FailureKind, InstallStatus};
    ///
    /// assert_eq!(InstallStatus::from_raw(Some(0)), InstallStatus::Success);
    /// assert!(InstallStatus::from_raw(None).is_terminal());
    /// assert_eq!(
    ///     InstallStatus::from_raw(Some(6)),
    ///     InstallStatus::Failure { kind: FailureKind::Storage, code: Some(6) }
    /// );
    /// ```
    pub fn from_raw(code: Option<i32>) -> Self {
        match code {
            Some(STATUS_PENDING_USER_ACTION) => Self::PendingUserAction,
            Some(STATUS_SUCCESS) => Self::Success,
            Some(code) => Self::Failure {
                kind: FailureKind::from_code(code),
                code: Some(code),
            },
            None => Self::Failure {
                kind: FailureKind::Unknown,
                code: None,
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Whether no further callback is expected for this operation.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::PendingUserAction)
    }
}
