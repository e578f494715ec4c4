//! Error types for state capture and reconciliation.

use std::path::PathBuf;

use crate::source::DumpTarget;
use crate::validate::{Violation, ViolationList};

/// Everything that can stop a reconciliation call.
///
/// Transient divergence between the two subsystems is never an error on its
/// own; it only surfaces as [`StateError::Invariant`] once polling gives up.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    // ─────────────────────────────────────────────────────────────────────
    // Capture Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Failed to fetch {target} dump: {details}")]
    Fetch { target: DumpTarget, details: String },

    #[error("Wait cancelled: {0}")]
    Cancelled(String),

    // ─────────────────────────────────────────────────────────────────────
    // Consistency Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error(transparent)]
    Invariant(#[from] ViolationList),

    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl StateError {
    pub fn fetch(target: DumpTarget, details: impl Into<String>) -> Self {
        StateError::Fetch {
            target,
            details: details.into(),
        }
    }

    /// The violations behind an invariant failure, if that is what this is.
    pub fn violations(&self) -> Option<&ViolationList> {
        match self {
            StateError::Invariant(list) => Some(list),
            _ => None,
        }
    }
}

impl From<Violation> for StateError {
    fn from(violation: Violation) -> Self {
        StateError::Invariant(violation.into())
    }
}

pub type Result<T> = std::result::Result<T, StateError>;
