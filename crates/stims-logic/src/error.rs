//! Error taxonomy for stim use.
//!
//! None of these are fatal. The recorder and scheduler turn every one of
//! them into a log line and a harmless no-op.

use crate::catalog::StimKind;
use crate::items::SubjectId;

/// Errors that can occur while consuming a stim or loading the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StimError {
    /// The catalog has no entry for this kind.
    UnknownStimKind(StimKind),
    /// Consume attempted outside the authoritative (server) context.
    RejectedContext,
    /// The catalog entry exists but is inconsistent.
    StaleConfig { kind: StimKind, reason: String },
    /// The stack being consumed is already empty.
    EmptyStack,
    /// The acting subject is not present in the world.
    UnknownSubject(SubjectId),
    /// Catalog data could not be parsed.
    Catalog(String),
}

impl From<serde_json::Error> for StimError {
    fn from(e: serde_json::Error) -> Self {
        StimError::Catalog(e.to_string())
    }
}

impl std::fmt::Display for StimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StimError::UnknownStimKind(kind) => write!(f, "Unknown stim kind: {}", kind),
            StimError::RejectedContext => {
                write!(f, "Stim use rejected: not in the authoritative context")
            }
            StimError::StaleConfig { kind, reason } => {
                write!(f, "Stale config for stim {}: {}", kind, reason)
            }
            StimError::EmptyStack => write!(f, "Item stack is empty"),
            StimError::UnknownSubject(subject) => write!(f, "Unknown subject: {}", subject),
            StimError::Catalog(e) => write!(f, "Catalog error: {}", e),
        }
    }
}

impl std::error::Error for StimError {}
