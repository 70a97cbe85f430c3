//! Error types for the churn engine.
//!
//! This module defines the central `Error` enum shared by the identifier
//! stream, the cluster backends, the churn workers and the coordinator.
//!
//! ## Error Cases
//! - `NotFound`: The named resource does not exist (HTTP 404).
//! - `AlreadyExists`: A resource with that name already exists (HTTP 409).
//! - `Api`: Any other orchestration API or transport failure.
//! - `ChannelError`: The identifier hand-off between tasks broke down.
//! - `InvalidConfig`: A setting that makes churn impossible (e.g. zero slots).
//! - `ClientSetup`: An orchestration client could not be constructed.
//!
//! Errors returned by the coordinator (`InvalidConfig`, `ClientSetup`, or any
//! error from the template fetch) abort the process. Everything raised
//! during steady-state churn is logged and counted.

use super::types::ResourceKind;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the churn engine.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// The resource does not exist.
    #[error("{kind} {name:?} not found")]
    NotFound { kind: ResourceKind, name: String },

    /// The resource already exists.
    #[error("{kind} {name:?} already exists")]
    AlreadyExists { kind: ResourceKind, name: String },

    /// The orchestration API rejected the call or could not be reached.
    #[error("{kind} {name:?}: {message}")]
    Api {
        kind: ResourceKind,
        name: String,
        message: String,
    },

    /// Internal channel send/receive failure (e.g. the producer is gone).
    #[error("Channel error: {context}")]
    ChannelError { context: String },

    /// A configuration value is outside what the engine can run with.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// An orchestration client could not be built.
    #[error("Client setup failed: {context}")]
    ClientSetup { context: String },
}

impl Error {
    /// Returns `true` if the error reports a missing resource.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_resource() {
        let err = Error::NotFound {
            kind: ResourceKind::Service,
            name: "hp-3".to_string(),
        };
        assert_eq!(err.to_string(), "Service \"hp-3\" not found");
        assert!(err.is_not_found());
    }

    #[test]
    fn only_not_found_is_not_found() {
        let err = Error::Api {
            kind: ResourceKind::Endpoints,
            name: "hp-3".to_string(),
            message: "connection refused".to_string(),
        };
        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "Endpoints \"hp-3\": connection refused");
    }
}
