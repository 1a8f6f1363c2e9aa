//! Error types for harvesting operations.
//!
//! This module provides the [`OaiError`] type for all engine operations and
//! the [`Result`] convenience type.
//!
//! Errors fall into two groups:
//! - **Protocol errors** map one-to-one onto OAI-PMH error codes and are
//!   rendered as `<error code="...">` bodies by the provider.
//! - **Infrastructure errors** (store failures, broken configuration, I/O)
//!   abort the current request and are surfaced to the caller.

use thiserror::Error;

/// Error type for all harvesting engine operations.
#[derive(Error, Debug)]
pub enum OaiError {
    /// The verb argument is missing, repeated, or not a legal OAI-PMH verb.
    #[error("Bad verb: {0}")]
    BadVerb(String),

    /// The request includes illegal arguments, is missing required ones,
    /// repeats an argument, or has an argument with an illegal value.
    #[error("Bad argument: {0}")]
    BadArgument(String),

    /// The resumption token is invalid, corrupted, or conflicts with the request.
    #[error("Bad resumption token: {0}")]
    BadResumptionToken(String),

    /// The combination of arguments results in an empty list.
    #[error("No records match: {0}")]
    NoRecordsMatch(String),

    /// The identifier is unknown or not exposed by this repository.
    #[error("Identifier does not exist: {0}")]
    IdDoesNotExist(String),

    /// The requested set is unknown, or the repository does not support sets.
    #[error("No set hierarchy: {0}")]
    NoSetHierarchy(String),

    /// The metadata format is not supported by the item or the repository.
    #[error("Cannot disseminate format: {0}")]
    CannotDisseminateFormat(String),

    /// The backing record store failed.
    #[error("Record store error: {0}")]
    Store(String),

    /// A metadata mapper failed to produce a payload.
    #[error("Metadata mapping error: {0}")]
    Mapping(String),

    /// The engine configuration is invalid.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO error while loading configuration.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl OaiError {
    /// The OAI-PMH error code for protocol errors, `None` for infrastructure errors.
    #[must_use]
    pub fn protocol_code(&self) -> Option<&'static str> {
        match self {
            OaiError::BadVerb(_) => Some("badVerb"),
            OaiError::BadArgument(_) => Some("badArgument"),
            OaiError::BadResumptionToken(_) => Some("badResumptionToken"),
            OaiError::NoRecordsMatch(_) => Some("noRecordsMatch"),
            OaiError::IdDoesNotExist(_) => Some("idDoesNotExist"),
            OaiError::NoSetHierarchy(_) => Some("noSetHierarchy"),
            OaiError::CannotDisseminateFormat(_) => Some("cannotDisseminateFormat"),
            OaiError::Store(_)
            | OaiError::Mapping(_)
            | OaiError::Config(_)
            | OaiError::IoError(_) => None,
        }
    }

    /// Whether this error is an expected protocol condition rather than a failure.
    #[must_use]
    pub fn is_protocol_error(&self) -> bool {
        self.protocol_code().is_some()
    }

    /// The human-readable detail without the error-kind prefix.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            OaiError::BadVerb(msg)
            | OaiError::BadArgument(msg)
            | OaiError::BadResumptionToken(msg)
            | OaiError::NoRecordsMatch(msg)
            | OaiError::IdDoesNotExist(msg)
            | OaiError::NoSetHierarchy(msg)
            | OaiError::CannotDisseminateFormat(msg)
            | OaiError::Store(msg)
            | OaiError::Mapping(msg)
            | OaiError::Config(msg) => msg.clone(),
            OaiError::IoError(e) => e.to_string(),
        }
    }
}

/// Convenience type alias for [`std::result::Result`] with [`OaiError`].
pub type Result<T> = std::result::Result<T, OaiError>;
