//! Error types for the Junos client.
//!
//! Every failure is returned synchronously to the caller. Nothing is retried
//! and nothing is rolled back on the caller's behalf: a partial failure (for
//! example a load that succeeded followed by a commit that did not) leaves the
//! device in the intermediate state, and the error says which step failed.

use crate::transport::TransportError;
use std::fmt;
use thiserror::Error;

/// Result type alias for Junos operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A single `rpc-error` entry reported by the device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RpcError {
    /// Error type (protocol, application, rpc, transport)
    pub error_type: String,
    /// Error tag (e.g. `invalid-value`, `lock-denied`)
    pub error_tag: String,
    /// Error severity (`error` or `warning`)
    pub severity: String,
    /// Configuration path of the offending statement, if any
    pub path: Option<String>,
    /// Offending element (`error-info/bad-element`), if any
    pub bad_element: Option<String>,
    /// Human readable message
    pub message: String,
}

impl RpcError {
    /// Create an error entry carrying only a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            severity: "error".to_string(),
            message: message.into(),
            ..Default::default()
        }
    }

    /// Whether this entry is only a warning.
    pub fn is_warning(&self) -> bool {
        self.severity.eq_ignore_ascii_case("warning")
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(ref element) = self.bad_element {
            write!(f, " (bad element: {})", element)?;
        }
        if let Some(ref path) = self.path {
            write!(f, " at {}", path)?;
        }
        Ok(())
    }
}

/// Renders a list of device errors as the first message plus a count of the rest.
pub(crate) struct ErrorList<'a>(pub &'a [RpcError]);

impl fmt::Display for ErrorList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            [] => f.write_str("device reported an unspecified error"),
            [only] => write!(f, "{}", only),
            [first, rest @ ..] => write!(f, "{} (and {} more)", first, rest.len()),
        }
    }
}

/// The main error type for the Junos client.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Connection, authentication, or framing failure. Fatal to the session.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    // ========================================================================
    // Device Errors
    // ========================================================================
    /// The device replied with one or more `rpc-error` entries.
    #[error("Device error: {}", ErrorList(.errors))]
    DeviceRpc {
        /// Every error the device reported, in reply order
        errors: Vec<RpcError>,
    },

    /// The candidate configuration is locked by another operator.
    #[error("Configuration lock denied: {}", ErrorList(.errors))]
    LockConflict {
        /// Every error the device reported, in reply order
        errors: Vec<RpcError>,
    },

    /// `commit check` reported errors in the candidate configuration.
    #[error("Configuration check failed: {}", ErrorList(.errors))]
    Validation {
        /// Per-statement error detail
        errors: Vec<RpcError>,
    },

    /// The commit was rejected.
    #[error("Commit failed: {}", ErrorList(.errors))]
    Commit {
        /// Per-statement error detail
        errors: Vec<RpcError>,
    },

    /// The configuration payload was rejected or could not be read.
    #[error("Failed to load configuration: {message}")]
    Load {
        /// Summary of the failure
        message: String,
        /// Device-reported detail, empty for local failures
        errors: Vec<RpcError>,
    },

    /// The requested section, rollback slot, or rescue configuration does not exist.
    #[error("{what} not found: {message}")]
    NotFound {
        /// What was requested
        what: String,
        /// Why it is considered missing
        message: String,
    },

    /// The view is not available on this hardware platform.
    #[error("{view} information is not available on platform {model}")]
    UnsupportedOnPlatform {
        /// Requested view
        view: String,
        /// Model of the first routing engine
        model: String,
    },

    /// The feature needs a newer Junos release than the device runs.
    #[error("{feature} requires Junos {minimum} or later, device runs {version}")]
    UnsupportedRelease {
        /// Requested feature
        feature: String,
        /// Release running on the device
        version: String,
        /// Oldest release with the feature
        minimum: String,
    },

    /// The caller supplied an unrecognized or out-of-range argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ========================================================================
    // Decoding / Ambient Errors
    // ========================================================================
    /// A reply could not be parsed as XML.
    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),

    /// A reply parsed but did not have the expected shape.
    #[error("Unexpected reply: {0}")]
    UnexpectedReply(String),

    /// HTTP failure talking to a Junos Space server.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Junos Space answered with a non-success status.
    #[error("Junos Space returned {status}: {body}")]
    SpaceStatus {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Device errors attached to this error, if any.
    pub fn rpc_errors(&self) -> &[RpcError] {
        match self {
            Error::DeviceRpc { errors }
            | Error::LockConflict { errors }
            | Error::Validation { errors }
            | Error::Commit { errors }
            | Error::Load { errors, .. } => errors,
            _ => &[],
        }
    }

    /// Whether this error means the requested item does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    pub(crate) fn not_found(what: impl Into<String>, message: impl Into<String>) -> Self {
        Error::NotFound {
            what: what.into(),
            message: message.into(),
        }
    }
}
