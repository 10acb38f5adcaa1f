//! Error types for the generation engine
//!
//! Every step of the remote choreography fails with a distinct variant so
//! callers and operators can tell a changed site layout from an unreachable
//! network. Failures are terminal for the current request; nothing is
//! retried.

use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving a remote generator page
#[derive(Error, Debug)]
pub enum Error {
    /// Caller-supplied template id is not in the catalog
    #[error("Unknown template id: {0}")]
    UnknownTemplate(String),

    /// Caller omitted the required text
    #[error("Missing text parameter")]
    MissingInput,

    /// Template page could not be loaded (network/timeout)
    #[error("Template page unreachable: {0}")]
    Unreachable(String),

    /// The hidden session token is absent from the template page. The remote
    /// contract is assumed broken or an anti-automation challenge was served.
    #[error("Session token not found in template page")]
    TokenNotFound,

    /// The server-generated payload is absent from the submission response
    #[error("Generated payload not found in submission response")]
    PayloadNotFound,

    /// No fillable input fields were discovered on the rendered page
    #[error("Input field not found")]
    InputsNotFound,

    /// Submission ran but no qualifying output asset could be located
    #[error("Failed to generate image")]
    ImageNotFound,

    /// The remote site returned an error status or malformed response
    #[error("Remote site error: {0}")]
    RemoteError(String),

    /// Invalid configuration or environment (e.g. browser unavailable)
    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

impl Error {
    /// True when the failure was caused by the caller's request rather than
    /// the remote choreography. The API boundary maps these to 400.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Error::UnknownTemplate(_) | Error::MissingInput)
    }
}
