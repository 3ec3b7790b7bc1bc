//! Error taxonomy for credential acquisition and Classroom calls.

use thiserror::Error;

/// Failures surfaced to command handlers.
///
/// Read failures on the saved credential are never reported here; the
/// credential provider treats them as a cache miss.
#[derive(Debug, Error)]
pub enum Error {
    /// The interactive grant could not complete (user cancelled, network
    /// unreachable, malformed client registration).
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// A freshly granted credential could not be durably saved. Surfaced
    /// rather than swallowed: losing the token forces re-authentication on
    /// the next run.
    #[error("failed to persist credentials: {0}")]
    Persistence(String),

    /// The Classroom API call failed or returned an unexpected shape.
    #[error("classroom request failed: {0}")]
    Downstream(String),

    /// Configuration was missing or unusable.
    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
