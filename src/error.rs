//! Error types for lookup, rendering and export

use thiserror::Error;

/// Result type alias for crate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Tagged failure of the statistics lookup.
///
/// `UserNotFound` is a well-formed empty result and must be told apart from
/// `LookupFailed`, which covers transport errors and non-2xx statuses.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The username was blank; no request was sent
    #[error("Please enter a username")]
    EmptyUsername,

    /// Transport failure, non-2xx status or an unreadable body
    #[error("Unable to fetch user: {0}")]
    LookupFailed(String),

    /// The provider answered with an empty `users` list
    #[error("No user found with username \"{0}\"")]
    UserNotFound(String),
}

/// Failures raised at the export boundary.
#[derive(Error, Debug)]
pub enum ExportError {
    /// Fonts or embedded images did not settle before capture
    #[error("Certificate not fully rendered: {0}")]
    RenderIncomplete(String),

    /// The capture or assembly backend failed or produced malformed bytes
    #[error("Capture failed: {0}")]
    CaptureFailed(String),

    /// The certificate was unmounted or replaced while the export was running
    #[error("Certificate was detached before the export finished")]
    Detached,

    /// Writing the artifact failed
    #[error("Failed to save artifact: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur anywhere in the crate
#[derive(Error, Debug)]
pub enum Error {
    /// Statistics lookup failed
    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// Export failed
    #[error(transparent)]
    Export(#[from] ExportError),

    /// Stats record cannot be rendered
    #[error("Invalid statistics: {0}")]
    InvalidStats(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl ExportError {
    /// Short title suitable for a user notification.
    pub fn title(&self) -> &'static str {
        match self {
            ExportError::RenderIncomplete(_) => "Certificate is still loading",
            ExportError::CaptureFailed(_) => "Could not create the certificate file",
            ExportError::Detached => "Certificate changed during download",
            ExportError::Io(_) => "Could not save the certificate file",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_messages_are_user_facing() {
        assert_eq!(LookupError::EmptyUsername.to_string(), "Please enter a username");
        assert_eq!(
            LookupError::UserNotFound("ana".into()).to_string(),
            "No user found with username \"ana\""
        );
    }

    #[test]
    fn export_error_wraps_into_crate_error() {
        let err: Error = ExportError::Detached.into();
        assert!(matches!(err, Error::Export(ExportError::Detached)));
    }
}
