use std::path::PathBuf;

use reqwest::StatusCode;

/// Failures of a single upload round trip.
///
/// Every variant reaches the caller; the client neither logs-and-swallows nor
/// retries. Use [`UploadError::kind`] to branch on the category without
/// matching on transport details.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The local image could not be opened. No request was sent.
    #[error("image file unavailable at {}: {source}", .path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No response was received (DNS, connect, TLS, timeout, socket).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The service answered with `success = false`.
    #[error("server rejected upload: {message}")]
    Application { message: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("response does not match the upload result schema: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Input,
    Transport,
    Protocol,
    Application,
}

impl UploadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UploadError::Input { .. } => ErrorKind::Input,
            UploadError::Transport(_) => ErrorKind::Transport,
            UploadError::Protocol(_) => ErrorKind::Protocol,
            UploadError::Application { .. } => ErrorKind::Application,
        }
    }

    pub(crate) fn input(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        UploadError::Input {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    /// The HTTP client could not be built; no request was attempted.
    #[error("failed to build http client: {0}")]
    HttpClient(#[source] reqwest::Error),
}
