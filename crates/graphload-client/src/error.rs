//! Client error taxonomy.
//!
//! Two classes of failure matter to callers:
//! - **fatal**: authentication was refused or the transport itself failed,
//!   so nothing else in the run can succeed;
//! - **per-record**: the store rejected one request (non-2xx) or answered
//!   with an unexpected body. Callers are expected to record these and move on.

use reqwest::StatusCode;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("authentication failed: server answered {status}")]
    Authentication { status: StatusCode },

    #[error("store returned {status}: {body}")]
    Response { status: StatusCode, body: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("invalid identifier `{0}` (expected [A-Za-z_][A-Za-z0-9_]*)")]
    InvalidIdentifier(String),

    #[error("invalid record id `{0}` (expected #cluster:position)")]
    InvalidRecordId(String),

    #[error("cannot infer export format from `{}` (expected .json or .json.gz)", .0.display())]
    UnsupportedExportTarget(std::path::PathBuf),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Authentication and transport failures end the run; everything else is
    /// scoped to the request that produced it.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ClientError::Authentication { .. } | ClientError::Transport(_)
        )
    }

    /// The store reports duplicate schema objects as a generic server error
    /// with an "already exists" message.
    pub fn is_already_exists(&self) -> bool {
        match self {
            ClientError::Response { body, .. } => {
                body.to_ascii_lowercase().contains("already exists")
            }
            _ => false,
        }
    }
}
