use graphload_client::ClientError;

pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read {input}: {source}")]
    Read {
        input: String,
        #[source]
        source: std::io::Error,
    },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("aborted during {stage}: {reason}")]
    Aborted { stage: &'static str, reason: String },
}
