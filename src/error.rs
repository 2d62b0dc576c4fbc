use thiserror::Error;

/// Failures of a single request against the remote block source.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Bad HTTP status code: {0}")]
    Status(u16),

    #[error("Request timed out")]
    Timeout,

    #[error("Connection reset by peer")]
    ConnectionReset,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Got response with error: {code}, {message}")]
    Rpc { code: i64, message: String },

    #[error("Block #{0} is not available yet")]
    NotAvailable(u64),

    #[error("Request task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<ureq::Error> for SourceError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => SourceError::Status(code),
            ureq::Error::Timeout(_) => SourceError::Timeout,
            ureq::Error::Io(e) if e.kind() == std::io::ErrorKind::ConnectionReset => {
                SourceError::ConnectionReset
            }
            ureq::Error::Io(e) if e.kind() == std::io::ErrorKind::TimedOut => SourceError::Timeout,
            other => SourceError::Transport(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Malformed(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum PollerError {
    #[error("Could not determine the initial block number: {0}")]
    Init(#[source] SourceError),

    #[error("Could not fetch the initial block #{number}: {source}")]
    FirstBlock {
        number: u64,
        #[source]
        source: SourceError,
    },

    #[error("Block queue closed by the consumer")]
    QueueClosed,

    #[error("Poller is {0:?}; expected {1:?}")]
    InvalidState(crate::poller::PollerState, crate::poller::PollerState),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Storage is shut down")]
    Closed,

    #[error("Internal storage error: {0}")]
    Internal(String),
}

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Block stream error: {0}")]
    Stream(#[from] PollerError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Block stream already taken")]
    StreamTaken,

    #[error("Block stream routine failed: {0}")]
    Routine(#[from] tokio::task::JoinError),
}

pub type Result<T, E = ParserError> = std::result::Result<T, E>;
