use thiserror::Error;

/// Failures on read-only chain paths (balances, allowances, prices, permit
/// probes). These always degrade to a default at the call site and are never
/// fatal to a scan.
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("Batch read failed: {0}")]
    Batch(String),

    #[error("Read call failed: {0}")]
    Call(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Capability not supported: {0}")]
    Unsupported(String),
}

/// Failures on the approval execution path. `UserRejected` is a first-class
/// condition with its own retry policy; everything else marks the token
/// `needs-approve` and the queue advances.
#[derive(Error, Debug)]
pub enum ApproveError {
    #[error("User rejected the request")]
    UserRejected,

    #[error("No wallet connected")]
    NoWallet,

    #[error("Chain switch failed: {0}")]
    ChainSwitch(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Transaction failed: {0}")]
    Transaction(String),

    #[error("Malformed signature: {0}")]
    MalformedSignature(String),

    #[error("Session invalidated")]
    Stale,

    #[error(transparent)]
    Read(#[from] ReadError),
}

/// Provider error code conventionally returned for an explicit user
/// rejection of a signature or transaction prompt.
pub const USER_REJECTED_CODE: i64 = 4001;

impl ApproveError {
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, ApproveError::UserRejected)
    }

    /// Maps a raw provider failure to the taxonomy. Rejections are detected
    /// via the well-known error code or a message substring; anything else
    /// surfaces as a generic execution failure.
    pub fn from_provider(code: Option<i64>, message: &str) -> Self {
        if code == Some(USER_REJECTED_CODE) {
            return ApproveError::UserRejected;
        }
        let lowered = message.to_lowercase();
        if lowered.contains("user rejected") || lowered.contains("user denied") {
            ApproveError::UserRejected
        } else {
            ApproveError::Transaction(message.to_string())
        }
    }
}

/// Key-value store failures.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serde(String),

    #[error("Store backend error: {0}")]
    Backend(String),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serde(e.to_string())
    }
}

/// Operator-surface failures from the admin control editor.
#[derive(Error, Debug)]
pub enum AdminError {
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("No payout schedule recorded for this wallet")]
    NoSchedule,

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type ReadResult<T> = Result<T, ReadError>;
pub type ApproveResult<T> = Result<T, ApproveError>;
pub type StoreResult<T> = Result<T, StoreError>;
pub type AdminResult<T> = Result<T, AdminError>;
