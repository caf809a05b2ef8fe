use std::time::Duration;

use crate::constants::READ_HANDLE_BASE;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A request was rejected synchronously by the native engine.
    #[error("native engine returned error {0:#x}")]
    Native(u32),
    /// The interaction completed with a nonzero terminal status.
    #[error("interaction completed with error {0:#x}")]
    Status(u32),
    #[error("read handle {0} is reserved, read handles start at {}", READ_HANDLE_BASE)]
    HandleBelowReserved(u64),
    #[error("a read callback for handle {0} is already registered")]
    DuplicateRegistration(u64),
    #[error("{record} record needs {expected} bytes, got {actual}")]
    Truncated {
        record: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("invalid TLV data: {0}")]
    Tlv(String),
    #[error("no response after {0:?}")]
    Timeout(Duration),
    #[error("invalid client configuration: {0}")]
    Config(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "std-tokio")]
    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
