use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    /// The command channel to the playback engine is closed. Unlike the other
    /// variants this is a terminal condition: the connection must be
    /// re-established before further commands can succeed.
    #[error("Bridge command channel closed: {0}")]
    ChannelClosed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Returns `true` if the failure may succeed on retry over the same
    /// connection.
    pub fn is_transient(&self) -> bool {
        !matches!(self, BridgeError::ChannelClosed(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
