//! Error types shared across TMBlock crates.

/// Top-level error type for TMBlock operations.
#[derive(Debug, thiserror::Error)]
pub enum TmblockError {
    #[error("Resource exhausted: {message}")]
    ResourceExhausted { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Format rejected on {endpoint}: {message}")]
    FormatRejected { endpoint: String, message: String },

    /// Not enough input queued to form a pair; the host should retry later.
    #[error("Would block: {message}")]
    WouldBlock { message: String },

    #[error("End of stream on {endpoint}")]
    EndOfStream { endpoint: String },

    #[error("Synchronization error: {message}")]
    Sync { message: String },

    #[error("Transform failed with status {code}")]
    TransformFailed { code: i32 },

    #[error("Emit error: {message}")]
    Emit { message: String },

    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using TmblockError.
pub type TmblockResult<T> = Result<T, TmblockError>;

impl TmblockError {
    pub fn resource_exhausted(msg: impl Into<String>) -> Self {
        Self::ResourceExhausted {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn format_rejected(endpoint: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::FormatRejected {
            endpoint: endpoint.into(),
            message: msg.into(),
        }
    }

    pub fn would_block(msg: impl Into<String>) -> Self {
        Self::WouldBlock {
            message: msg.into(),
        }
    }

    pub fn end_of_stream(endpoint: impl Into<String>) -> Self {
        Self::EndOfStream {
            endpoint: endpoint.into(),
        }
    }

    pub fn sync(msg: impl Into<String>) -> Self {
        Self::Sync {
            message: msg.into(),
        }
    }

    pub fn emit(msg: impl Into<String>) -> Self {
        Self::Emit {
            message: msg.into(),
        }
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState {
            message: msg.into(),
        }
    }

    /// True when the host should simply re-drive the filter once more input
    /// has arrived.
    pub fn is_would_block(&self) -> bool {
        matches!(self, Self::WouldBlock { .. })
    }

    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::EndOfStream { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let e = TmblockError::config("unknown transform 'blur'");
        assert_eq!(e.to_string(), "Configuration error: unknown transform 'blur'");

        let e = TmblockError::TransformFailed { code: -22 };
        assert_eq!(e.to_string(), "Transform failed with status -22");

        let e = TmblockError::format_rejected("logo", "no common format");
        assert_eq!(e.to_string(), "Format rejected on logo: no common format");
    }

    #[test]
    fn test_would_block_classification() {
        assert!(TmblockError::would_block("logo queue empty").is_would_block());
        assert!(!TmblockError::sync("host failure").is_would_block());
        assert!(TmblockError::end_of_stream("primary").is_end_of_stream());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short frame");
        let e: TmblockError = io.into();
        assert!(matches!(e, TmblockError::Io(_)));
        assert!(e.to_string().contains("short frame"));
    }
}
