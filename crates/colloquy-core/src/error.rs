use thiserror::Error;

/// Top-level error type for Colloquy infrastructure concerns.
///
/// Covers configuration, I/O and serialization failures plus server
/// startup. Conversation-level failures (unknown chats, network
/// failures during a send) live in `colloquy_chat::ChatError`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ColloquyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("API error: {0}")]
    Api(String),
}

impl From<toml::de::Error> for ColloquyError {
    fn from(err: toml::de::Error) -> Self {
        ColloquyError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ColloquyError {
    fn from(err: toml::ser::Error) -> Self {
        ColloquyError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ColloquyError {
    fn from(err: serde_json::Error) -> Self {
        ColloquyError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Colloquy infrastructure operations.
pub type Result<T> = std::result::Result<T, ColloquyError>;
