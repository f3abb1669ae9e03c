//! Error types and handling for scorekv
//!
//! Two error worlds live here. `ScoreKvError` covers server-side failures
//! (network, config, framing) that are logged and may close a connection.
//! `CommandError` is the client-visible taxonomy that travels over the wire
//! as a tagged `err` response with a numeric code.

use thiserror::Error;

/// Main error type for scorekv operations
#[derive(Debug, Error)]
pub enum ScoreKvError {
    #[error("Network error: {message}")]
    NetworkError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        connection_id: Option<String>,
    },

    #[error("Protocol error: {message}")]
    ProtocolError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        connection_id: Option<String>,
    },

    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
        config_key: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Internal error: {message}")]
    InternalError {
        message: String,
        component: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Convenience type alias for Results
pub type Result<T> = std::result::Result<T, ScoreKvError>;

impl ScoreKvError {
    /// Check if the error was caused by client behavior rather than a
    /// server-side fault, for log-level selection.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ScoreKvError::ProtocolError { .. })
    }
}

/// Kind of a client-visible command failure. The wire carries only the
/// numeric code; the kind keeps dispatch code readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Command name not present in the registry
    UnknownCommand,
    /// Known command, wrong number of arguments
    BadArity,
    /// Operation applied to a key holding the other value type
    WrongType,
    /// Numeric argument failed to parse. Always code 4; the message
    /// ("expect float" / "expect int") names the expected type.
    BadArgument,
}

impl ErrorKind {
    pub fn code(self) -> i32 {
        match self {
            ErrorKind::UnknownCommand => 1,
            ErrorKind::BadArity => 2,
            ErrorKind::WrongType => 3,
            ErrorKind::BadArgument => 4,
        }
    }
}

/// A command failure reported to the client as a tagged `err` response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CommandError {
    pub kind: ErrorKind,
    pub message: String,
}

impl CommandError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unknown_command(name: &str) -> Self {
        Self::new(
            ErrorKind::UnknownCommand,
            format!("unknown command '{name}'"),
        )
    }

    pub fn bad_arity(name: &str) -> Self {
        Self::new(
            ErrorKind::BadArity,
            format!("wrong number of arguments for '{name}'"),
        )
    }

    pub fn wrong_type() -> Self {
        Self::new(ErrorKind::WrongType, "wrong type")
    }

    /// Score token was not a floating-point literal. Code and message text
    /// are part of the observable contract.
    pub fn expect_float() -> Self {
        Self::new(ErrorKind::BadArgument, "expect float")
    }

    /// Offset/limit/TTL token was not an integer literal. Code and message
    /// text are part of the observable contract.
    pub fn expect_int() -> Self {
        Self::new(ErrorKind::BadArgument, "expect int")
    }

    pub fn code(&self) -> i32 {
        self.kind.code()
    }
}
