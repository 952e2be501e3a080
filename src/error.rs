use miette::Diagnostic;
use thiserror::Error;

/// Main error type for pmug operations
#[derive(Error, Diagnostic, Debug)]
pub enum PmugError {
    #[error("IO error: {0}")]
    #[diagnostic(code(pmug::io))]
    IoError(#[from] std::io::Error),

    #[error("IO error with {path}: {message}")]
    #[diagnostic(code(pmug::io))]
    Io {
        path: std::path::PathBuf,
        message: String,
    },

    #[error("Validation error: {message}")]
    #[diagnostic(code(pmug::validate))]
    Validation {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Decode error: {message}")]
    #[diagnostic(code(pmug::decode))]
    Decode {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Encode error: {message}")]
    #[diagnostic(code(pmug::encode))]
    Encode {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Store error: {message}")]
    #[diagnostic(code(pmug::store))]
    Store { message: String },

    #[error("Dispatch error: {message}")]
    #[diagnostic(code(pmug::dispatch))]
    Dispatch {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Config error: {message}")]
    #[diagnostic(code(pmug::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },
}

/// Stable error classification, independent of the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ValidationError,
    DecodeError,
    EncodeError,
    StoreError,
    DispatchError,
    ConfigError,
    IoError,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "ValidationError",
            ErrorKind::DecodeError => "DecodeError",
            ErrorKind::EncodeError => "EncodeError",
            ErrorKind::StoreError => "StoreError",
            ErrorKind::DispatchError => "DispatchError",
            ErrorKind::ConfigError => "ConfigError",
            ErrorKind::IoError => "IoError",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PmugError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            help: None,
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
            help: None,
        }
    }

    pub fn encode(message: impl Into<String>) -> Self {
        Self::Encode {
            message: message.into(),
            help: None,
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    pub fn dispatch(message: impl Into<String>) -> Self {
        Self::Dispatch {
            message: message.into(),
            help: None,
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PmugError::IoError(_) | PmugError::Io { .. } => ErrorKind::IoError,
            PmugError::Validation { .. } => ErrorKind::ValidationError,
            PmugError::Decode { .. } => ErrorKind::DecodeError,
            PmugError::Encode { .. } => ErrorKind::EncodeError,
            PmugError::Store { .. } => ErrorKind::StoreError,
            PmugError::Dispatch { .. } => ErrorKind::DispatchError,
            PmugError::Config { .. } => ErrorKind::ConfigError,
        }
    }

    /// Whether retrying the same request could succeed.
    ///
    /// Input errors never succeed on retry; network-facing stages might.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::StoreError | ErrorKind::DispatchError)
    }
}

pub type Result<T> = std::result::Result<T, PmugError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(PmugError::validation("x").kind(), ErrorKind::ValidationError);
        assert_eq!(PmugError::decode("x").kind(), ErrorKind::DecodeError);
        assert_eq!(PmugError::encode("x").kind(), ErrorKind::EncodeError);
        assert_eq!(PmugError::store("x").kind(), ErrorKind::StoreError);
        assert_eq!(PmugError::dispatch("x").kind(), ErrorKind::DispatchError);
    }

    #[test]
    fn test_retryable() {
        assert!(!PmugError::validation("bad hex").is_retryable());
        assert!(!PmugError::encode("no frames").is_retryable());
        assert!(PmugError::store("timeout").is_retryable());
    }

    #[test]
    fn test_display_includes_message() {
        let err = PmugError::validation("Row 2 has 3 pixels, expected 4");
        assert_eq!(
            err.to_string(),
            "Validation error: Row 2 has 3 pixels, expected 4"
        );
    }
}
