//! Error types for the reply-thread exporter.

/// Result type used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while fetching, ordering or writing threads.
///
/// Threads that fall outside the configured reply range and orphaned
/// replies are not errors: the first are skipped and the second are
/// excluded from the nested output.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Store query or write failure
    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    /// I/O error from a stream sink or a file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Graph collection could not be serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration or parameters
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file could not be parsed
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Feature combination the media helper does not support
    #[error("Unsupported projection: {0}")]
    UnsupportedProjection(String),

    /// A column a sink needs is missing from a record
    #[error("Column '{column}' missing from record {node}")]
    MissingColumn {
        /// Name of the missing column
        column: String,
        /// Identity of the record
        node: i64,
    },
}

impl Error {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("min 5 is greater than max 2");
        assert_eq!(
            err.to_string(),
            "Configuration error: min 5 is greater than max 2"
        );

        let err = Error::MissingColumn {
            column: "created_at".to_string(),
            node: 42,
        };
        assert_eq!(err.to_string(), "Column 'created_at' missing from record 42");
    }

    #[test]
    fn test_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
