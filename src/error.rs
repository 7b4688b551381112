use thiserror::Error;

use crate::storage::row::Value;

#[derive(Debug, Error)]
pub enum KeysetError {
    #[error("batch size must be at least 1, got {0}")]
    InvalidBatchSize(usize),
    #[error("failed to determine the iteration key, specify it explicitly in the options")]
    MissingIterationKey,
    #[error("column '{0}' not found")]
    ColumnNotFound(String),
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
    #[error("duplicate primary key {0}")]
    DuplicateKey(Value),
    #[error("row is missing a value for iteration key '{0}'")]
    MissingKeyValue(String),
    #[error("iteration stalled: more than one batch of rows share {key} = {value}")]
    Stalled { key: String, value: Value },
    #[error("cannot materialize entity: {0}")]
    Materialize(String),
    #[error("query failed: {0}")]
    QueryMessage(String),
    #[error("query failed: {0}")]
    Query(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl KeysetError {
    /// Wraps an error raised by a query source.
    pub fn query<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        KeysetError::Query(Box::new(err))
    }
}

pub type KeysetResult<T> = Result<T, KeysetError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::io;

    #[test]
    fn wrapped_source_errors_keep_their_cause() {
        let err = KeysetError::query(io::Error::new(io::ErrorKind::TimedOut, "statement timeout"));
        assert_eq!(err.to_string(), "query failed: statement timeout");
        assert!(err.source().is_some());
    }

    #[test]
    fn stall_message_names_the_key() {
        let err = KeysetError::Stalled { key: "id".into(), value: Value::Integer(4) };
        assert_eq!(err.to_string(), "iteration stalled: more than one batch of rows share id = 4");
    }
}
