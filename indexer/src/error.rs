//! Error types for the indexer.
//!
//! The taxonomy mirrors the failure modes of the scan loop: RPC transport
//! and provider errors, log decode errors, store errors, and configuration
//! errors. Decode errors are recoverable per log; everything else fails the
//! enclosing batch.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised by indexer components.
#[derive(Debug, Error)]
pub enum IndexerError {
    /// The JSON-RPC provider returned an error payload.
    #[error("rpc error: {0}")]
    Rpc(String),

    /// The HTTP transport to the provider failed (timeout, connection).
    #[error("rpc transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A response was well-formed JSON but not the shape we asked for.
    #[error("malformed rpc response: {0}")]
    MalformedResponse(String),

    /// A log could not be decoded against its event signature.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The event store failed (connection, constraint, query).
    #[error("store error: {0}")]
    Store(String),

    /// Startup configuration was missing or invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl From<sqlx::Error> for IndexerError {
    fn from(err: sqlx::Error) -> Self {
        Self::Store(err.to_string())
    }
}

/// Errors raised while decoding a raw log into an event record.
///
/// These never abort a batch: the scheduler skips the offending log and
/// keeps going.
#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    /// The log is missing an expected topic.
    #[error("missing topic at position {0}")]
    MissingTopic(usize),

    /// The log carries fewer data bytes than the signature requires.
    #[error("event data too short: {actual} bytes, need {expected}")]
    ShortData {
        /// Bytes present in the log data field.
        actual: usize,
        /// Bytes the event signature requires.
        expected: usize,
    },

    /// A hex field failed to parse.
    #[error("malformed hex in {field}: {value}")]
    BadHex {
        /// Name of the offending field.
        field: &'static str,
        /// The raw value that failed to parse.
        value: String,
    },

    /// The topic count does not match the signature's indexed arguments.
    #[error("unexpected topic count: got {actual}, expected {expected}")]
    TopicCount {
        /// Topics present on the log.
        actual: usize,
        /// Topics the signature declares.
        expected: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_error_display() {
        let err = DecodeError::ShortData {
            actual: 10,
            expected: 64,
        };
        assert_eq!(err.to_string(), "event data too short: 10 bytes, need 64");
    }

    #[test]
    fn indexer_error_wraps_decode() {
        let err = IndexerError::from(DecodeError::MissingTopic(1));
        assert!(err.to_string().contains("missing topic at position 1"));
    }
}
