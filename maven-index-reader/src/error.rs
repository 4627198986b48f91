use std::io;

/// The error type for every fallible operation in this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("properties error: {0}")]
    Properties(#[from] PropertiesError),

    #[error("resource error: {0}")]
    Resource(#[from] ResourceError),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("expansion error: {0}")]
    Expansion(String),

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum PropertiesError {
    #[error("key not found: {0}")]
    KeyNotFound(String),
    #[error("line has no '=': {0:?}")]
    MalformedLine(String),
    #[error("value for key {0:?} is not a valid integer: {1:?}")]
    InvalidInt(String, String),
    #[error("value for key {0:?} is not a valid timestamp: {1:?}")]
    InvalidTimestamp(String, String),
    #[error("catalog identity mismatch: expected id {expected_id:?}/chain {expected_chain:?}, got {actual_id:?}/{actual_chain:?}")]
    IdentityMismatch {
        expected_id: String,
        expected_chain: String,
        actual_id: String,
        actual_chain: String,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("resource already consumed")]
    AlreadyOpened,
    #[error("local path does not exist: {0}")]
    NotFound(String),
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("truncated input while reading {0}")]
    Truncated(&'static str),
    #[error("invalid modified-UTF-8 sequence at leading byte {0:#04x}")]
    InvalidModifiedUtf8(u8),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
