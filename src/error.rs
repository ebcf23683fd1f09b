use thiserror::Error;

/// Error surface for every fallible [`crate::Tree`] operation.
///
/// Every variant derives [`Clone`] and [`PartialEq`] so tests can assert on
/// error identity directly instead of matching on message text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BTreeError {
    #[error("key already exists")]
    DuplicateKey,

    #[error("key not found")]
    KeyNotFound,

    #[error("invalid range: {0}")]
    InvalidRange(&'static str),

    #[error("keys are not comparable")]
    IncomparableKey,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, BTreeError>;
