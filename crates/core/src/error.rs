//! Errors from parsing domain values.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("unknown pace: {0} (expected relaxed, standard or packed)")]
    UnknownPace(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
