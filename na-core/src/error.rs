use std::io;

use thiserror::Error;

pub type Result<T> = ::std::result::Result<T, Error>;

/// Recoverable failures: configuration and I/O. Broken algebraic
/// preconditions (time or shape mismatches) are not represented here; they
/// panic at the call site.
#[derive(Debug, Error)]
pub enum Error {
  #[error("I/O error: {0}")]
  Io(#[from] io::Error),
  #[error("malformed JSON: {0}")]
  Json(#[from] serde_json::Error),
  #[error("configuration error: {0}")]
  Config(String),
  #[error("unknown variable `{0}`")]
  UnknownVariable(String),
  #[error("duplicate variable `{0}`")]
  DuplicateVariable(String),
  #[error("shape mismatch: expected (levels, cells) = {expected:?}, found {found:?}")]
  ShapeMismatch {
    expected: (usize, usize),
    found: (usize, usize),
  },
  #[error("{what} {index} out of range (limit {limit})")]
  OutOfRange {
    what: &'static str,
    index: usize,
    limit: usize,
  },
}

impl Error {
  pub fn config<S>(msg: S) -> Error
    where S: Into<String>,
  {
    Error::Config(msg.into())
  }
}
