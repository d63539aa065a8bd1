//! Error types for `asb-core`.
//!
//! Only strict-mode failures surface here. A document that cannot be loaded
//! is recorded in the diagnostics instead.

use thiserror::Error;

use crate::store::Collision;

#[derive(Debug, Error)]
pub enum Error {
  /// Two fragments claimed the same global id and neither was marked as a
  /// copy.
  #[error("{0}")]
  DuplicateIdentifier(Collision),

  #[error("document id {0:?} is used by more than one file")]
  DuplicateDocument(String),

  #[error("unknown event type {0:?}")]
  UnknownEventType(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
