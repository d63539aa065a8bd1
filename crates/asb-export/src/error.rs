//! Error types for the exporters.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("failed to write {path}: {source}")]
  Write {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("json encoding error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("xml encoding error: {0}")]
  Tei(#[from] asb_tei::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
