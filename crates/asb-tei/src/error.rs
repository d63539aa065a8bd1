//! Error types for the asb-tei codec.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("xml syntax error: {0}")]
  Xml(#[from] quick_xml::Error),

  #[error("malformed attribute: {0}")]
  Attribute(#[from] quick_xml::events::attributes::AttrError),

  #[error("closing tag </{0}> has no matching start tag")]
  UnexpectedEnd(String),

  #[error("document ended inside <{0}>")]
  UnclosedElement(String),

  #[error("document has no root element")]
  NoRoot,

  #[error("content after the root element: {0:?}")]
  TrailingContent(String),

  #[error("failed to read {path}: {source}")]
  Read {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to write xml: {0}")]
  Write(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
