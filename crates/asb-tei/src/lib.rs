//! TEI/XML document codec for the ASB resolver.
//!
//! Parses case-file documents into an owned [`Element`] tree and writes trees
//! back out. Pure synchronous; knows nothing about events or persons.
//!
//! # Quick start
//!
//! ```no_run
//! use asb_tei::{Document, NoSlots, write_element};
//!
//! let doc = Document::load("cases/0001.xml").unwrap();
//! for person in doc.root.find_all("person") {
//!   println!("{}", write_element(person, &mut NoSlots).unwrap());
//! }
//! ```

pub mod error;
mod parse;
mod serialize;
mod tree;

use std::path::{Path, PathBuf};

pub use error::{Error, Result};
pub use serialize::{
  NoSlots, SlotRenderer, write_document, write_element, write_into,
};
pub use tree::{Descendants, Element, Node, NodePath};

// ─── Public API ──────────────────────────────────────────────────────────────

/// Parse an XML string and return its root element.
pub fn parse(input: &str) -> Result<Element> {
  parse::parse_document(input).map(|(_, root)| root)
}

/// One loaded source file.
#[derive(Debug, Clone)]
pub struct Document {
  pub path:   PathBuf,
  /// The file stem, e.g. `0001` for `cases/0001.xml`.
  pub id:     String,
  /// Comments and processing instructions ahead of the root (schema
  /// associations and the like).
  pub prolog: Vec<Node>,
  pub root:   Element,
}

impl Document {
  /// Read and parse the file at `path`.
  pub fn load(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_source(path, &raw)
  }

  /// Parse `input` as if it had been read from `path`.
  pub fn from_source(path: impl AsRef<Path>, input: &str) -> Result<Self> {
    let path = path.as_ref().to_path_buf();
    let (prolog, root) = parse::parse_document(input)?;
    Ok(Self {
      id: document_id(&path),
      prolog,
      root,
      path,
    })
  }

  /// File name component of the source path.
  pub fn file_name(&self) -> String {
    self
      .path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_else(|| format!("{}.xml", self.id))
  }
}

/// Derive a document id from a source path: the file name without its
/// extension.
pub fn document_id(path: &Path) -> String {
  path
    .file_stem()
    .map(|s| s.to_string_lossy().into_owned())
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn document_id_is_the_file_stem() {
    assert_eq!(document_id(Path::new("cases/303_annot_tei/0042.xml")), "0042");
    assert_eq!(document_id(Path::new("plain")), "plain");
  }

  #[test]
  fn from_source_keeps_path_and_id() {
    let doc = Document::from_source("in/0007.xml", "<TEI/>").unwrap();
    assert_eq!(doc.id, "0007");
    assert_eq!(doc.file_name(), "0007.xml");
    assert_eq!(doc.root.name, "TEI");
  }

  #[test]
  fn missing_file_reports_the_path() {
    let err = Document::load("/definitely/not/here.xml").unwrap_err();
    assert!(err.to_string().contains("/definitely/not/here.xml"));
  }
}
