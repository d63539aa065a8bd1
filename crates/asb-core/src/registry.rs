//! Global identifiers and the registry that hands them out.
//!
//! A global id is `<kindPrefix>_<documentId>_<localId>`. It becomes the
//! primary key of the entity in every export, so the registry refuses to
//! issue the same id twice within one pass.

use std::{collections::HashSet, fmt};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─── GlobalId ────────────────────────────────────────────────────────────────

/// A corpus-wide unique identifier.
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct GlobalId(String);

impl GlobalId {
  pub const DELIMITER: char = '_';

  /// Wrap an already-formatted id (e.g. a document id, or one read back
  /// from an export).
  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

  pub fn as_str(&self) -> &str { &self.0 }

  /// The id in `#ref` form, as used by TEI pointers.
  pub fn as_ref_target(&self) -> String { format!("#{}", self.0) }
}

impl fmt::Display for GlobalId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for GlobalId {
  fn from(s: &str) -> Self { Self(s.to_string()) }
}

// ─── Registry ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("global id {0} is already in use")]
pub struct DuplicateIdentifier(pub GlobalId);

/// The set of global ids issued during one corpus pass.
#[derive(Debug, Default)]
pub struct Registry {
  issued: HashSet<GlobalId>,
}

impl Registry {
  pub fn new() -> Self { Self::default() }

  /// Format the candidate id for `(kind prefix, document, local id)`.
  /// Deterministic; does not reserve anything.
  pub fn allocate(
    kind_prefix: &str,
    document_id: &str,
    local_id: &str,
  ) -> GlobalId {
    GlobalId(format!(
      "{kind_prefix}{d}{document_id}{d}{local_id}",
      d = GlobalId::DELIMITER
    ))
  }

  /// Claim `candidate`. Fails, leaving the registry untouched, when the id
  /// has already been issued.
  pub fn reserve(
    &mut self,
    candidate: &GlobalId,
  ) -> Result<(), DuplicateIdentifier> {
    if self.issued.contains(candidate) {
      return Err(DuplicateIdentifier(candidate.clone()));
    }
    self.issued.insert(candidate.clone());
    Ok(())
  }

  pub fn contains(&self, id: &GlobalId) -> bool { self.issued.contains(id) }

  pub fn len(&self) -> usize { self.issued.len() }

  pub fn is_empty(&self) -> bool { self.issued.is_empty() }
}

// ─── Counter fallback ────────────────────────────────────────────────────────

/// Stand-in local ids for fragments that carry none: `0001`, `0002`, …
///
/// One counter per entity family per pass. Ids minted here are marked
/// [`IdOrigin::Counter`](crate::event::IdOrigin::Counter) in the output.
#[derive(Debug, Default)]
pub struct IdCounter {
  last: u32,
}

impl IdCounter {
  pub fn next_id(&mut self) -> String {
    self.last += 1;
    format!("{:04}", self.last)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn allocate_joins_with_underscores() {
    assert_eq!(
      Registry::allocate("trial_result", "0001", "exec1").as_str(),
      "trial_result_0001_exec1"
    );
  }

  #[test]
  fn reserve_rejects_second_claim() {
    let mut registry = Registry::new();
    let id = Registry::allocate("offence", "0001", "12");
    registry.reserve(&id).unwrap();
    assert_eq!(registry.reserve(&id), Err(DuplicateIdentifier(id.clone())));
    assert_eq!(registry.len(), 1);
    assert!(registry.contains(&id));
  }

  #[test]
  fn counter_is_zero_padded_and_monotonic() {
    let mut counter = IdCounter::default();
    assert_eq!(counter.next_id(), "0001");
    assert_eq!(counter.next_id(), "0002");
  }

  #[test]
  fn ref_target_has_hash() {
    assert_eq!(GlobalId::from("pers_0001_p1").as_ref_target(), "#pers_0001_p1");
  }
}
