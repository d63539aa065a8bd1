//! The canonical event set and the duplicate-resolution protocol.
//!
//! Every event fragment goes through [`EntityStore::resolve`]: the candidate
//! global id is reserved in the [`Registry`]; on success a new canonical
//! event is seeded, on a clash the fragment is either folded into the owner
//! of the id (when either side is marked as a copy) or rejected as a
//! [`Collision`].

use std::{collections::HashMap, fmt};

use serde::Serialize;

use crate::{
  event::{EntityKind, Event, EventFragment, LocalId},
  labels::LabelIndices,
  registry::{GlobalId, Registry},
};

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// What happened to a fragment that resolved successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
  /// A new canonical event was created.
  Created(GlobalId),
  /// The fragment was appended to an existing event.
  Merged(GlobalId),
  /// The existing event had been seeded by a copy; this primary fragment
  /// took over its fields.
  Promoted(GlobalId),
}

impl Resolution {
  pub fn global_id(&self) -> &GlobalId {
    match self {
      Self::Created(id) | Self::Merged(id) | Self::Promoted(id) => id,
    }
  }
}

/// A fatal duplicate: neither fragment claiming `global_id` carried a copy
/// marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Collision {
  pub global_id:         GlobalId,
  pub kind:              EntityKind,
  pub document_id:       String,
  pub existing_local_id: String,
  pub incoming_local_id: String,
}

impl fmt::Display for Collision {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "duplicate {} id {} in document {}: local id {:?} collides with {:?}",
      self.kind,
      self.global_id,
      self.document_id,
      self.incoming_local_id,
      self.existing_local_id
    )
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// Canonical events in creation order, indexed by global id.
#[derive(Debug, Default)]
pub struct EntityStore {
  events: Vec<Event>,
  by_id:  HashMap<GlobalId, usize>,
}

impl EntityStore {
  pub fn new() -> Self { Self::default() }

  /// Resolve one fragment against the registry and the events seen so far.
  pub fn resolve(
    &mut self,
    registry: &mut Registry,
    labels: &mut LabelIndices,
    document_id: &str,
    local_id: LocalId,
    fragment: EventFragment,
  ) -> Result<Resolution, Collision> {
    let kind = fragment.tag.kind();
    let candidate =
      Registry::allocate(kind.id_prefix(), document_id, &local_id.value);

    if registry.reserve(&candidate).is_ok() {
      let event =
        Event::seed(candidate.clone(), local_id, document_id, fragment, labels);
      self.by_id.insert(candidate.clone(), self.events.len());
      self.events.push(event);
      return Ok(Resolution::Created(candidate));
    }

    let collision = |existing: String, incoming: &LocalId| Collision {
      global_id: candidate.clone(),
      kind,
      document_id: document_id.to_string(),
      existing_local_id: existing,
      incoming_local_id: display_id(incoming),
    };

    // The id may belong to something that is not an event (a document id,
    // a person); that is never a cross-reference.
    let Some(&index) = self.by_id.get(&candidate) else {
      return Err(collision(candidate.to_string(), &local_id));
    };
    let existing = &mut self.events[index];

    match (existing.is_probable_copy(), local_id.probable_copy) {
      (false, false) => {
        Err(collision(display_id(&existing.local_id), &local_id))
      }
      (true, false) => {
        existing.promote(document_id, local_id, fragment, labels);
        Ok(Resolution::Promoted(candidate))
      }
      (_, true) => {
        existing.absorb(document_id, &local_id, fragment);
        Ok(Resolution::Merged(candidate))
      }
    }
  }

  pub fn get(&self, id: &GlobalId) -> Option<&Event> {
    self.by_id.get(id).map(|&i| &self.events[i])
  }

  /// Events in creation order.
  pub fn iter(&self) -> impl Iterator<Item = &Event> { self.events.iter() }

  pub fn of_kind(&self, kind: EntityKind) -> impl Iterator<Item = &Event> {
    self.events.iter().filter(move |e| e.kind() == kind)
  }

  pub fn len(&self) -> usize { self.events.len() }

  pub fn is_empty(&self) -> bool { self.events.is_empty() }
}

fn display_id(local_id: &LocalId) -> String {
  local_id.raw.clone().unwrap_or_else(|| local_id.value.clone())
}

// ─── Tests ───────────────────────────────────────────────────────────────────
