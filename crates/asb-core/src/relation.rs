//! Relation edges: extraction, staging by endpoint, rewriting to global ids.
//!
//! Edges are pulled out of a document before any event is resolved, because
//! they may point forward to events further down. The edge itself lives in a
//! pass-wide [`RelationSet`]; the document tree only keeps [`Node::Slot`]
//! placeholders, under each event the edge points at or else where the
//! relation stood, so writers always render the edge in its current state.

use std::collections::BTreeMap;

use asb_tei::{Element, Node, NodePath};
use serde::Serialize;

use crate::registry::GlobalId;

/// Endpoint token some documents use for "the execution of this person"
/// instead of an explicit id.
pub const EXECUTION_TOKEN: &str = "execution";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct EdgeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
  Active,
  Passive,
}

impl Side {
  fn attribute(&self) -> &'static str {
    match self {
      Self::Active => "active",
      Self::Passive => "passive",
    }
  }
}

/// One end of an edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
  /// Still the reference as written in the document (may be empty when the
  /// attribute is missing).
  Unresolved(String),
  Resolved { raw: String, global_id: GlobalId },
}

impl Endpoint {
  /// The local id this endpoint is waiting for. `None` once resolved or
  /// when there is nothing to wait for.
  pub fn pending_key(&self) -> Option<&str> {
    match self {
      Self::Unresolved(raw) => {
        let key = local_key(raw);
        (!key.is_empty()).then_some(key)
      }
      Self::Resolved { .. } => None,
    }
  }

  /// The value written into the `active`/`passive` attribute.
  pub fn target(&self) -> String {
    match self {
      Self::Unresolved(raw) => raw.clone(),
      Self::Resolved { global_id, .. } => global_id.as_ref_target(),
    }
  }

  pub fn is_resolved(&self) -> bool { matches!(self, Self::Resolved { .. }) }
}

/// Normalize a raw endpoint reference to the local id it names.
pub fn local_key(raw: &str) -> &str { raw.trim().trim_start_matches('#') }

#[derive(Debug, Clone)]
pub struct RelationEdge {
  pub document_id: String,
  pub active:      Endpoint,
  pub passive:     Endpoint,
  /// The `<relation>` element as read.
  pub payload:     Element,
}

impl RelationEdge {
  fn endpoint_mut(&mut self, side: Side) -> &mut Endpoint {
    match side {
      Side::Active => &mut self.active,
      Side::Passive => &mut self.passive,
    }
  }

  pub fn endpoint(&self, side: Side) -> &Endpoint {
    match side {
      Side::Active => &self.active,
      Side::Passive => &self.passive,
    }
  }

  /// Local ids this edge still waits for, active side first.
  pub fn pending_keys(&self) -> Vec<&str> {
    let mut keys = Vec::new();
    for key in [self.active.pending_key(), self.passive.pending_key()]
      .into_iter()
      .flatten()
    {
      if !keys.contains(&key) {
        keys.push(key);
      }
    }
    keys
  }

  /// The payload with both endpoint attributes set to their current
  /// targets.
  pub fn render(&self) -> Element {
    let mut el = self.payload.clone();
    for side in [Side::Active, Side::Passive] {
      let target = self.endpoint(side).target();
      if !target.is_empty() {
        el.set_attr(side.attribute(), target);
      }
    }
    el
  }
}

/// Every edge of the pass, addressed by [`EdgeId`].
#[derive(Debug, Default)]
pub struct RelationSet {
  edges: Vec<RelationEdge>,
}

impl RelationSet {
  pub fn new() -> Self { Self::default() }

  fn push(&mut self, edge: RelationEdge) -> EdgeId {
    self.edges.push(edge);
    EdgeId(self.edges.len() - 1)
  }

  pub fn get(&self, id: EdgeId) -> Option<&RelationEdge> {
    self.edges.get(id.0)
  }

  pub fn iter(&self) -> impl Iterator<Item = (EdgeId, &RelationEdge)> {
    self.edges.iter().enumerate().map(|(i, e)| (EdgeId(i), e))
  }

  /// Render the edge behind a tree slot.
  pub fn render(&self, slot: usize) -> Option<Element> {
    self.get(EdgeId(slot)).map(RelationEdge::render)
  }

  pub fn len(&self) -> usize { self.edges.len() }

  pub fn is_empty(&self) -> bool { self.edges.is_empty() }
}

/// An endpoint that no event in its document ever resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DanglingReference {
  pub document_id: String,
  pub edge:        EdgeId,
  pub side:        Side,
  pub reference:   String,
}

/// The edges of one document, indexed by the local ids they mention.
#[derive(Debug, Default)]
pub struct StagedRelations {
  document_id: String,
  edges:       Vec<EdgeId>,
  mentions:    BTreeMap<String, Vec<EdgeId>>,
}

/// Register every `<relation>` of `root` in `set` and index it by both
/// endpoint keys.
///
/// Each relation is replaced in the tree by a slot. An edge naming an event
/// of this tree (by `xml:id`, or the execution by [`EXECUTION_TOKEN`]) is
/// moved under each such event instead; every other edge keeps its slot
/// where the relation stood.
pub fn stage(
  document_id: &str,
  root: &mut Element,
  set: &mut RelationSet,
) -> StagedRelations {
  let mut staged = StagedRelations {
    document_id: document_id.to_string(),
    ..Default::default()
  };

  root.replace_all("relation", &mut |payload| {
    let endpoint = |name: &str| {
      Endpoint::Unresolved(payload.attr(name).unwrap_or_default().to_string())
    };
    let edge = RelationEdge {
      document_id: document_id.to_string(),
      active:      endpoint("active"),
      passive:     endpoint("passive"),
      payload:     payload.clone(),
    };
    let keys: Vec<String> =
      edge.pending_keys().into_iter().map(str::to_string).collect();
    let id = set.push(edge);
    staged.edges.push(id);
    for key in &keys {
      let ids = staged.mentions.entry(key.clone()).or_default();
      if !ids.contains(&id) {
        ids.push(id);
      }
    }
    tracing::trace!(document_id, edge = id.0, ?keys, "staged relation");
    Node::Slot(id.0)
  });

  let moved: Vec<EdgeId> = staged
    .edges
    .iter()
    .copied()
    .filter(|&id| {
      set.get(id).is_some_and(|edge| {
        edge
          .pending_keys()
          .into_iter()
          .any(|key| attach_point(root, key).is_some())
      })
    })
    .collect();
  root.retain_slots(&mut |slot| !moved.contains(&EdgeId(slot)));

  for id in moved {
    let Some(edge) = set.get(id) else { continue };
    let mut points = Vec::new();
    for key in edge.pending_keys() {
      if let Some(path) = attach_point(root, key) {
        if !points.contains(&path) {
          points.push(path);
        }
      }
    }
    for path in points {
      if let Some(event) = root.at_path_mut(&path) {
        event.push(Node::Slot(id.0));
      }
    }
  }

  staged
}

fn attach_point(root: &Element, key: &str) -> Option<NodePath> {
  root
    .find_paths("event")
    .into_iter()
    .find(|(_, ev)| {
      ev.attr("xml:id").map(str::trim) == Some(key)
        || (key == EXECUTION_TOKEN && ev.attr("type") == Some(EXECUTION_TOKEN))
    })
    .map(|(path, _)| path)
}

impl StagedRelations {
  pub fn edges(&self) -> &[EdgeId] { &self.edges }

  /// Edges mentioning `local_id` on either side.
  pub fn mentions(&self, local_id: &str) -> &[EdgeId] {
    self.mentions.get(local_id).map(Vec::as_slice).unwrap_or_default()
  }

  /// Point every still-unresolved endpoint naming `local_id` at
  /// `global_id`. Returns how many endpoints changed; a second call with the
  /// same arguments changes nothing.
  pub fn rewrite(
    &self,
    set: &mut RelationSet,
    local_id: &str,
    global_id: &GlobalId,
  ) -> usize {
    let mut rewritten = 0;
    for id in self.mentions(local_id) {
      let Some(edge) = set.edges.get_mut(id.0) else {
        continue;
      };
      for side in [Side::Active, Side::Passive] {
        let endpoint = edge.endpoint_mut(side);
        if endpoint.pending_key() != Some(local_id) {
          continue;
        }
        *endpoint = Endpoint::Resolved {
          raw:       endpoint.target(),
          global_id: global_id.clone(),
        };
        rewritten += 1;
      }
    }
    rewritten
  }

  /// Endpoints of this document's edges that are still unresolved.
  pub fn dangling(&self, set: &RelationSet) -> Vec<DanglingReference> {
    let mut out = Vec::new();
    for &id in &self.edges {
      let Some(edge) = set.get(id) else { continue };
      for side in [Side::Active, Side::Passive] {
        if let Endpoint::Unresolved(raw) = edge.endpoint(side) {
          if !raw.trim().is_empty() {
            out.push(DanglingReference {
              document_id: self.document_id.clone(),
              edge: id,
              side,
              reference: raw.clone(),
            });
          }
        }
      }
    }
    out
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use asb_tei::{NoSlots, parse, write_element};

  use super::*;

  const DOC: &str = r##"<TEI><text><body>
    <listPerson><person xml:id="p1">
      <event type="execution" xml:id="exec1"/>
      <event type="offence"/>
    </person></listPerson>
    <listRelation>
      <relation name="punishes" active="#exec1" passive="#0001"/>
      <relation name="mentions" active="#execution" passive="#ghost"/>
    </listRelation>
  </body></text></TEI>"##;

  fn staged() -> (Element, RelationSet, StagedRelations) {
    let mut root = parse(DOC).unwrap();
    let mut set = RelationSet::new();
    let staged = stage("0001", &mut root, &mut set);
    (root, set, staged)
  }

  #[test]
  fn staging_removes_relations_and_indexes_both_ends() {
    let (root, set, staged) = staged();
    assert!(root.find("relation").is_none());
    assert_eq!(set.len(), 2);
    assert_eq!(staged.mentions("exec1"), &[EdgeId(0)]);
    assert_eq!(staged.mentions("0001"), &[EdgeId(0)]);
    assert_eq!(staged.mentions("execution"), &[EdgeId(1)]);
    assert!(staged.mentions("nothing").is_empty());
  }

  #[test]
  fn edges_are_reattached_under_their_events() {
    let (root, _, _) = staged();
    let exec = root
      .find_all("event")
      .find(|e| e.attr("xml:id") == Some("exec1"))
      .unwrap();
    // Both edges point at exec1: the first by id, the second by token.
    assert_eq!(exec.slots(), vec![0, 1]);
  }

  #[test]
  fn rewrite_is_idempotent_and_side_preserving() {
    let (_, mut set, staged) = staged();
    let exec = GlobalId::from("trial_result_0001_exec1");
    let offence = GlobalId::from("offence_0001_0001");

    assert_eq!(staged.rewrite(&mut set, "exec1", &exec), 1);
    assert_eq!(staged.rewrite(&mut set, "0001", &offence), 1);
    assert_eq!(staged.rewrite(&mut set, "exec1", &exec), 0);

    let edge = set.get(EdgeId(0)).unwrap();
    assert_eq!(edge.active.target(), "#trial_result_0001_exec1");
    assert_eq!(edge.passive.target(), "#offence_0001_0001");
  }

  #[test]
  fn rendering_uses_current_endpoints() {
    let (_, mut set, staged) = staged();
    let exec = GlobalId::from("trial_result_0001_exec1");
    staged.rewrite(&mut set, "exec1", &exec);
    let rendered =
      write_element(&set.render(0).unwrap(), &mut NoSlots).unwrap();
    assert_eq!(
      rendered,
      r##"<relation name="punishes" active="#trial_result_0001_exec1" passive="#0001"/>"##
    );
  }

  #[test]
  fn unresolved_endpoints_are_dangling() {
    let (_, mut set, staged) = staged();
    let exec = GlobalId::from("trial_result_0001_exec1");
    staged.rewrite(&mut set, "execution", &exec);
    let dangling = staged.dangling(&set);
    let refs: Vec<_> = dangling.iter().map(|d| d.reference.as_str()).collect();
    assert_eq!(refs, vec!["#exec1", "#0001", "#ghost"]);
    assert_eq!(dangling[2].side, Side::Passive);
    assert_eq!(dangling[2].edge, EdgeId(1));
  }

  #[test]
  fn relation_without_endpoints_is_kept_but_not_staged() {
    let mut root = parse(r#"<TEI><relation name="x"/></TEI>"#).unwrap();
    let mut set = RelationSet::new();
    let staged = stage("0002", &mut root, &mut set);
    assert_eq!(set.len(), 1);
    assert_eq!(staged.edges(), &[EdgeId(0)]);
    assert!(staged.dangling(&set).is_empty());
    assert_eq!(root.slots(), vec![0]);
  }

  #[test]
  fn edges_without_a_named_event_stay_where_they_stood() {
    let mut root = parse(
      r##"<TEI><listPerson><person xml:id="p1">
        <event type="offence"/>
      </person></listPerson>
      <listRelation><relation active="#0001" passive="#ghost"/></listRelation>
    </TEI>"##,
    )
    .unwrap();
    let mut set = RelationSet::new();
    stage("0003", &mut root, &mut set);

    assert!(root.find("event").unwrap().slots().is_empty());
    assert_eq!(root.find("listRelation").unwrap().slots(), vec![0]);
    let written = write_element(&root, &mut |slot: usize| set.render(slot))
      .unwrap();
    assert!(written.contains(
      r##"<listRelation><relation active="#0001" passive="#ghost"/></listRelation>"##
    ));
  }

  #[test]
  fn moved_edges_leave_no_slot_behind() {
    let (root, _, _) = staged();
    assert!(root.find("listRelation").unwrap().slots().is_empty());
  }
}
