//! Events: offences, punishments, executions and verdicts.
//!
//! A source document may describe the same event several times (once per
//! person involved). Each description is an [`EventFragment`]; the canonical
//! [`Event`] is seeded from one fragment and keeps every later fragment that
//! was judged to be the same event.

use asb_tei::{Element, NodePath};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{
  labels::{self, LabelIndex, LabelIndices},
  registry::GlobalId,
};

// ─── Kinds ───────────────────────────────────────────────────────────────────

/// The kind of a canonical entity. Decides the global id prefix.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
  Offence,
  Punishment,
  Execution,
  Verdict,
  Person,
}

impl EntityKind {
  pub fn id_prefix(&self) -> &'static str {
    match self {
      Self::Offence => "offence",
      Self::Punishment | Self::Execution | Self::Verdict => "trial_result",
      Self::Person => "pers",
    }
  }
}

/// The raw `@type` of an `<event>` element.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum EventTag {
  Offence,
  OffenceAttempted,
  OffenceSuspected,
  OffenceAided,
  Punishment,
  Execution,
  Verdict,
}

impl EventTag {
  pub fn kind(&self) -> EntityKind {
    match self {
      Self::Offence
      | Self::OffenceAttempted
      | Self::OffenceSuspected
      | Self::OffenceAided => EntityKind::Offence,
      Self::Punishment => EntityKind::Punishment,
      Self::Execution => EntityKind::Execution,
      Self::Verdict => EntityKind::Verdict,
    }
  }
}

// ─── Local identity ──────────────────────────────────────────────────────────

/// Where a local id came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdOrigin {
  /// Taken from the fragment's `xml:id` or `ref`.
  Explicit,
  /// The fragment had no id; a per-pass counter value stands in.
  Counter,
}

/// A fragment's identifier within its document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalId {
  /// Normalized id: surrounding spaces and `#` copy markers stripped.
  pub value:         String,
  /// The id exactly as written, if there was one.
  pub raw:           Option<String>,
  /// The raw id carried a `#` copy marker.
  pub probable_copy: bool,
  pub origin:        IdOrigin,
}

impl LocalId {
  /// Interpret a raw id. Returns `None` when nothing is left after
  /// stripping markers.
  pub fn from_raw(raw: &str) -> Option<Self> {
    let value = raw.trim_matches(|c| c == ' ' || c == '#');
    if value.is_empty() {
      return None;
    }
    Some(Self {
      value:         value.to_string(),
      raw:           Some(raw.to_string()),
      probable_copy: raw.contains('#'),
      origin:        IdOrigin::Explicit,
    })
  }

  pub fn from_counter(value: String) -> Self {
    Self {
      value,
      raw: None,
      probable_copy: false,
      origin: IdOrigin::Counter,
    }
  }
}

// ─── Fragments ───────────────────────────────────────────────────────────────

/// A raw method entry of a punishment or execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMethod {
  /// Explicit `@n` ordering, if given.
  pub order: Option<u32>,
  pub text:  String,
}

/// Kind-specific raw fields of a fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum FragmentPayload {
  Offence {
    offence_types: Vec<String>,
    tools:         Vec<String>,
  },
  Sanction {
    methods: Vec<RawMethod>,
  },
  Verdict,
}

/// One description of an event as extracted from a document.
#[derive(Debug, Clone, PartialEq)]
pub struct EventFragment {
  pub tag:         EventTag,
  pub raw_ids:     Vec<String>,
  pub dates:       Vec<String>,
  pub places:      Vec<String>,
  pub description: Vec<String>,
  pub payload:     FragmentPayload,
  /// Snapshot of the `<event>` element.
  pub element:     Element,
  /// Position of the element in its document tree.
  pub path:        NodePath,
}

impl EventFragment {
  /// The first raw id, interpreted. `None` means the caller has to supply a
  /// counter id.
  pub fn local_id(&self) -> Option<LocalId> {
    self.raw_ids.first().and_then(|raw| LocalId::from_raw(raw))
  }
}

/// Provenance of one fragment folded into a canonical entity.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFragment {
  pub document_id: String,
  pub path:        NodePath,
  pub raw_id:      Option<String>,
  pub element:     Element,
}

// ─── Canonical event ─────────────────────────────────────────────────────────

/// An indexed label with its position in the fragment's list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedLabel {
  pub id:    String,
  pub order: usize,
  pub label: String,
}

/// How the annotation qualifies an offence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffenceStatus {
  pub proven_by_persecution: bool,
  /// `None` when the offence is only suspected.
  pub completed:             Option<bool>,
  pub aided:                 bool,
}

impl OffenceStatus {
  pub const PROVEN: Self = Self {
    proven_by_persecution: true,
    completed:             Some(true),
    aided:                 false,
  };

  pub fn for_tag(tag: EventTag) -> Option<Self> {
    let (proven_by_persecution, completed, aided) = match tag {
      EventTag::Offence => (true, Some(true), false),
      EventTag::OffenceAttempted => (true, Some(false), false),
      EventTag::OffenceSuspected => (false, None, false),
      EventTag::OffenceAided => (true, Some(true), true),
      _ => return None,
    };
    Some(Self {
      proven_by_persecution,
      completed,
      aided,
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Method {
  pub id:          String,
  pub order:       u32,
  pub label:       String,
  pub label_short: String,
  pub label_ts:    String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OffenceDetails {
  pub status:        OffenceStatus,
  pub offence_types: Vec<IndexedLabel>,
  pub tools:         Vec<IndexedLabel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SanctionDetails {
  pub methods:     Vec<Method>,
  pub carried_out: bool,
}

/// Kind-specific fields of a canonical event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventDetails {
  Offence(OffenceDetails),
  Punishment(SanctionDetails),
  Execution(SanctionDetails),
  Verdict,
}

/// A canonical event.
#[derive(Debug, Clone)]
pub struct Event {
  pub global_id:   GlobalId,
  pub tag:         EventTag,
  pub local_id:    LocalId,
  /// The document that first introduced the event.
  pub document_id: String,
  pub dates:       Vec<String>,
  pub places:      Vec<IndexedLabel>,
  pub description: String,
  pub details:     EventDetails,
  /// Every fragment describing this event, in the order they were met.
  /// Never empty.
  pub fragments:   Vec<SourceFragment>,
  /// Index into `fragments` of the fragment the fields were taken from.
  pub canonical:   usize,
}

/// Fields whose emptiness is normal for every event kind.
pub const REGULARLY_EMPTY: &[&str] =
  &["dates", "places", "description", "tools", "source_id"];

impl Event {
  /// Build a canonical event from its first fragment.
  pub fn seed(
    global_id: GlobalId,
    local_id: LocalId,
    document_id: &str,
    fragment: EventFragment,
    labels: &mut LabelIndices,
  ) -> Self {
    let source = SourceFragment {
      document_id: document_id.to_string(),
      path:        fragment.path.clone(),
      raw_id:      local_id.raw.clone(),
      element:     fragment.element.clone(),
    };
    let mut event = Self {
      global_id,
      tag: fragment.tag,
      local_id,
      document_id: document_id.to_string(),
      dates: Vec::new(),
      places: Vec::new(),
      description: String::new(),
      details: EventDetails::Verdict,
      fragments: vec![source],
      canonical: 0,
    };
    event.fill_from(fragment, labels);
    event
  }

  /// Take a further fragment into this event without touching its fields.
  pub fn absorb(
    &mut self,
    document_id: &str,
    local_id: &LocalId,
    fragment: EventFragment,
  ) {
    self.fragments.push(SourceFragment {
      document_id: document_id.to_string(),
      path:        fragment.path,
      raw_id:      local_id.raw.clone(),
      element:     fragment.element,
    });
  }

  /// Replace a copy-seeded event's fields with those of a primary fragment.
  /// The fragment is appended and becomes the canonical one.
  pub fn promote(
    &mut self,
    document_id: &str,
    local_id: LocalId,
    fragment: EventFragment,
    labels: &mut LabelIndices,
  ) {
    self.fragments.push(SourceFragment {
      document_id: document_id.to_string(),
      path:        fragment.path.clone(),
      raw_id:      local_id.raw.clone(),
      element:     fragment.element.clone(),
    });
    self.canonical = self.fragments.len() - 1;
    self.tag = fragment.tag;
    self.local_id = local_id;
    self.fill_from(fragment, labels);
  }

  fn fill_from(&mut self, fragment: EventFragment, labels: &mut LabelIndices) {
    self.dates = fragment.dates;
    self.places = fragment
      .places
      .iter()
      .map(|p| p.trim())
      .filter(|p| !p.is_empty())
      .enumerate()
      .map(|(i, label)| IndexedLabel {
        id:    labels.places.id_for(label),
        order: i + 1,
        label: label.to_string(),
      })
      .collect();
    self.description = fragment
      .description
      .iter()
      .map(|d| labels::collapse_spaces(d))
      .collect();
    self.details = build_details(fragment.tag, fragment.payload, labels);
  }

  pub fn kind(&self) -> EntityKind { self.tag.kind() }

  pub fn is_probable_copy(&self) -> bool { self.local_id.probable_copy }

  pub fn canonical_fragment(&self) -> &SourceFragment {
    &self.fragments[self.canonical]
  }

  pub fn place_labels(&self) -> Vec<&str> {
    self.places.iter().map(|p| p.label.as_str()).collect()
  }

  /// Methods of a punishment or execution; empty for other kinds.
  pub fn methods(&self) -> &[Method] {
    match &self.details {
      EventDetails::Punishment(s) | EventDetails::Execution(s) => &s.methods,
      _ => &[],
    }
  }

  /// Every checked field with whether it is empty.
  pub fn field_presence(&self) -> Vec<(&'static str, bool)> {
    let mut fields = vec![
      ("dates", self.dates.iter().all(|d| d.is_empty())),
      ("places", self.places.is_empty()),
      ("description", self.description.trim().is_empty()),
      ("source_id", self.local_id.raw.is_none()),
    ];
    match &self.details {
      EventDetails::Offence(o) => {
        fields.push(("offence_types", o.offence_types.is_empty()));
        fields.push(("tools", o.tools.is_empty()));
      }
      EventDetails::Punishment(s) | EventDetails::Execution(s) => {
        fields.push(("methods", s.methods.is_empty()));
      }
      EventDetails::Verdict => {}
    }
    fields
  }

  /// Names of empty fields that are not on the [`REGULARLY_EMPTY`] list.
  pub fn unexpected_empty_fields(&self) -> Vec<&'static str> {
    self
      .field_presence()
      .into_iter()
      .filter(|(name, empty)| *empty && !REGULARLY_EMPTY.contains(name))
      .map(|(name, _)| name)
      .collect()
  }
}

fn build_details(
  tag: EventTag,
  payload: FragmentPayload,
  labels: &mut LabelIndices,
) -> EventDetails {
  match (tag.kind(), payload) {
    (
      EntityKind::Offence,
      FragmentPayload::Offence {
        offence_types,
        tools,
      },
    ) => EventDetails::Offence(OffenceDetails {
      status:        OffenceStatus::for_tag(tag).unwrap_or(OffenceStatus::PROVEN),
      offence_types: indexed(&offence_types, &mut labels.offence_types),
      tools:         indexed(&tools, &mut labels.tools),
    }),
    (EntityKind::Punishment, FragmentPayload::Sanction { methods }) => {
      EventDetails::Punishment(sanction(
        &methods,
        &mut labels.punishment_methods,
      ))
    }
    (EntityKind::Execution, FragmentPayload::Sanction { methods }) => {
      EventDetails::Execution(sanction(&methods, &mut labels.execution_methods))
    }
    (EntityKind::Punishment, _) => EventDetails::Punishment(SanctionDetails {
      methods:     Vec::new(),
      carried_out: false,
    }),
    (EntityKind::Execution, _) => EventDetails::Execution(SanctionDetails {
      methods:     Vec::new(),
      carried_out: false,
    }),
    (EntityKind::Offence, _) => EventDetails::Offence(OffenceDetails {
      status:        OffenceStatus::for_tag(tag).unwrap_or(OffenceStatus::PROVEN),
      offence_types: Vec::new(),
      tools:         Vec::new(),
    }),
    (EntityKind::Verdict | EntityKind::Person, _) => EventDetails::Verdict,
  }
}

fn indexed(
  raw: &[String],
  index: &mut LabelIndex,
) -> Vec<IndexedLabel> {
  raw
    .iter()
    .map(|s| s.trim())
    .filter(|s| !s.is_empty())
    .enumerate()
    .map(|(i, label)| IndexedLabel {
      id:    index.id_for(label),
      order: i + 1,
      label: label.to_string(),
    })
    .collect()
}

fn sanction(
  raw: &[RawMethod],
  index: &mut LabelIndex,
) -> SanctionDetails {
  let methods: Vec<Method> = raw
    .iter()
    .enumerate()
    .map(|(i, m)| {
      let text = m.text.trim();
      let rendered = labels::method_labels(text);
      Method {
        id:          index.id_for(text),
        order:       m.order.unwrap_or(i as u32 + 1),
        label:       rendered.label,
        label_short: rendered.label_short,
        label_ts:    rendered.label_ts,
      }
    })
    .collect();
  SanctionDetails {
    carried_out: !methods.is_empty(),
    methods,
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use super::*;

  fn fragment(tag: EventTag, payload: FragmentPayload) -> EventFragment {
    EventFragment {
      tag,
      raw_ids: vec!["12".into()],
      dates: vec!["1750-03-02".into()],
      places: vec![" Wien ".into(), "".into()],
      description: vec!["Raub  an   einem".into(), " Händler".into()],
      payload,
      element: Element::new("event"),
      path: NodePath::root().child(0),
    }
  }

  #[test]
  fn tags_parse_from_annotation_values() {
    assert_eq!(
      EventTag::from_str("offenceAttempted").unwrap(),
      EventTag::OffenceAttempted
    );
    assert_eq!(EventTag::from_str("verdict").unwrap(), EventTag::Verdict);
    assert!(EventTag::from_str("birth").is_err());
    assert_eq!(EventTag::OffenceAided.as_ref(), "offenceAided");
  }

  #[test]
  fn trial_results_share_a_prefix() {
    assert_eq!(EventTag::Execution.kind().id_prefix(), "trial_result");
    assert_eq!(EventTag::Verdict.kind().id_prefix(), "trial_result");
    assert_eq!(EventTag::OffenceSuspected.kind().id_prefix(), "offence");
  }

  #[test]
  fn local_id_strips_copy_markers() {
    let primary = LocalId::from_raw("12").unwrap();
    assert!(!primary.probable_copy);
    let copy = LocalId::from_raw(" #12").unwrap();
    assert_eq!(copy.value, "12");
    assert!(copy.probable_copy);
    assert!(LocalId::from_raw("#").is_none());
  }

  #[test]
  fn offence_status_follows_tag() {
    let suspected = OffenceStatus::for_tag(EventTag::OffenceSuspected).unwrap();
    assert!(!suspected.proven_by_persecution);
    assert_eq!(suspected.completed, None);
    let aided = OffenceStatus::for_tag(EventTag::OffenceAided).unwrap();
    assert!(aided.aided && aided.completed == Some(true));
    assert!(OffenceStatus::for_tag(EventTag::Verdict).is_none());
  }

  #[test]
  fn seed_indexes_places_and_types() {
    let mut labels = LabelIndices::default();
    let frag = fragment(EventTag::Offence, FragmentPayload::Offence {
      offence_types: vec!["Raub".into(), "Mord".into()],
      tools:         vec!["Messer".into()],
    });
    let local = frag.local_id().unwrap();
    let event = Event::seed(
      GlobalId::from("offence_0001_12"),
      local,
      "0001",
      frag,
      &mut labels,
    );
    assert_eq!(event.place_labels(), vec!["Wien"]);
    assert_eq!(event.places[0].id, "place_0001");
    assert_eq!(event.description, "Raub an einem Händler");
    let EventDetails::Offence(details) = &event.details else {
      panic!("not an offence")
    };
    assert_eq!(details.offence_types[1].id, "offence_type_002");
    assert_eq!(details.offence_types[1].order, 2);
    assert_eq!(details.tools[0].label, "Messer");
    assert!(event.unexpected_empty_fields().is_empty());
  }

  #[test]
  fn sanction_methods_use_n_or_position() {
    let mut labels = LabelIndices::default();
    let frag = fragment(EventTag::Execution, FragmentPayload::Sanction {
      methods: vec![
        RawMethod {
          order: Some(3),
          text:  "sword".into(),
        },
        RawMethod {
          order: None,
          text:  "wheel from above".into(),
        },
      ],
    });
    let local = frag.local_id().unwrap();
    let event = Event::seed(
      GlobalId::from("trial_result_0001_12"),
      local,
      "0001",
      frag,
      &mut labels,
    );
    let methods = event.methods();
    assert_eq!(methods[0].order, 3);
    assert_eq!(methods[0].label, "Schwert");
    assert_eq!(methods[1].order, 2);
    assert_eq!(methods[1].label_ts, "Rad");
    assert_eq!(labels.execution_methods.len(), 2);
    assert!(labels.punishment_methods.is_empty());
  }

  #[test]
  fn empty_methods_are_reported() {
    let mut labels = LabelIndices::default();
    let frag = fragment(EventTag::Punishment, FragmentPayload::Sanction {
      methods: vec![],
    });
    let local = frag.local_id().unwrap();
    let event = Event::seed(
      GlobalId::from("trial_result_0001_12"),
      local,
      "0001",
      frag,
      &mut labels,
    );
    assert_eq!(event.unexpected_empty_fields(), vec!["methods"]);
  }
}
