//! Persons and the labels derived from the events they relate to.

use std::collections::BTreeMap;

use crate::{
  event::{EventDetails, LocalId, SourceFragment},
  extract::{DocumentMeta, PersonFragment},
  labels,
  registry::GlobalId,
  store::EntityStore,
};

/// A person as described in one document.
///
/// Persons never take part in the copy-merge protocol: each `<person>`
/// element introduces its own entity.
#[derive(Debug, Clone)]
pub struct Person {
  pub global_id:       GlobalId,
  pub local_id:        LocalId,
  pub document_id:     String,
  pub source:          SourceFragment,
  /// Role per document id.
  pub roles:           BTreeMap<String, String>,
  pub forename:        String,
  pub surname:         String,
  pub fullname:        String,
  pub sex:             String,
  pub age:             String,
  pub decade_age:      String,
  pub state_type:      String,
  pub marriage_status: String,
  pub faith:           String,
  pub occupation:      Vec<String>,
  pub birth_place:     Option<String>,
  pub thumbnail:       Option<String>,
  pub archives:        Vec<String>,
  /// Events this person is involved in, in document order. A person only
  /// references events; it never owns them.
  pub related_events:  Vec<GlobalId>,
}

impl Person {
  pub fn new(
    global_id: GlobalId,
    local_id: LocalId,
    document_id: &str,
    fragment: PersonFragment,
    meta: &DocumentMeta,
  ) -> Self {
    let age = labels::refine_age(&fragment.age_text, &fragment.decade);
    let roles = fragment
      .role
      .iter()
      .map(|role| (document_id.to_string(), role.clone()))
      .collect();
    Self {
      fullname: labels::full_name(&fragment.forename, &fragment.surname),
      source: SourceFragment {
        document_id: document_id.to_string(),
        path:        fragment.path,
        raw_id:      local_id.raw.clone(),
        element:     fragment.element,
      },
      global_id,
      local_id,
      document_id: document_id.to_string(),
      roles,
      forename: fragment.forename,
      surname: fragment.surname,
      sex: labels::person_label("sex", &fragment.sex),
      age: age.age,
      decade_age: age.decade_age,
      state_type: labels::person_label("state", &fragment.state_type),
      marriage_status: labels::person_label(
        "marriage_status",
        &fragment.marriage_status,
      ),
      faith: labels::person_label("faith", &fragment.faith),
      occupation: fragment.occupation,
      birth_place: fragment.birth_place,
      thumbnail: meta.thumbnail.clone(),
      archives: meta.archives.clone(),
      related_events: Vec::new(),
    }
  }

  /// Record an involvement. Several fragments of the same person may resolve
  /// to one event; it is listed once.
  pub fn relate(&mut self, event: GlobalId) {
    if !self.related_events.contains(&event) {
      self.related_events.push(event);
    }
  }

  pub fn derived_labels(&self, events: &EntityStore) -> DerivedLabels {
    let mut derived = DerivedLabels::default();
    for event in self.related_events.iter().filter_map(|id| events.get(id)) {
      match &event.details {
        EventDetails::Offence(offence) => {
          for t in &offence.offence_types {
            if !derived.offences.contains(&t.label) {
              derived.offences.push(t.label.clone());
            }
          }
        }
        EventDetails::Execution(s) => {
          derived
            .executions
            .extend(s.methods.iter().map(|m| m.label.clone()));
          derived
            .execution_places
            .extend(event.place_labels().into_iter().map(str::to_string));
        }
        EventDetails::Punishment(s) => {
          derived
            .punishments
            .extend(s.methods.iter().map(|m| m.label.clone()));
        }
        EventDetails::Verdict => {}
      }
    }
    derived
  }
}

/// Labels a person inherits from their related events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivedLabels {
  /// Offence type labels, each once.
  pub offences:         Vec<String>,
  pub punishments:      Vec<String>,
  pub executions:       Vec<String>,
  pub execution_places: Vec<String>,
}

#[cfg(test)]
mod tests {
  use asb_tei::{NodePath, parse};

  use super::*;
  use crate::{
    event::{EventTag, FragmentPayload, RawMethod},
    extract,
    labels::LabelIndices,
    registry::Registry,
  };

  fn person(xml: &str) -> Person {
    let el = parse(xml).unwrap();
    let fragment = extract::person_fragment(&el, NodePath::root());
    let local = LocalId::from_raw(fragment.raw_id.as_deref().unwrap_or("p"))
      .unwrap();
    Person::new(
      GlobalId::from("pers_0001_p1"),
      local,
      "0001",
      fragment,
      &DocumentMeta {
        thumbnail: Some("img.jpg".into()),
        archives: vec!["WStLA".into()],
        ..Default::default()
      },
    )
  }

  #[test]
  fn demographics_are_translated() {
    let p = person(
      r#"<person xml:id="p1" role="delinquent">
        <persName><forename>Anna</forename><surname>Huber</surname></persName>
        <sex value="f"/><age value="3"/>
        <state type="married"><desc>married</desc></state>
        <faith>catholic</faith>
      </person>"#,
    );
    assert_eq!(p.fullname, "Anna Huber");
    assert_eq!(p.sex, "weiblich");
    assert_eq!(p.age, "~30");
    assert_eq!(p.decade_age, "30–39");
    assert_eq!(p.state_type, "verheiratet");
    assert_eq!(p.marriage_status, "verheiratet");
    assert_eq!(p.faith, "katholisch");
    assert_eq!(p.roles.get("0001").map(String::as_str), Some("delinquent"));
    assert_eq!(p.thumbnail.as_deref(), Some("img.jpg"));
  }

  #[test]
  fn derived_labels_follow_related_events() {
    let mut registry = Registry::new();
    let mut labels = LabelIndices::default();
    let mut store = EntityStore::new();
    let mut p = person(r#"<person xml:id="p1"/>"#);

    let fragments = [
      (EventTag::Offence, "o1", FragmentPayload::Offence {
        offence_types: vec!["Raub".into(), "Raub".into()],
        tools:         vec![],
      }),
      (EventTag::Execution, "e1", FragmentPayload::Sanction {
        methods: vec![RawMethod {
          order: None,
          text:  "sword".into(),
        }],
      }),
    ];
    for (tag, id, payload) in fragments {
      let fragment = crate::event::EventFragment {
        tag,
        raw_ids: vec![id.into()],
        dates: vec![],
        places: vec!["Wien".into()],
        description: vec![],
        payload,
        element: asb_tei::Element::new("event"),
        path: NodePath::root(),
      };
      let local = fragment.local_id().unwrap();
      let res = store
        .resolve(&mut registry, &mut labels, "0001", local, fragment)
        .unwrap();
      p.relate(res.global_id().clone());
      p.relate(res.global_id().clone());
    }

    assert_eq!(p.related_events.len(), 2);
    let derived = p.derived_labels(&store);
    assert_eq!(derived.offences, vec!["Raub"]);
    assert_eq!(derived.executions, vec!["Schwert"]);
    assert_eq!(derived.execution_places, vec!["Wien"]);
    assert!(derived.punishments.is_empty());
  }
}
