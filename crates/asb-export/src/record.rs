//! Output records: the shapes written to the JSON files.

use std::collections::BTreeMap;

use asb_core::{
  Corpus,
  document::{self, DocumentRecord},
  event::{Event, EventDetails, EventTag, IdOrigin, IndexedLabel},
  labels::UNKNOWN,
  person::Person,
  relation::{EdgeId, RelationEdge, RelationSet},
};
use asb_tei::{Element, NoSlots, write_element};
use serde::Serialize;

use crate::error::Result;

/// Placeholder for a person with no punishment or execution.
pub const NONE_LABEL: &str = "Keine";

#[derive(Debug, Clone, Serialize)]
pub struct FragmentRecord {
  pub document_id: String,
  pub path:        String,
  pub raw_id:      Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventRecord {
  pub id:            String,
  #[serde(rename = "type")]
  pub tag:           EventTag,
  pub local_id:      String,
  pub id_origin:     IdOrigin,
  pub probable_copy: bool,
  pub date:          Vec<String>,
  pub place:         Vec<IndexedLabel>,
  pub description:   String,
  pub file:          String,
  pub fragments:     Vec<FragmentRecord>,
  /// The canonical fragment as XML, relations included.
  pub xml:           String,
  /// Contributes `kind` and the kind-specific fields.
  #[serde(flatten)]
  pub details:       EventDetails,
}

impl EventRecord {
  pub fn new(event: &Event, relations: &RelationSet) -> Result<Self> {
    let mut render = |slot: usize| relations.render(slot);
    let xml = write_element(&canonical_element(event), &mut render)?;
    Ok(Self {
      id: event.global_id.to_string(),
      tag: event.tag,
      local_id: event.local_id.value.clone(),
      id_origin: event.local_id.origin,
      probable_copy: event.is_probable_copy(),
      date: event.dates.clone(),
      place: event.places.clone(),
      description: event.description.clone(),
      file: event.document_id.clone(),
      fragments: event
        .fragments
        .iter()
        .map(|f| FragmentRecord {
          document_id: f.document_id.clone(),
          path:        f.path.to_string(),
          raw_id:      f.raw_id.clone(),
        })
        .collect(),
      xml,
      details: event.details.clone(),
    })
  }
}

/// The canonical fragment's element, carrying the event's global id.
pub fn canonical_element(event: &Event) -> Element {
  let mut el = event.canonical_fragment().element.clone();
  el.set_attr("xml:id", event.global_id.as_str());
  el
}

#[derive(Debug, Clone, Serialize)]
pub struct PersonRecord {
  pub id:               String,
  pub sorter:           usize,
  pub forename:         String,
  pub surname:          String,
  pub fullname:         String,
  pub birth_place:      Option<String>,
  pub sex:              String,
  pub age:              String,
  pub decade_age:       String,
  #[serde(rename = "type")]
  pub state_type:       String,
  pub marriage_status:  String,
  pub faith:            String,
  pub occupation:       Vec<String>,
  pub roles:            BTreeMap<String, String>,
  pub file_identifier:  String,
  pub related_events:   Vec<String>,
  pub offences:         Vec<String>,
  pub punishments:      Vec<String>,
  pub execution:        Vec<String>,
  pub execution_places: Vec<String>,
  pub thumbnail:        Option<String>,
  pub archives:         Vec<String>,
}

impl PersonRecord {
  pub fn new(person: &Person, sorter: usize, corpus: &Corpus) -> Self {
    let derived = person.derived_labels(&corpus.events);
    Self {
      id: person.global_id.to_string(),
      sorter,
      forename: person.forename.clone(),
      surname: person.surname.clone(),
      fullname: person.fullname.clone(),
      birth_place: person.birth_place.clone(),
      sex: person.sex.clone(),
      age: person.age.clone(),
      decade_age: person.decade_age.clone(),
      state_type: person.state_type.clone(),
      marriage_status: person.marriage_status.clone(),
      faith: person.faith.clone(),
      occupation: person.occupation.clone(),
      roles: person.roles.clone(),
      file_identifier: person.document_id.clone(),
      related_events: person
        .related_events
        .iter()
        .map(ToString::to_string)
        .collect(),
      offences: derived.offences,
      punishments: or_none(derived.punishments),
      execution: or_none(derived.executions),
      execution_places: derived.execution_places,
      thumbnail: person.thumbnail.clone(),
      archives: person.archives.clone(),
    }
  }
}

fn or_none(labels: Vec<String>) -> Vec<String> {
  if labels.is_empty() {
    vec![NONE_LABEL.to_string()]
  } else {
    labels
  }
}

/// Persons ordered by surname, then forename, paired with their 1-based
/// sorter.
pub fn sorted_persons(persons: &[Person]) -> Vec<(usize, &Person)> {
  let mut sorted: Vec<&Person> = persons.iter().collect();
  sorted.sort_by(|a, b| {
    (&a.surname, &a.forename, &a.global_id)
      .cmp(&(&b.surname, &b.forename, &b.global_id))
  });
  sorted
    .into_iter()
    .enumerate()
    .map(|(i, p)| (i + 1, p))
    .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentEntry {
  pub id:           String,
  pub file_name:    String,
  pub title:        String,
  pub fulltext:     String,
  pub archives:     Vec<String>,
  pub print_dates:  Vec<String>,
  pub publisher:    String,
  pub pub_place:    String,
  pub thumbnail:    Option<String>,
  pub persons:      Vec<String>,
  pub events:       Vec<String>,
  pub sorting_date: u64,
  pub label_year:   u32,
}

impl DocumentEntry {
  pub fn new(record: &DocumentRecord, corpus: &Corpus) -> Self {
    let sorting_date = record.sorting_date(&corpus.events);
    let meta = &record.meta;
    Self {
      id: record.id.clone(),
      file_name: record.file_name.clone(),
      title: meta.title.clone(),
      fulltext: meta.fulltext.clone(),
      archives: meta.archives.clone(),
      print_dates: meta.print_dates.clone(),
      publisher: meta.publisher.clone(),
      pub_place: meta.pub_place.clone(),
      thumbnail: meta.thumbnail.clone(),
      persons: record.persons.iter().map(ToString::to_string).collect(),
      events: record.events.iter().map(ToString::to_string).collect(),
      sorting_date,
      label_year: document::label_year(sorting_date),
    }
  }
}

/// The search-index view of a document.
#[derive(Debug, Clone, Serialize)]
pub struct TypesenseEntry {
  pub id:                String,
  pub filename:          String,
  pub title:             String,
  pub thumbnail:         Option<String>,
  pub sorting_date:      u64,
  pub label_date:        u32,
  pub fulltext:          String,
  /// First print date, `k. A.` when there is none.
  pub print_date:        String,
  pub printer:           String,
  pub printing_location: String,
  pub archives:          Vec<String>,
}

impl TypesenseEntry {
  pub fn new(record: &DocumentRecord, corpus: &Corpus) -> Self {
    let sorting_date = record.sorting_date(&corpus.events);
    let meta = &record.meta;
    Self {
      id: record.id.clone(),
      filename: record.file_name.clone(),
      title: meta.title.clone(),
      thumbnail: meta.thumbnail.clone(),
      sorting_date,
      label_date: document::label_year(sorting_date),
      fulltext: meta.fulltext.clone(),
      print_date: meta
        .print_dates
        .first()
        .cloned()
        .unwrap_or_else(|| UNKNOWN.to_string()),
      printer: meta.publisher.clone(),
      printing_location: meta.pub_place.clone(),
      archives: meta.archives.clone(),
    }
  }
}

/// One relation edge, resolved or not.
#[derive(Debug, Clone, Serialize)]
pub struct RelationRecord {
  pub document_id:      String,
  pub name:             Option<String>,
  pub active:           String,
  pub passive:          String,
  pub active_resolved:  bool,
  pub passive_resolved: bool,
  pub xml:              String,
}

impl RelationRecord {
  pub fn new(edge: &RelationEdge) -> Result<Self> {
    let xml = write_element(&edge.render(), &mut NoSlots)?;
    Ok(Self {
      document_id: edge.document_id.clone(),
      name: edge.payload.attr("name").map(str::to_string),
      active: edge.active.target(),
      passive: edge.passive.target(),
      active_resolved: edge.active.is_resolved(),
      passive_resolved: edge.passive.is_resolved(),
      xml,
    })
  }
}

/// Every edge of the pass keyed by its position.
pub fn relation_records(
  relations: &RelationSet,
) -> Result<BTreeMap<usize, RelationRecord>> {
  relations
    .iter()
    .map(|(EdgeId(id), edge)| Ok((id, RelationRecord::new(edge)?)))
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_sanctions_read_as_none() {
    assert_eq!(or_none(Vec::new()), vec!["Keine"]);
    assert_eq!(or_none(vec!["Rad".into()]), vec!["Rad"]);
  }

  #[test]
  fn verdicts_serialize_with_their_kind() {
    let value = serde_json::to_value(EventDetails::Verdict).unwrap();
    assert_eq!(value["kind"], "verdict");
  }
}
