//! Field extraction: TEI elements → raw fragment records.
//!
//! Pure functions over the document tree. Nothing here touches the registry;
//! the driver decides what a fragment means.

use std::str::FromStr;

use asb_tei::{Element, Node, NodePath};

use crate::{
  error::{Error, Result},
  event::{EventFragment, EventTag, FragmentPayload, RawMethod},
  labels,
};

// ─── Events ──────────────────────────────────────────────────────────────────

/// The `@when` of the person's execution date, else of their verdict date.
/// Undated event descriptions are bracketed by it.
pub fn bracket_date(person: &Element) -> Option<String> {
  ["execution", "verdict"].into_iter().find_map(|tag| {
    person
      .children_named("event")
      .filter(|e| e.attr("type") == Some(tag))
      .flat_map(|e| e.path("desc/date"))
      .find_map(|d| d.attr("when"))
      .map(str::to_string)
  })
}

/// Extract one `<event>` element found at `path`.
///
/// `bracket` is the owning person's [`bracket_date`].
pub fn event_fragment(
  event: &Element,
  path: NodePath,
  bracket: Option<&str>,
) -> Result<EventFragment> {
  let raw_type = event.attr("type").unwrap_or_default();
  let tag = EventTag::from_str(raw_type)
    .map_err(|_| Error::UnknownEventType(raw_type.to_string()))?;

  let raw_ids = match (event.attr("xml:id"), event.attr("ref")) {
    (Some(id), _) => vec![id.to_string()],
    (None, Some(r)) if r.starts_with('#') => vec![r.to_string()],
    (None, Some(r)) => vec![format!("#{r}")],
    (None, None) => Vec::new(),
  };

  let payload = match tag {
    EventTag::Offence
    | EventTag::OffenceAttempted
    | EventTag::OffenceSuspected
    | EventTag::OffenceAided => FragmentPayload::Offence {
      offence_types: offence_types(event),
      tools:         tools(event),
    },
    EventTag::Punishment | EventTag::Execution => {
      FragmentPayload::Sanction {
        methods: methods(event),
      }
    }
    EventTag::Verdict => FragmentPayload::Verdict,
  };

  Ok(EventFragment {
    tag,
    dates: dates(event, bracket),
    places: event
      .path("desc/placeName")
      .into_iter()
      .filter_map(|p| p.first_text())
      .map(str::to_string)
      .collect(),
    description: event
      .path("desc/desc")
      .into_iter()
      .flat_map(|d| d.texts())
      .map(str::to_string)
      .collect(),
    raw_ids,
    payload,
    element: event.clone(),
    path,
  })
}

fn date_text(date: &Element) -> String {
  labels::normalize_whitespace(&date.texts().join(" "))
}

fn dates(event: &Element, bracket: Option<&str>) -> Vec<String> {
  let found = event.path("desc/date");
  let bracket = bracket.unwrap_or_default().to_string();
  match found.as_slice() {
    [only] => match only.attr("when") {
      Some(when) => vec![when.to_string()],
      None => {
        let text = date_text(only);
        let mut dates = Vec::new();
        if text.contains("before") {
          dates.push(text.clone());
        }
        dates.push(bracket);
        if text.contains("after") {
          dates.push(text);
        }
        dates
      }
    },
    [first, second] => {
      let mut dates = Vec::new();
      match first.attr("when") {
        Some(when) => dates.push(when.to_string()),
        None => {
          dates.push(date_text(first));
          dates.push(bracket);
        }
      }
      dates.push(match second.attr("when") {
        Some(when) => when.to_string(),
        None => date_text(second),
      });
      dates
    }
    other => {
      tracing::debug!(
        id = event.attr("xml:id"),
        count = other.len(),
        "event has no date or more than two"
      );
      Vec::new()
    }
  }
}

fn traits<'a>(
  event: &'a Element,
  kind: &'a str,
) -> impl Iterator<Item = &'a Element> + 'a {
  event
    .path("desc/trait")
    .into_iter()
    .filter(move |t| t.attr("type") == Some(kind))
}

fn offence_types(event: &Element) -> Vec<String> {
  traits(event, "typeOfOffence")
    .flat_map(|t| t.path("desc/list/item"))
    .map(|item| item.own_text())
    .collect()
}

fn tools(event: &Element) -> Vec<String> {
  traits(event, "toolOfCrime")
    .flat_map(|t| t.path("desc"))
    .flat_map(|d| d.texts())
    .flat_map(|t| t.split(','))
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .map(str::to_string)
    .collect()
}

/// Method items: every `desc/list/item` below the event; failing that,
/// every `desc` nested inside another `desc`.
fn methods(event: &Element) -> Vec<RawMethod> {
  let mut items: Vec<&Element> = event
    .find_all("desc")
    .flat_map(|d| d.path("list/item"))
    .collect();
  if items.is_empty() {
    nested_descs(event, false, &mut items);
  }
  items
    .into_iter()
    .map(|item| RawMethod {
      order: item.attr("n").and_then(|n| n.trim().parse().ok()),
      text:  item.first_text().unwrap_or_default().trim().to_string(),
    })
    .collect()
}

fn nested_descs<'a>(
  el: &'a Element,
  in_desc: bool,
  out: &mut Vec<&'a Element>,
) {
  for child in el.elements() {
    let is_desc = child.name == "desc";
    if is_desc && in_desc {
      out.push(child);
    }
    nested_descs(child, in_desc || is_desc, out);
  }
}

// ─── Persons ─────────────────────────────────────────────────────────────────

/// Raw fields of one `<person>` element.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonFragment {
  pub raw_id:          Option<String>,
  pub role:            Option<String>,
  pub forename:        String,
  pub surname:         String,
  pub sex:             String,
  pub age_text:        String,
  /// `age/@value`; `"0"` when absent.
  pub decade:          String,
  pub state_type:      String,
  pub marriage_status: String,
  pub faith:           String,
  pub occupation:      Vec<String>,
  pub birth_place:     Option<String>,
  pub element:         Element,
  pub path:            NodePath,
}

fn first_child_text(el: &Element, path: &str) -> String {
  el.path(path)
    .into_iter()
    .find_map(|e| e.first_text())
    .map(|t| t.trim().to_string())
    .unwrap_or_default()
}

pub fn person_fragment(person: &Element, path: NodePath) -> PersonFragment {
  let attr_of = |path: &str, name: &str| {
    person
      .path(path)
      .into_iter()
      .find_map(|e| e.attr(name))
      .map(|v| v.trim().to_string())
  };

  PersonFragment {
    raw_id: person
      .attr("xml:id")
      .map(str::trim)
      .filter(|id| !id.is_empty())
      .map(str::to_string),
    role: person.attr("role").map(str::to_string),
    forename: first_child_text(person, "persName/forename"),
    surname: person
      .path("persName/surname")
      .into_iter()
      .flat_map(|s| s.texts())
      .map(str::trim)
      .find(|t| !t.is_empty())
      .unwrap_or_default()
      .to_string(),
    sex: attr_of("sex", "value").unwrap_or_default(),
    age_text: first_child_text(person, "age"),
    decade: attr_of("age", "value").unwrap_or_else(|| "0".to_string()),
    state_type: attr_of("state", "type").unwrap_or_default(),
    marriage_status: person
      .path("state/desc")
      .into_iter()
      .flat_map(|d| d.texts())
      .next()
      .unwrap_or_default()
      .trim()
      .to_string(),
    faith: first_child_text(person, "faith"),
    occupation: person
      .children_named("occupation")
      .filter_map(|o| o.first_text())
      .map(|t| t.trim().to_string())
      .collect(),
    birth_place: person.child("birth").map(birth_place),
    element: person.clone(),
    path,
  }
}

fn birth_place(birth: &Element) -> String {
  let settlement = first_child_text(birth, "placeName/settlement");
  let place = match birth.path("placeName/country").first() {
    Some(country) => format!(
      "{settlement} ({})",
      country.first_text().unwrap_or_default().trim()
    ),
    None => settlement,
  };
  if place == "k. A. (k. A.)" {
    labels::UNKNOWN.to_string()
  } else {
    place
  }
}

// ─── Document metadata ───────────────────────────────────────────────────────

/// Document-level fields, independent of any event or person.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentMeta {
  pub title:       String,
  pub fulltext:    String,
  pub archives:    Vec<String>,
  pub print_dates: Vec<String>,
  pub publisher:   String,
  pub pub_place:   String,
  /// First `pb/@facs`.
  pub thumbnail:   Option<String>,
}

/// Elements whose text never counts as document text.
const TEXT_SKIPPED: &[&str] = &["fs", "f", "figDesc"];

/// Whitespace-normalized text of `el`, leaving out [`TEXT_SKIPPED`]
/// subtrees.
pub fn full_text(el: &Element) -> String {
  fn collect<'a>(el: &'a Element, out: &mut Vec<&'a str>) {
    for child in &el.children {
      match child {
        Node::Text(t) => out.push(t),
        Node::Element(e) if !TEXT_SKIPPED.contains(&e.name.as_str()) => {
          collect(e, out)
        }
        _ => {}
      }
    }
  }
  let mut parts = Vec::new();
  collect(el, &mut parts);
  labels::normalize_whitespace(&parts.join(" "))
}

pub fn document_meta(root: &Element) -> DocumentMeta {
  let fulltext = root
    .find("text")
    .map(|text| {
      let mut text = text.clone();
      text.take_all("rdg");
      text.take_all("sic");
      full_text(&text)
    })
    .unwrap_or_default();

  let bibl: Vec<&Element> = root
    .find_all("sourceDesc")
    .flat_map(|s| s.find_all("biblStruct"))
    .collect();
  let first_bibl_text = |name: &str| {
    bibl
      .iter()
      .flat_map(|b| b.find_all(name))
      .find_map(|e| e.first_text())
      .map(str::to_string)
      .unwrap_or_default()
  };

  DocumentMeta {
    title: root.find("title").map(full_text).unwrap_or_default(),
    fulltext,
    archives: root
      .find_all("msDesc")
      .map(|ms| {
        ms.find_all("msIdentifier")
          .flat_map(|id| id.children_named("institution"))
          .find_map(|i| i.first_text())
          .unwrap_or_default()
          .to_string()
      })
      .collect(),
    print_dates: bibl
      .iter()
      .flat_map(|b| b.find_all("date"))
      .filter_map(|d| d.attr("when"))
      .map(|w| w.trim_matches(|c| c == ' ' || c == '.').to_string())
      .collect(),
    publisher: labels::publisher_label(&first_bibl_text("publisher")),
    pub_place: labels::place_label(&first_bibl_text("pubPlace")),
    thumbnail: root
      .find_all("pb")
      .find_map(|pb| pb.attr("facs"))
      .map(str::to_string),
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use asb_tei::parse;

  use super::*;

  fn event(xml: &str) -> Element { parse(xml).unwrap() }

  #[test]
  fn xml_id_wins_over_ref() {
    let frag = event_fragment(
      &event(r##"<event type="offence" xml:id="o1" ref="#o2"/>"##),
      NodePath::root(),
      None,
    )
    .unwrap();
    assert_eq!(frag.raw_ids, vec!["o1"]);
  }

  #[test]
  fn bare_ref_is_marked_as_copy() {
    let frag = event_fragment(
      &event(r#"<event type="offence" ref="o2"/>"#),
      NodePath::root(),
      None,
    )
    .unwrap();
    assert_eq!(frag.raw_ids, vec!["#o2"]);
    assert!(frag.local_id().unwrap().probable_copy);
  }

  #[test]
  fn unknown_type_is_an_error() {
    let err = event_fragment(
      &event(r#"<event type="birth"/>"#),
      NodePath::root(),
      None,
    )
    .unwrap_err();
    assert!(matches!(err, Error::UnknownEventType(t) if t == "birth"));
  }

  #[test]
  fn single_undated_date_is_bracketed() {
    let ev = event(
      r#"<event type="offence"><desc><date>before  the
      trial</date></desc></event>"#,
    );
    let frag =
      event_fragment(&ev, NodePath::root(), Some("1750-03-02")).unwrap();
    assert_eq!(frag.dates, vec!["before the trial", "1750-03-02"]);

    let ev = event(
      r#"<event type="offence"><desc><date>after it</date></desc></event>"#,
    );
    let frag = event_fragment(&ev, NodePath::root(), None).unwrap();
    assert_eq!(frag.dates, vec!["", "after it"]);
  }

  #[test]
  fn two_dates() {
    let ev = event(
      r#"<event type="offence"><desc>
        <date>spring</date><date when="1750-05-01"/>
      </desc></event>"#,
    );
    let frag = event_fragment(&ev, NodePath::root(), Some("1751")).unwrap();
    assert_eq!(frag.dates, vec!["spring", "1751", "1750-05-01"]);
  }

  #[test]
  fn offence_payload() {
    let ev = event(
      r#"<event type="offenceAttempted" xml:id="o1"><desc>
        <placeName>Wien<note>x</note></placeName>
        <desc>Ein  Raub</desc>
        <trait type="typeOfOffence"><desc><list>
          <item>Raub</item><item>Mord</item>
        </list></desc></trait>
        <trait type="toolOfCrime"><desc>Messer, Strick,</desc></trait>
      </desc></event>"#,
    );
    let frag = event_fragment(&ev, NodePath::root(), None).unwrap();
    assert_eq!(frag.tag, EventTag::OffenceAttempted);
    assert_eq!(frag.places, vec!["Wien"]);
    assert_eq!(frag.description, vec!["Ein  Raub"]);
    assert_eq!(frag.payload, FragmentPayload::Offence {
      offence_types: vec!["Raub".into(), "Mord".into()],
      tools:         vec!["Messer".into(), "Strick".into()],
    });
    assert!(frag.dates.is_empty());
  }

  #[test]
  fn methods_from_list_items() {
    let ev = event(
      r#"<event type="execution"><desc><desc><list>
        <item n="2">sword</item><item>wheel</item>
      </list></desc></desc></event>"#,
    );
    let frag = event_fragment(&ev, NodePath::root(), None).unwrap();
    assert_eq!(frag.payload, FragmentPayload::Sanction {
      methods: vec![
        RawMethod {
          order: Some(2),
          text:  "sword".into(),
        },
        RawMethod {
          order: None,
          text:  "wheel".into(),
        },
      ],
    });
  }

  #[test]
  fn methods_fall_back_to_nested_descs() {
    let ev = event(
      r#"<event type="punishment"><desc><desc>Pranger</desc><desc>Landesverweis</desc></desc></event>"#,
    );
    let frag = event_fragment(&ev, NodePath::root(), None).unwrap();
    let FragmentPayload::Sanction { methods } = frag.payload else {
      panic!("not a sanction")
    };
    let texts: Vec<_> = methods.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, vec!["Pranger", "Landesverweis"]);
  }

  #[test]
  fn bracket_prefers_execution() {
    let person = event(
      r#"<person>
        <event type="verdict"><desc><date when="1750-01-01"/></desc></event>
        <event type="execution"><desc><date when="1750-02-01"/></desc></event>
      </person>"#,
    );
    assert_eq!(bracket_date(&person).as_deref(), Some("1750-02-01"));
  }

  #[test]
  fn person_fields() {
    let person = event(
      r#"<person xml:id="p1" role="delinquent">
        <persName><forename>Anna</forename><surname> <hi>Huber</hi></surname></persName>
        <sex value="f"/>
        <age value="2">im 23. Jahr</age>
        <state type="single"><desc>ledig</desc></state>
        <faith>catholic</faith>
        <occupation>Magd</occupation><occupation>Köchin</occupation>
        <birth><placeName><settlement>Graz</settlement><country>Steiermark</country></placeName></birth>
      </person>"#,
    );
    let frag = person_fragment(&person, NodePath::root());
    assert_eq!(frag.raw_id.as_deref(), Some("p1"));
    assert_eq!(frag.role.as_deref(), Some("delinquent"));
    assert_eq!(frag.forename, "Anna");
    assert_eq!(frag.surname, "Huber");
    assert_eq!(frag.sex, "f");
    assert_eq!(frag.age_text, "im 23. Jahr");
    assert_eq!(frag.decade, "2");
    assert_eq!(frag.state_type, "single");
    assert_eq!(frag.marriage_status, "ledig");
    assert_eq!(frag.occupation, vec!["Magd", "Köchin"]);
    assert_eq!(frag.birth_place.as_deref(), Some("Graz (Steiermark)"));
  }

  #[test]
  fn unknown_birth_place_collapses() {
    let person = event(
      r#"<person><birth><placeName><settlement>k. A.</settlement><country>k. A.</country></placeName></birth></person>"#,
    );
    let frag = person_fragment(&person, NodePath::root());
    assert_eq!(frag.birth_place.as_deref(), Some("k. A."));
    assert_eq!(frag.decade, "0");
    assert!(frag.raw_id.is_none());
  }

  #[test]
  fn document_metadata() {
    let root = parse(
      r#"<TEI><teiHeader><fileDesc>
        <titleStmt><title>Urtheil  über <hi>Anna</hi></title></titleStmt>
        <sourceDesc>
          <biblStruct><monogr><imprint>
            <pubPlace>Wien in Österreich</pubPlace>
            <publisher>J. M. Weimar</publisher>
            <date when="1750. "/>
          </imprint></monogr></biblStruct>
          <msDesc><msIdentifier><institution>WStLA</institution></msIdentifier></msDesc>
        </sourceDesc>
      </fileDesc></teiHeader>
      <text><body><pb facs="img_001.jpg"/><p>Es <app><lem>war</lem><rdg>ware</rdg></app> <sic>einmahl</sic><figDesc>Bild</figDesc></p></body></text></TEI>"#,
    )
    .unwrap();
    let meta = document_meta(&root);
    assert_eq!(meta.title, "Urtheil über Anna");
    assert_eq!(meta.fulltext, "Es war");
    assert_eq!(meta.archives, vec!["WStLA"]);
    assert_eq!(meta.print_dates, vec!["1750"]);
    assert_eq!(meta.publisher, "k. A.");
    assert_eq!(meta.pub_place, "Wien");
    assert_eq!(meta.thumbnail.as_deref(), Some("img_001.jpg"));
  }
}
