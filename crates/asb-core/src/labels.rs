//! Label normalization: literal lookup tables from raw annotation strings to
//! display labels, plus the per-pass label indices that give every distinct
//! place, tool, offence type and method a stable id.

use std::{
  collections::{BTreeMap, HashMap},
  sync::LazyLock,
};

use regex::Regex;
use serde::Serialize;

// ─── Static tables ───────────────────────────────────────────────────────────

/// Raw punishment/execution method text → display label.
static METHOD_LABELS: &[(&str, &str)] = &[
  ("bodies on wheel", "Rad (Körper)"),
  ("body on wheel", "Rad (Körper)"),
  ("burned", "Verbrennung"),
  ("hand chopped", "Handabhauung"),
  ("head on pale", "Pfahl (Kopf)"),
  ("heads on pale", "Pfahl (Kopf)"),
  ("pale", "Pfahl"),
  ("pale (head)", "Pfahl (Kopf)"),
  ("right hand chopped", "Handabhauung (rechte Hand)"),
  ("quartered", "Vierteilung"),
  ("shot", "Erschießung"),
  ("stack", "Gesteck (Kopf)"),
  ("stake", "Gesteck (Kopf)"),
  ("strand", "Strang"),
  ("sword", "Schwert"),
  ("wheel", "Rad"),
  ("30 Jahre Gefängnis zweiten Grades", "Gefängnis zweiten Grades"),
  ("wheel (body)", "Rad (Körper)"),
  ("wheel from above", "Rad von oben"),
  ("wheel from above (begnadigt)", "Rad von oben (begnadigt)"),
  ("wheel from beneath", "Rad von unten"),
  ("wheel from beyond", "Rad von hinten"),
  (
    "Zwicken mit glühenden Zangen in die rechte Brust",
    "glühende Zangen (rechte Brust)",
  ),
  (
    "dreimaliger Zwick mit glühenden Zangen an verschiedenen Orten",
    "glühende Zangen (x3)",
  ),
  ("Brandmarkung durch den Freymann", "Brandmarkung"),
  ("zweimaliger Zwick mit glühenden Zangen", "glühende Zangen (x2)"),
  (
    "Zwick mit glühenden Zangen in die linke Brust",
    "glühende Zangen (linke Brust)",
  ),
  (
    "Theile herumgetragen und seitlich an Galgen aufgenagelt",
    "Teile herumgetragen und an Galgen aufgenagelt",
  ),
  (
    concat!(
      "StrangUrteil vollzogen; dannenhero dessen Bildnuß",
      "an die gewöhnliche Richtstatt vor ",
      "das Schotten=Thor auf dasig so genannten Rabenstein ausgeführet /",
      " und an einem daselbst ",
      "zu diesem Ende aufgerichteten Schnell=Galgen aufgehangen / und alda \
       drey Tag",
      " lang hangend gelassen werden solle."
    ),
    "Erhängen",
  ),
  ("Teile an den Tatorten ausgestellt", "Ausstellung der Teile am Tatort"),
  (
    "Delinquent an dem Ort der begangenen Morde zeigen",
    "Ausstellung am Tatort",
  ),
  ("Schleifen auf Kuhhaut zur Richtstatt", "Schleifen auf Kuhhaut"),
  (
    "Riemen auf der rechten Seiten aus dem Rücken schneiden",
    "Riemen aus dem Rücken schneiden",
  ),
];

/// Display label → coarse label used for faceted search.
static METHOD_SEARCH_LABELS: &[(&str, &str)] = &[
  ("Rad (Körper)", "Rad"),
  ("Pfahl (Kopf)", "Pfahl"),
  ("Handabhauung (rechte Hand)", "Handabhauung"),
  ("Gesteck (Kopf)", "Gesteck"),
  ("Rad von oben", "Rad"),
  ("Rad von oben (begnadigt)", "Rad"),
  ("glühende Zangen (rechte Brust)", "Zangen"),
  ("glühende Zangen (x3)", "Zangen"),
  ("glühende Zangen (x2)", "Zangen"),
  ("glühende Zangen (linke Brust)", "Zangen"),
  ("Ausstellung der Teile am Tatort", "Ausstellung am Tatort"),
  ("Brandmarkung der Wangen", "Brandmarkung"),
  ("Schleifen auf Kuhhaut zur Richtstatt", "Schleifen auf Kuhhaut"),
  ("unter dem Galgen begraben", "Verscharrung"),
  ("Riemen aus dem Rücken schneiden", "Riemenschneiden"),
  ("Belegung mit schweren Eisen", "Schwere Eisen"),
  (
    "Abstrafung mit 50 Stockstreichen an jedem Jahrestage seines Vergehens",
    "Stockstreichen",
  ),
  ("Eingeweide aus Körper gerissen", "Ausweidung"),
  ("Leib darunter eingescharrt", "Verscharrung"),
  ("Gefängnis zweiten Grades", "Gefängnis"),
];

static PUBLISHER_LABELS: &[(&str, &str)] = &[
  ("zu finden im grossen Jakoberhof Nro. 837.", "k. A."),
  ("Andreas Heyinger / Acad. Buchdr.", "Andreas Heyinger"),
  ("J. M. Weimar", "k. A."),
  ("gedruckt mit Jahnischen Schriften", "k. A."),
];

static PLACE_LABELS: &[(&str, &str)] = &[("Wien in Österreich", "Wien")];

/// Person vocabulary: sex, state type, marital status and faith codes.
static PERSON_LABELS: &[(&str, &str)] = &[
  ("m", "männlich"),
  ("male", "männlich"),
  ("f", "weiblich"),
  ("w", "weiblich"),
  ("female", "weiblich"),
  ("single", "ledig"),
  ("married", "verheiratet"),
  ("widowed", "verwitwet"),
  ("catholic", "katholisch"),
  ("protestant", "evangelisch"),
  ("lutheran", "evangelisch"),
  ("jewish", "jüdisch"),
];

/// Marker for "no information" in the annotations.
pub const UNKNOWN: &str = "k. A.";

static UNKNOWN_MARKER: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"k\. ?A\.,?").expect("static regex"));
static SPACE_RUNS: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r" +").expect("static regex"));
static WHITESPACE_RUNS: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));
static FIRST_NUMBER: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"[0-9]+").expect("static regex"));

fn lookup(
  table: &'static [(&'static str, &'static str)],
  raw: &str,
) -> Option<&'static str> {
  table.iter().find(|(k, _)| *k == raw).map(|(_, v)| *v)
}

// ─── Method labels ───────────────────────────────────────────────────────────

/// The three renderings of a punishment or execution method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodLabels {
  pub label:       String,
  pub label_short: String,
  /// Coarse label for search facets.
  pub label_ts:    String,
}

pub fn method_labels(raw: &str) -> MethodLabels {
  let raw = raw.trim();
  let display = lookup(METHOD_LABELS, raw).unwrap_or(raw);
  let search = lookup(METHOD_SEARCH_LABELS, display).unwrap_or(display);
  MethodLabels {
    label:       display.to_string(),
    label_short: display.to_string(),
    label_ts:    search.to_string(),
  }
}

// ─── Document and person labels ──────────────────────────────────────────────

pub fn publisher_label(raw: &str) -> String {
  let raw = raw.trim();
  lookup(PUBLISHER_LABELS, raw).unwrap_or(raw).to_string()
}

pub fn place_label(raw: &str) -> String {
  let raw = raw.trim();
  lookup(PLACE_LABELS, raw).unwrap_or(raw).to_string()
}

/// Translate a person vocabulary code. Empty and unknown-marker values pass
/// through silently; any other unmapped value passes through with a warning.
pub fn person_label(field: &str, raw: &str) -> String {
  let raw = raw.trim();
  if let Some(mapped) = lookup(PERSON_LABELS, raw) {
    return mapped.to_string();
  }
  if !raw.is_empty() && !is_unknown(raw) {
    tracing::warn!(
      field,
      value = raw,
      "no label translation, keeping raw value"
    );
  }
  raw.to_string()
}

pub fn is_unknown(value: &str) -> bool {
  matches!(value.trim(), "k. A." | "K. A." | "k.A.")
}

/// Remove every `k. A.` marker from `s`.
pub fn clear_unknown_marker(s: &str) -> String {
  UNKNOWN_MARKER.replace_all(s, "").trim().to_string()
}

/// Collapse runs of spaces (not other whitespace) to one.
pub fn collapse_spaces(s: &str) -> String {
  SPACE_RUNS.replace_all(s, " ").into_owned()
}

/// Collapse all whitespace runs to one space and trim.
pub fn normalize_whitespace(s: &str) -> String {
  WHITESPACE_RUNS.replace_all(s, " ").trim().to_string()
}

/// `forename surname`, falling back to whichever part exists, then `k.A.`.
pub fn full_name(forename: &str, surname: &str) -> String {
  let name = match (forename.is_empty(), surname.is_empty()) {
    (false, false) => {
      clear_unknown_marker(format!("{forename} {surname}").trim())
    }
    (true, false) => clear_unknown_marker(surname),
    (false, true) => clear_unknown_marker(forename),
    (true, true) => String::new(),
  };
  if name.is_empty() { "k.A.".to_string() } else { name }
}

/// Age and decade-of-age bucket as shown in the person index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgeLabels {
  pub age:        String,
  pub decade_age: String,
}

/// Derive display age and decade bucket from the raw age text and the
/// decade digit (`age/@value`, `"0"` when absent).
pub fn refine_age(age_text: &str, decade: &str) -> AgeLabels {
  let decade_num = decade.trim().parse::<u32>().unwrap_or(0);
  let age = if let Some(m) = FIRST_NUMBER.find(age_text) {
    m.as_str().to_string()
  } else if FIRST_NUMBER.is_match(decade) {
    format!("~{}0", decade.trim())
  } else {
    "k.A.".to_string()
  };
  let decade_age = if decade_num < 1 {
    UNKNOWN.to_string()
  } else {
    format!("{decade_num}0–{decade_num}9")
  };
  AgeLabels { age, decade_age }
}

// ─── Label indices ───────────────────────────────────────────────────────────

/// Hands out `<prefix>_<nnn>` ids to distinct labels in first-seen order.
#[derive(Debug, Clone)]
pub struct LabelIndex {
  prefix:   &'static str,
  width:    usize,
  counter:  usize,
  by_label: HashMap<String, String>,
  by_id:    BTreeMap<String, String>,
}

impl LabelIndex {
  pub fn new(prefix: &'static str, width: usize) -> Self {
    Self {
      prefix,
      width,
      counter: 0,
      by_label: HashMap::new(),
      by_id: BTreeMap::new(),
    }
  }

  pub fn prefix(&self) -> &'static str { self.prefix }

  /// The id of `label`, minting one on first sight.
  pub fn id_for(&mut self, label: &str) -> String {
    if let Some(id) = self.by_label.get(label) {
      return id.clone();
    }
    self.counter += 1;
    let id = format!(
      "{}_{:0width$}",
      self.prefix,
      self.counter,
      width = self.width
    );
    self.by_label.insert(label.to_string(), id.clone());
    self.by_id.insert(id.clone(), label.to_string());
    id
  }

  /// `id → label`, ordered by id.
  pub fn entries(&self) -> &BTreeMap<String, String> { &self.by_id }

  pub fn len(&self) -> usize { self.by_id.len() }

  pub fn is_empty(&self) -> bool { self.by_id.is_empty() }
}

/// Every label index used during one pass.
#[derive(Debug, Clone)]
pub struct LabelIndices {
  pub places:             LabelIndex,
  pub tools:              LabelIndex,
  pub offence_types:      LabelIndex,
  pub punishment_methods: LabelIndex,
  pub execution_methods:  LabelIndex,
}

impl Default for LabelIndices {
  fn default() -> Self {
    Self {
      places:             LabelIndex::new("place", 4),
      tools:              LabelIndex::new("tool_type", 3),
      offence_types:      LabelIndex::new("offence_type", 3),
      punishment_methods: LabelIndex::new("punishment_type", 3),
      execution_methods:  LabelIndex::new("execution_type", 3),
    }
  }
}

impl LabelIndices {
  pub fn all(&self) -> [&LabelIndex; 5] {
    [
      &self.tools,
      &self.places,
      &self.offence_types,
      &self.punishment_methods,
      &self.execution_methods,
    ]
  }
}
