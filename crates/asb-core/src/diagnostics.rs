//! Anomalies collected during a pass.
//!
//! None of these stop a best-effort pass. They are gathered here and
//! reported once at the end instead of being mixed into normal output.

use std::{
  collections::BTreeMap,
  fmt,
  path::PathBuf,
};

use serde::Serialize;

use crate::{
  registry::GlobalId,
  relation::DanglingReference,
  store::Collision,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedDocument {
  pub path:  PathBuf,
  pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnknownEventType {
  pub document_id: String,
  /// Position of the element in its document.
  pub path:        String,
  pub event_type:  String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncompleteEntity {
  pub global_id: GlobalId,
  pub fields:    Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
  pub skipped_documents:   Vec<SkippedDocument>,
  pub duplicate_documents: Vec<String>,
  pub collisions:          Vec<Collision>,
  pub unknown_event_types: Vec<UnknownEventType>,
  pub dangling_references: Vec<DanglingReference>,
  /// How often each field was unexpectedly empty.
  pub missing_fields:      BTreeMap<String, usize>,
  pub incomplete_entities: Vec<IncompleteEntity>,
  /// Fragments folded into an existing event.
  pub benign_merges:       usize,
  /// Copy-seeded events taken over by their primary fragment.
  pub promotions:          usize,
  /// Entities whose local id came from the counter fallback.
  pub counter_ids:         usize,
}

impl Diagnostics {
  pub fn record_missing(&mut self, global_id: &GlobalId, fields: &[&str]) {
    if fields.is_empty() {
      return;
    }
    for field in fields {
      *self.missing_fields.entry(field.to_string()).or_default() += 1;
    }
    self.incomplete_entities.push(IncompleteEntity {
      global_id: global_id.clone(),
      fields:    fields.iter().map(|f| f.to_string()).collect(),
    });
  }

  /// `N of M events are missing infos in …`, or `None` when nothing is
  /// missing.
  pub fn missing_fields_line(&self, total_events: usize) -> Option<String> {
    if self.incomplete_entities.is_empty() {
      return None;
    }
    let fields: Vec<&str> =
      self.missing_fields.keys().map(String::as_str).collect();
    Some(format!(
      "{} of {} events are missing infos in one or more of these fields: '{}'",
      self.incomplete_entities.len(),
      total_events,
      fields.join(", ")
    ))
  }

  pub fn is_clean(&self) -> bool {
    self.skipped_documents.is_empty()
      && self.duplicate_documents.is_empty()
      && self.collisions.is_empty()
      && self.unknown_event_types.is_empty()
      && self.dangling_references.is_empty()
      && self.incomplete_entities.is_empty()
  }

  /// Human-readable end-of-run report of everything except counts.
  pub fn report(&self, total_events: usize) -> Report<'_> {
    Report {
      diagnostics: self,
      total_events,
    }
  }
}

/// [`Diagnostics::report`], rendered through `Display`.
pub struct Report<'a> {
  diagnostics:  &'a Diagnostics,
  total_events: usize,
}

impl fmt::Display for Report<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let diag = self.diagnostics;
    if let Some(line) = diag.missing_fields_line(self.total_events) {
      writeln!(f, "{line}")?;
    }
    if !diag.skipped_documents.is_empty() {
      writeln!(f, "\n{} faulty docs:", diag.skipped_documents.len())?;
      for doc in &diag.skipped_documents {
        writeln!(f, "{}:\t{}", doc.path.display(), doc.error)?;
      }
    }
    if !diag.duplicate_documents.is_empty() {
      writeln!(
        f,
        "\nduplicate document ids: {}",
        diag.duplicate_documents.join(", ")
      )?;
    }
    if !diag.collisions.is_empty() {
      writeln!(f, "\n{} fatal collisions:", diag.collisions.len())?;
      for c in &diag.collisions {
        writeln!(f, "{c}")?;
      }
    }
    if !diag.unknown_event_types.is_empty() {
      writeln!(
        f,
        "\n{} events of unknown type:",
        diag.unknown_event_types.len()
      )?;
      for u in &diag.unknown_event_types {
        writeln!(f, "{} at {}: {:?}", u.document_id, u.path, u.event_type)?;
      }
    }
    if !diag.dangling_references.is_empty() {
      writeln!(
        f,
        "\n{} dangling relation references:",
        diag.dangling_references.len()
      )?;
      for d in &diag.dangling_references {
        writeln!(
          f,
          "{} relation {} ({:?}): {}",
          d.document_id, d.edge.0, d.side, d.reference
        )?;
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_fields_are_counted_per_field() {
    let mut diag = Diagnostics::default();
    diag.record_missing(&GlobalId::from("offence_0001_1"), &["offence_types"]);
    diag.record_missing(&GlobalId::from("trial_result_0001_2"), &["methods"]);
    diag.record_missing(&GlobalId::from("trial_result_0001_3"), &["methods"]);
    diag.record_missing(&GlobalId::from("trial_result_0001_4"), &[]);
    assert_eq!(diag.missing_fields.get("methods"), Some(&2));
    assert_eq!(diag.incomplete_entities.len(), 3);
    assert_eq!(
      diag.missing_fields_line(10).unwrap(),
      "3 of 10 events are missing infos in one or more of these fields: \
       'methods, offence_types'"
    );
  }

  #[test]
  fn clean_pass_reports_nothing() {
    let diag = Diagnostics::default();
    assert!(diag.is_clean());
    assert!(diag.missing_fields_line(5).is_none());
    assert_eq!(diag.report(5).to_string(), "");
  }

  #[test]
  fn report_lists_every_anomaly() {
    use crate::{
      event::EntityKind,
      relation::{EdgeId, Side},
    };

    let mut diag = Diagnostics::default();
    diag.skipped_documents.push(SkippedDocument {
      path:  PathBuf::from("cases/0003.xml"),
      error: "unexpected end tag `a`".into(),
    });
    diag.collisions.push(Collision {
      global_id:         GlobalId::from("offence_0001_12"),
      kind:              EntityKind::Offence,
      document_id:       "0001".into(),
      existing_local_id: "12".into(),
      incoming_local_id: "12".into(),
    });
    diag.dangling_references.push(DanglingReference {
      document_id: "0001".into(),
      edge:        EdgeId(3),
      side:        Side::Passive,
      reference:   "#ghost".into(),
    });

    let text = diag.report(4).to_string();
    assert!(text.contains("1 faulty docs:\ncases/0003.xml:\tunexpected end tag"));
    assert!(text.contains("1 fatal collisions:\nduplicate offence id offence_0001_12"));
    assert!(text.contains("0001 relation 3 (Passive): #ghost"));
    assert!(!diag.is_clean());
  }
}
