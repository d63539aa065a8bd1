//! End-of-run summary.

use std::fmt;

use asb_core::{Corpus, event::EntityKind};

const KINDS: [EntityKind; 4] = [
  EntityKind::Offence,
  EntityKind::Punishment,
  EntityKind::Execution,
  EntityKind::Verdict,
];

pub fn render(corpus: &Corpus) -> String { Summary(corpus).to_string() }

struct Summary<'a>(&'a Corpus);

impl fmt::Display for Summary<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let corpus = self.0;
    let diag = &corpus.diagnostics;
    writeln!(
      f,
      "{} documents resolved, {} skipped ({} mode)",
      corpus.documents.len(),
      diag.skipped_documents.len() + diag.duplicate_documents.len(),
      corpus.mode,
    )?;
    for kind in KINDS {
      writeln!(f, "{kind}: {}", corpus.events.of_kind(kind).count())?;
    }
    writeln!(f, "person: {}", corpus.persons.len())?;
    writeln!(f, "relation: {}", corpus.relations.len())?;
    if diag.counter_ids > 0 {
      writeln!(f, "{} ids taken from the counter", diag.counter_ids)?;
    }
    if diag.is_clean() {
      writeln!(f, "no anomalies")
    } else {
      write!(f, "{}", diag.report(corpus.events.len()))
    }
  }
}
