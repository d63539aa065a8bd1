//! Per-document records: metadata plus the entities a document contains.

use chrono::{Datelike, NaiveDate};

use crate::{
  event::EntityKind,
  extract::DocumentMeta,
  registry::GlobalId,
  store::EntityStore,
};

/// Label year used when no date in the document is usable.
pub const FALLBACK_LABEL_YEAR: u32 = 1700;

#[derive(Debug, Clone)]
pub struct DocumentRecord {
  pub id:        String,
  pub file_name: String,
  pub meta:      DocumentMeta,
  /// Person global ids, in document order.
  pub persons:   Vec<GlobalId>,
  /// Event global ids created by this document, in document order.
  pub events:    Vec<GlobalId>,
}

impl DocumentRecord {
  pub fn new(id: &str, file_name: String, meta: DocumentMeta) -> Self {
    Self {
      id: id.to_string(),
      file_name,
      meta,
      persons: Vec::new(),
      events: Vec::new(),
    }
  }

  /// The largest numeric date among the first dates of this document's
  /// trial results and its print dates, as `YYYYMMDD`. `0` when none is
  /// usable.
  pub fn sorting_date(&self, events: &EntityStore) -> u64 {
    let trial_dates = self
      .events
      .iter()
      .filter_map(|id| events.get(id))
      .filter(|e| {
        matches!(
          e.kind(),
          EntityKind::Punishment | EntityKind::Execution | EntityKind::Verdict
        )
      })
      .filter_map(|e| e.dates.first());

    trial_dates
      .chain(self.meta.print_dates.iter())
      .filter_map(|d| numeric_date(d))
      .max()
      .unwrap_or(0)
  }

  /// First four digits of the sorting date, or [`FALLBACK_LABEL_YEAR`].
  pub fn label_year(&self, events: &EntityStore) -> u32 {
    label_year(self.sorting_date(events))
  }
}

pub fn label_year(sorting_date: u64) -> u32 {
  if sorting_date == 0 {
    return FALLBACK_LABEL_YEAR;
  }
  sorting_date
    .to_string()
    .get(..4)
    .and_then(|y| y.parse().ok())
    .unwrap_or(FALLBACK_LABEL_YEAR)
}

/// Read a free-form date as a sortable `YYYYMMDD` number.
///
/// ISO dates are taken as they are. Otherwise separators are dropped; if
/// letters remain, a trailing four-digit year is kept. The result is
/// right-padded with zeros to eight digits.
pub fn numeric_date(raw: &str) -> Option<u64> {
  let raw = raw.trim();
  if !raw.chars().any(|c| c.is_ascii_digit()) {
    return None;
  }
  if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
    let year = u64::try_from(date.year()).ok()?;
    return Some(
      year * 10_000 + u64::from(date.month()) * 100 + u64::from(date.day()),
    );
  }

  let mut compact: String =
    raw.chars().filter(|c| !matches!(c, '-' | ' ' | '.')).collect();
  if compact.chars().any(|c| c.is_ascii_alphabetic()) {
    let tail_start = compact.char_indices().rev().nth(3).map(|(i, _)| i);
    match tail_start.map(|i| &compact[i..]) {
      Some(tail) if tail.chars().all(|c| c.is_ascii_digit()) => {
        compact = tail.to_string();
      }
      _ => return None,
    }
  }
  if compact.len() > 8 || !compact.chars().all(|c| c.is_ascii_digit()) {
    return None;
  }
  format!("{compact:0<8}").parse().ok()
}
