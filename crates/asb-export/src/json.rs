//! JSON exports. Every file is a pretty-printed object keyed by id.

use std::{
  collections::BTreeMap,
  fs,
  path::{Path, PathBuf},
};

use asb_core::{Corpus, event::EntityKind};
use serde::Serialize;
use tracing::info;

use crate::{
  error::{Error, Result},
  record::{
    DocumentEntry, EventRecord, PersonRecord, TypesenseEntry,
    relation_records, sorted_persons,
  },
};

/// Write all JSON files into `dir` and return their paths.
pub fn write_all(corpus: &Corpus, dir: &Path) -> Result<Vec<PathBuf>> {
  let mut offences = BTreeMap::new();
  let mut trial_results = BTreeMap::new();
  for event in corpus.events.iter() {
    let record = EventRecord::new(event, &corpus.relations)?;
    if event.kind() == EntityKind::Offence {
      offences.insert(record.id.clone(), record);
    } else {
      trial_results.insert(record.id.clone(), record);
    }
  }

  let persons: BTreeMap<String, PersonRecord> = sorted_persons(&corpus.persons)
    .into_iter()
    .map(|(sorter, p)| {
      (p.global_id.to_string(), PersonRecord::new(p, sorter, corpus))
    })
    .collect();

  let documents: BTreeMap<String, DocumentEntry> = corpus
    .documents
    .iter()
    .map(|d| (d.record.id.clone(), DocumentEntry::new(&d.record, corpus)))
    .collect();

  let typesense: BTreeMap<String, TypesenseEntry> = corpus
    .documents
    .iter()
    .map(|d| (d.record.id.clone(), TypesenseEntry::new(&d.record, corpus)))
    .collect();

  let mut written = vec![
    write_pretty(&dir.join("offences.json"), &offences)?,
    write_pretty(&dir.join("punishments.json"), &trial_results)?,
    write_pretty(&dir.join("persons.json"), &persons)?,
    write_pretty(&dir.join("documents.json"), &documents)?,
    write_pretty(&dir.join("typesense_entries.json"), &typesense)?,
    write_pretty(
      &dir.join("relations.json"),
      &relation_records(&corpus.relations)?,
    )?,
  ];
  for index in corpus.labels.all() {
    let path = dir.join(format!("unique_{}.json", index.prefix()));
    written.push(write_pretty(&path, index.entries())?);
  }
  written.push(write_pretty(
    &dir.join("diagnostics.json"),
    &corpus.diagnostics,
  )?);
  Ok(written)
}

/// Serialize `value` to `path`, creating parent directories as needed.
pub fn write_pretty<T>(path: &Path, value: &T) -> Result<PathBuf>
where
  T: Serialize + ?Sized,
{
  let bytes = serde_json::to_vec_pretty(value)?;
  write_file(path, &bytes)?;
  info!(path = %path.display(), "wrote json");
  Ok(path.to_path_buf())
}

pub(crate) fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent)?;
  }
  fs::write(path, bytes).map_err(|source| Error::Write {
    path: path.to_path_buf(),
    source,
  })
}
