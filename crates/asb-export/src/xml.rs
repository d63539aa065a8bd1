//! TEI XML exports: index lists and rewritten editions.
//!
//! Index lists are generated with `quick-xml`'s writer API; the listed
//! elements themselves are copied from the resolved documents.

use std::{
  io::Write,
  path::{Path, PathBuf},
};

use asb_core::{Corpus, event::EntityKind, relation::RelationSet};
use asb_tei::{Element, SlotRenderer, write_document, write_into};
use quick_xml::{
  Writer,
  events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};
use tracing::info;

use crate::{
  edition, error::Result, json::write_file, record::canonical_element,
};

pub const NS_TEI: &str = "http://www.tei-c.org/ns/1.0";

/// Write `indices/offences.xml`, `indices/punishments.xml` and
/// `indices/listperson.xml` below `dir`.
pub fn write_indices(corpus: &Corpus, dir: &Path) -> Result<Vec<PathBuf>> {
  let offences: Vec<Element> = corpus
    .events
    .of_kind(EntityKind::Offence)
    .map(canonical_element)
    .collect();
  let trial_results: Vec<Element> = corpus
    .events
    .iter()
    .filter(|e| e.kind() != EntityKind::Offence)
    .map(canonical_element)
    .collect();

  let mut persons: Vec<_> = corpus.persons.iter().collect();
  persons.sort_by(|a, b| a.fullname.cmp(&b.fullname));
  let persons: Vec<Element> = persons
    .into_iter()
    .map(|p| {
      let mut el = p.source.element.clone();
      el.set_attr("xml:id", p.global_id.as_str());
      el.with_child(
        Element::new("note")
          .with_attr("type", "label")
          .with_text(p.fullname.as_str()),
      )
    })
    .collect();

  let lists = [
    ("offences.xml", "Delikte", "listEvent", offences),
    ("punishments.xml", "Strafen", "listEvent", trial_results),
    ("listperson.xml", "Personen", "listPerson", persons),
  ];

  let mut written = Vec::with_capacity(lists.len());
  for (file, title, list, items) in lists {
    let bytes = list_document(title, list, &items, &corpus.relations)?;
    let path = dir.join("indices").join(file);
    write_file(&path, &bytes)?;
    info!(path = %path.display(), entries = items.len(), "wrote index");
    written.push(path);
  }
  Ok(written)
}

/// Write every resolved document to `editions/<file name>` below `dir`,
/// after [`edition::prepare`]. Comments and processing instructions ahead of
/// the root are carried over; the doctype is not.
pub fn write_editions(corpus: &Corpus, dir: &Path) -> Result<Vec<PathBuf>> {
  let mut render = |slot: usize| corpus.relations.render(slot);
  let mut written = Vec::with_capacity(corpus.documents.len());
  for doc in &corpus.documents {
    let mut tree = doc.tree.clone();
    edition::prepare(&mut tree, &doc.record.id);
    let bytes = write_document(&doc.prolog, &tree, &mut render)?;
    let path = dir.join("editions").join(&doc.record.file_name);
    write_file(&path, &bytes)?;
    info!(document_id = %doc.record.id, path = %path.display(), "wrote edition");
    written.push(path);
  }
  Ok(written)
}

/// A minimal TEI document wrapping `items` in one `<list>` element.
pub fn list_document(
  title: &str,
  list: &str,
  items: &[Element],
  relations: &RelationSet,
) -> Result<Vec<u8>> {
  let mut render = |slot: usize| relations.render(slot);
  let mut w = Writer::new(Vec::new());
  w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
  w.write_event(Event::Text(BytesText::new("\n")))?;

  let mut tei = BytesStart::new("TEI");
  tei.push_attribute(("xmlns", NS_TEI));
  w.write_event(Event::Start(tei))?;
  write_start(&mut w, "teiHeader")?;
  write_start(&mut w, "fileDesc")?;
  write_start(&mut w, "titleStmt")?;
  write_text_elem(&mut w, "title", title)?;
  write_end(&mut w, "titleStmt")?;
  write_end(&mut w, "fileDesc")?;
  write_end(&mut w, "teiHeader")?;
  write_start(&mut w, "text")?;
  write_start(&mut w, "body")?;
  write_list(&mut w, list, items, &mut render)?;
  write_end(&mut w, "body")?;
  write_end(&mut w, "text")?;
  write_end(&mut w, "TEI")?;
  Ok(w.into_inner())
}

fn write_list<W, R>(
  w: &mut Writer<W>,
  list: &str,
  items: &[Element],
  render: &mut R,
) -> Result<()>
where
  W: Write,
  R: SlotRenderer,
{
  if items.is_empty() {
    w.write_event(Event::Empty(BytesStart::new(list)))?;
    return Ok(());
  }
  write_start(w, list)?;
  for item in items {
    write_into(w, item, render)?;
  }
  write_end(w, list)
}

// ─── XML writer helpers ──────────────────────────────────────────────────────

fn write_start<W: Write>(w: &mut Writer<W>, tag: &str) -> Result<()> {
  w.write_event(Event::Start(BytesStart::new(tag)))?;
  Ok(())
}

fn write_end<W: Write>(w: &mut Writer<W>, tag: &str) -> Result<()> {
  w.write_event(Event::End(BytesEnd::new(tag)))?;
  Ok(())
}

fn write_text_elem<W: Write>(
  w: &mut Writer<W>,
  tag: &str,
  text: &str,
) -> Result<()> {
  write_start(w, tag)?;
  w.write_event(Event::Text(BytesText::new(text)))?;
  write_end(w, tag)
}
