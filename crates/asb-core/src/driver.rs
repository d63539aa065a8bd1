//! The corpus resolution driver.
//!
//! Documents are processed strictly in the order they are given, and within
//! a document persons and their events in source order. Which fragment of an
//! event counts as first-seen depends on that order.

use std::{
  collections::HashMap,
  path::{Path, PathBuf},
};

use asb_tei::{Document, Element, Node, NodePath};
use tracing::{debug, error, info, warn};

use crate::{
  config::ResolutionMode,
  diagnostics::{Diagnostics, SkippedDocument, UnknownEventType},
  document::DocumentRecord,
  error::{Error, Result},
  event::{EntityKind, EventFragment, EventTag, LocalId},
  extract::{self, PersonFragment},
  labels::LabelIndices,
  person::Person,
  registry::{GlobalId, IdCounter, Registry},
  relation::{self, EXECUTION_TOKEN, RelationSet, StagedRelations},
  store::{Collision, EntityStore, Resolution},
};

/// A document that made it through the pass, with its (staged) tree.
#[derive(Debug)]
pub struct ResolvedDocument {
  pub path:   PathBuf,
  pub record: DocumentRecord,
  /// Comments and processing instructions ahead of the root.
  pub prolog: Vec<Node>,
  /// The document tree with relations replaced by slots, canonical
  /// elements stamped with their global id and copies replaced by
  /// references.
  pub tree:   Element,
}

/// Everything a finished pass produced.
#[derive(Debug)]
pub struct Corpus {
  pub mode:        ResolutionMode,
  pub events:      EntityStore,
  pub persons:     Vec<Person>,
  pub documents:   Vec<ResolvedDocument>,
  pub relations:   RelationSet,
  pub labels:      LabelIndices,
  pub diagnostics: Diagnostics,
}

impl Corpus {
  pub fn person(&self, id: &GlobalId) -> Option<&Person> {
    self.persons.iter().find(|p| &p.global_id == id)
  }

  pub fn document(&self, id: &str) -> Option<&ResolvedDocument> {
    self.documents.iter().find(|d| d.record.id == id)
  }
}

/// One extracted `<person>` and the outcome of extracting each of its
/// events.
struct PersonPlan {
  fragment: PersonFragment,
  events:   Vec<(NodePath, Result<EventFragment>)>,
}

/// State of one pass. Build a fresh one per pass.
#[derive(Debug)]
pub struct Resolver {
  mode:        ResolutionMode,
  registry:    Registry,
  labels:      LabelIndices,
  events:      EntityStore,
  persons:     Vec<Person>,
  documents:   Vec<ResolvedDocument>,
  relations:   RelationSet,
  event_ids:   IdCounter,
  person_ids:  IdCounter,
  diagnostics: Diagnostics,
}

impl Resolver {
  pub fn new(mode: ResolutionMode) -> Self {
    Self {
      mode,
      registry: Registry::new(),
      labels: LabelIndices::default(),
      events: EntityStore::new(),
      persons: Vec::new(),
      documents: Vec::new(),
      relations: RelationSet::new(),
      event_ids: IdCounter::default(),
      person_ids: IdCounter::default(),
      diagnostics: Diagnostics::default(),
    }
  }

  /// Load and resolve the file at `path`. A document that cannot be read or
  /// parsed is recorded and skipped; it never fails the pass.
  pub fn resolve_path(&mut self, path: &Path) -> Result<()> {
    match Document::load(path) {
      Ok(doc) => self.resolve_document(doc),
      Err(e) => {
        error!(path = %path.display(), error = %e, "skipping document");
        self.diagnostics.skipped_documents.push(SkippedDocument {
          path:  path.to_path_buf(),
          error: e.to_string(),
        });
        Ok(())
      }
    }
  }

  /// Resolve one parsed document.
  ///
  /// Fails only in strict mode, on a fatal collision or a duplicate
  /// document id.
  pub fn resolve_document(&mut self, doc: Document) -> Result<()> {
    let file_name = doc.file_name();
    let Document {
      path,
      id,
      prolog,
      mut root,
    } = doc;

    if self.registry.reserve(&GlobalId::new(id.as_str())).is_err() {
      match self.mode {
        ResolutionMode::Strict => return Err(Error::DuplicateDocument(id)),
        ResolutionMode::BestEffort => {
          error!(
            document_id = %id,
            path = %path.display(),
            "duplicate document id, skipping"
          );
          self.diagnostics.duplicate_documents.push(id);
          return Ok(());
        }
      }
    }

    let staged = relation::stage(&id, &mut root, &mut self.relations);
    let meta = extract::document_meta(&root);
    let plans = plan_persons(&root);
    let mut record = DocumentRecord::new(&id, file_name, meta);

    for plan in plans {
      let Some(person) = self.resolve_person(&id, plan, &staged, &mut record)?
      else {
        continue;
      };
      record.persons.push(person.global_id.clone());
      self.persons.push(person);
    }

    for dangling in staged.dangling(&self.relations) {
      warn!(
        document_id = %id,
        reference = %dangling.reference,
        side = ?dangling.side,
        "relation endpoint never resolved"
      );
      self.diagnostics.dangling_references.push(dangling);
    }

    info!(
      document_id = %id,
      persons = record.persons.len(),
      events = record.events.len(),
      relations = staged.edges().len(),
      "resolved document"
    );
    self.documents.push(ResolvedDocument {
      path,
      record,
      prolog,
      tree: root,
    });
    Ok(())
  }

  /// Build the person and resolve its events. `None` when the person's own
  /// id collided in best-effort mode; its events are dropped with it.
  fn resolve_person(
    &mut self,
    document_id: &str,
    plan: PersonPlan,
    staged: &StagedRelations,
    record: &mut DocumentRecord,
  ) -> Result<Option<Person>> {
    let PersonPlan { fragment, events } = plan;
    let local_id = fragment
      .raw_id
      .as_deref()
      .and_then(LocalId::from_raw)
      .unwrap_or_else(|| {
        self.diagnostics.counter_ids += 1;
        LocalId::from_counter(self.person_ids.next_id())
      });
    let global_id = Registry::allocate(
      EntityKind::Person.id_prefix(),
      document_id,
      &local_id.value,
    );
    if self.registry.reserve(&global_id).is_err() {
      let shown = local_id.raw.clone().unwrap_or(local_id.value.clone());
      self.fatal(Collision {
        global_id,
        kind: EntityKind::Person,
        document_id: document_id.to_string(),
        existing_local_id: shown.clone(),
        incoming_local_id: shown,
      })?;
      return Ok(None);
    }

    let mut person =
      Person::new(global_id, local_id, document_id, fragment, &record.meta);
    debug!(person = %person.global_id, "resolved person");

    for (path, extracted) in events {
      let fragment = match extracted {
        Ok(fragment) => fragment,
        Err(Error::UnknownEventType(event_type)) => {
          warn!(document_id, %event_type, "unknown event type, skipping");
          self.diagnostics.unknown_event_types.push(UnknownEventType {
            document_id: document_id.to_string(),
            path: path.to_string(),
            event_type,
          });
          continue;
        }
        Err(e) => return Err(e),
      };
      if let Some(id) =
        self.resolve_event(document_id, fragment, staged, record)?
      {
        person.relate(id);
      }
    }
    Ok(Some(person))
  }

  fn resolve_event(
    &mut self,
    document_id: &str,
    fragment: EventFragment,
    staged: &StagedRelations,
    record: &mut DocumentRecord,
  ) -> Result<Option<GlobalId>> {
    let tag = fragment.tag;
    let local_id = fragment.local_id().unwrap_or_else(|| {
      self.diagnostics.counter_ids += 1;
      LocalId::from_counter(self.event_ids.next_id())
    });
    let key = local_id.value.clone();

    let resolution = match self.events.resolve(
      &mut self.registry,
      &mut self.labels,
      document_id,
      local_id,
      fragment,
    ) {
      Ok(resolution) => resolution,
      Err(collision) => {
        self.fatal(collision)?;
        return Ok(None);
      }
    };

    match &resolution {
      Resolution::Created(id) => {
        debug!(event = %id, "created event");
        record.events.push(id.clone());
      }
      Resolution::Merged(id) => {
        debug!(event = %id, "merged copy into existing event");
        self.diagnostics.benign_merges += 1;
      }
      Resolution::Promoted(id) => {
        debug!(event = %id, "primary fragment took over copy-seeded event");
        self.diagnostics.promotions += 1;
        if !record.events.contains(id) {
          record.events.push(id.clone());
        }
      }
    }

    let global_id = resolution.global_id();
    staged.rewrite(&mut self.relations, &key, global_id);
    if tag == EventTag::Execution {
      staged.rewrite(&mut self.relations, EXECUTION_TOKEN, global_id);
    }
    Ok(Some(global_id.clone()))
  }

  /// Strict mode: fail. Best-effort: record and carry on.
  fn fatal(&mut self, collision: Collision) -> Result<()> {
    match self.mode {
      ResolutionMode::Strict => Err(Error::DuplicateIdentifier(collision)),
      ResolutionMode::BestEffort => {
        error!(%collision, "dropping fragment");
        self.diagnostics.collisions.push(collision);
        Ok(())
      }
    }
  }

  /// Run the end-of-pass bookkeeping and hand over the results.
  pub fn finish(self) -> Corpus {
    let Self {
      mode,
      labels,
      events,
      persons,
      mut documents,
      relations,
      mut diagnostics,
      ..
    } = self;

    for event in events.iter() {
      let missing = event.unexpected_empty_fields();
      if !missing.is_empty() {
        warn!(event = %event.global_id, ?missing, "event is missing fields");
        diagnostics.record_missing(&event.global_id, &missing);
      }
    }

    mark_editions(&mut documents, &events, &persons);

    info!(
      documents = documents.len(),
      events = events.len(),
      persons = persons.len(),
      "pass finished"
    );
    Corpus {
      mode,
      events,
      persons,
      documents,
      relations,
      labels,
      diagnostics,
    }
  }
}

fn plan_persons(root: &Element) -> Vec<PersonPlan> {
  root
    .find_paths("person")
    .into_iter()
    .map(|(person_path, person)| {
      let bracket = extract::bracket_date(person);
      let events = person
        .find_paths("event")
        .into_iter()
        .map(|(event_path, event)| {
          let path = person_path.join(&event_path);
          let fragment =
            extract::event_fragment(event, path.clone(), bracket.as_deref());
          (path, fragment)
        })
        .collect();
      PersonPlan {
        fragment: extract::person_fragment(person, person_path),
        events,
      }
    })
    .collect()
}

/// Stamp canonical elements with their global id and replace every other
/// fragment of an event with a reference to it.
fn mark_editions(
  documents: &mut [ResolvedDocument],
  events: &EntityStore,
  persons: &[Person],
) {
  let by_id: HashMap<String, usize> = documents
    .iter()
    .enumerate()
    .map(|(i, d)| (d.record.id.clone(), i))
    .collect();
  let tree_of = |document_id: &str| by_id.get(document_id).copied();

  for event in events.iter() {
    for (i, fragment) in event.fragments.iter().enumerate() {
      let Some(doc) = tree_of(&fragment.document_id) else {
        continue;
      };
      let tree = &mut documents[doc].tree;
      if i == event.canonical {
        stamp(tree, &fragment.path, &event.global_id);
      } else {
        let tag = event.tag.as_ref();
        let reference = Element::new("rs")
          .with_attr("type", tag)
          .with_attr("ref", event.global_id.as_ref_target())
          .with_text(tag);
        tree.replace_at(&fragment.path, Node::Element(reference));
      }
    }
  }

  for person in persons {
    if let Some(doc) = tree_of(&person.document_id) {
      stamp(&mut documents[doc].tree, &person.source.path, &person.global_id);
    }
  }
}

fn stamp(tree: &mut Element, path: &NodePath, id: &GlobalId) {
  if let Some(el) = tree.at_path_mut(path) {
    el.set_attr("xml:id", id.as_str());
  }
}

/// Resolve every document at `paths`, in order, in one fresh pass.
pub fn resolve_corpus<I, P>(paths: I, mode: ResolutionMode) -> Result<Corpus>
where
  I: IntoIterator<Item = P>,
  P: AsRef<Path>,
{
  let mut resolver = Resolver::new(mode);
  for path in paths {
    resolver.resolve_path(path.as_ref())?;
  }
  Ok(resolver.finish())
}
