//! Entity identity resolution for the ASB case-file corpus.
//!
//! Every event and person fragment in every document is mapped to a
//! canonical entity with a corpus-wide unique global id; restatements of an
//! event marked as copies are folded into the entity they restate, and
//! relation edges are rewritten from per-document local ids to global ids.
//!
//! This crate is free of output concerns. `asb-export` turns a finished
//! [`Corpus`] into JSON and XML.
//!
//! ```no_run
//! use asb_core::{ResolutionMode, resolve_corpus};
//!
//! let corpus =
//!   resolve_corpus(["cases/0001.xml", "cases/0002.xml"], ResolutionMode::Strict)
//!     .unwrap();
//! for event in corpus.events.iter() {
//!   println!("{} ({})", event.global_id, event.tag);
//! }
//! ```

pub mod config;
pub mod diagnostics;
pub mod document;
pub mod driver;
pub mod error;
pub mod event;
pub mod extract;
pub mod labels;
pub mod person;
pub mod registry;
pub mod relation;
pub mod store;

pub use config::{PassConfig, ResolutionMode};
pub use driver::{Corpus, ResolvedDocument, Resolver, resolve_corpus};
pub use error::{Error, Result};
pub use registry::GlobalId;
