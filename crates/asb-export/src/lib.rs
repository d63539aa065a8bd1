//! Output writers for a resolved [`Corpus`].
//!
//! Everything lands below one output directory:
//!
//! ```text
//! <output>/json/{offences,punishments,persons,documents,diagnostics}.json
//! <output>/json/{typesense_entries,relations}.json
//! <output>/json/unique_<prefix>.json
//! <output>/xml/indices/{offences,punishments,listperson}.xml
//! <output>/xml/editions/<file name>
//! ```

pub mod edition;
pub mod error;
pub mod json;
pub mod record;
pub mod xml;

use std::path::{Path, PathBuf};

use asb_core::{Corpus, PassConfig};

pub use error::{Error, Result};

/// Write every export enabled in `config` below `output_dir`. Returns the
/// paths written, in order.
pub fn export(
  corpus: &Corpus,
  output_dir: &Path,
  config: &PassConfig,
) -> Result<Vec<PathBuf>> {
  let mut written = json::write_all(corpus, &output_dir.join("json"))?;
  let xml_dir = output_dir.join("xml");
  if config.write_indices {
    written.extend(xml::write_indices(corpus, &xml_dir)?);
  }
  if config.write_editions {
    written.extend(xml::write_editions(corpus, &xml_dir)?);
  }
  Ok(written)
}
