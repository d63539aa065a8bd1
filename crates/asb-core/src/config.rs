//! Pass configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How fatal collisions and duplicate documents are handled.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResolutionMode {
  /// Record the problem, drop the offending fragment, keep going.
  #[default]
  BestEffort,
  /// Abort the pass on the first fatal collision.
  Strict,
}

/// Settings for one corpus pass and its exports.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PassConfig {
  /// Directory searched (recursively) for `*.xml` case files.
  pub input_dir:      PathBuf,
  /// Root of the JSON and XML output tree.
  pub output_dir:     PathBuf,
  pub mode:           ResolutionMode,
  /// Write rewritten documents to `<output>/xml/editions`.
  pub write_editions: bool,
  /// Write the event and person index lists to `<output>/xml/indices`.
  pub write_indices:  bool,
}

impl Default for PassConfig {
  fn default() -> Self {
    Self {
      input_dir:      PathBuf::from("cases"),
      output_dir:     PathBuf::from("out"),
      mode:           ResolutionMode::default(),
      write_editions: true,
      write_indices:  true,
    }
  }
}
