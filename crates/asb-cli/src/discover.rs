//! Corpus discovery.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Every `*.xml` file below `dir`, ordered by file name. The order decides
/// which fragment of an event is met first, so it has to be stable.
pub fn case_files(dir: &Path) -> Result<Vec<PathBuf>, walkdir::Error> {
  let mut files = Vec::new();
  for entry in WalkDir::new(dir).follow_links(true) {
    let entry = entry?;
    let path = entry.path();
    if entry.file_type().is_file()
      && path.extension().is_some_and(|ext| ext == "xml")
    {
      files.push(path.to_path_buf());
    }
  }
  files.sort_by(|a, b| a.file_name().cmp(&b.file_name()).then(a.cmp(b)));
  Ok(files)
}

#[cfg(test)]
mod tests {
  use std::fs;

  use tempfile::TempDir;

  use super::*;

  #[test]
  fn finds_xml_files_in_file_name_order() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("b")).unwrap();
    for file in ["0003.xml", "b/0001.xml", "0002.xml", "notes.txt"] {
      fs::write(dir.path().join(file), "<TEI/>").unwrap();
    }

    let names: Vec<String> = case_files(dir.path())
      .unwrap()
      .iter()
      .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
      .collect();
    assert_eq!(names, vec!["0001.xml", "0002.xml", "0003.xml"]);
  }

  #[test]
  fn missing_directory_is_an_error() {
    assert!(case_files(Path::new("/definitely/not/here")).is_err());
  }
}
