//! Clean-up applied to a document tree right before it is written as an
//! edition: line and paragraph ids, and witness/reading bookkeeping.

use std::collections::HashMap;

use asb_tei::{Element, Node};
use tracing::warn;

const PRIMARY: &str = "primary";
const SECONDARY: &str = "secondary";

/// Everything an edition gets before it is written.
pub fn prepare(tree: &mut Element, document_id: &str) {
  number_lines(tree, document_id);
  tidy_readings(tree);
}

/// Stamp every `p` and `l` below a `body` with `<doc>_p_0001`,
/// `<doc>_l_0001`, … in document order. `<doc>` is the root's `xml:id`
/// without a `.xml` suffix, else `fallback_id`.
pub fn number_lines(tree: &mut Element, fallback_id: &str) {
  let doc_id = tree
    .attr("xml:id")
    .map(str::trim)
    .filter(|id| !id.is_empty())
    .map(|id| id.strip_suffix(".xml").unwrap_or(id).to_string())
    .unwrap_or_else(|| fallback_id.to_string());

  let in_body = tree.name == "body";
  for name in ["p", "l"] {
    let mut n = 0;
    number_below_body(tree, in_body, name, &doc_id, &mut n);
  }
}

fn number_below_body(
  el: &mut Element,
  in_body: bool,
  name: &str,
  doc_id: &str,
  n: &mut usize,
) {
  for child in el.elements_mut() {
    if in_body && child.name == name {
      *n += 1;
      child.set_attr("xml:id", format!("{doc_id}_{name}_{:04}", *n));
    }
    let in_body = in_body || child.name == "body";
    number_below_body(child, in_body, name, doc_id, n);
  }
}

/// Type witnesses and page breaks as primary or secondary and link readings
/// to their witnesses.
///
/// The primary witness is the one the first `app/lem/@wit` names, else the
/// first witness. A document without a `listWit` gets one: its source
/// description is wrapped into a single primary witness and every page
/// break is primary.
pub fn tidy_readings(tree: &mut Element) {
  let witnesses: Vec<String> = tree
    .find_all("listWit")
    .flat_map(|list| list.children_named("witness"))
    .map(|w| w.attr("xml:id").unwrap_or_default().trim().to_string())
    .collect();
  if witnesses.is_empty() {
    add_primary_witness(tree);
    return;
  }

  let primary = tree
    .find_all("app")
    .flat_map(|app| app.children_named("lem"))
    .find_map(|lem| lem.attr("wit"))
    .map(|wit| wit.trim_matches([' ', '#']).to_string())
    .unwrap_or_default();
  let types: Vec<&'static str> = witnesses
    .iter()
    .enumerate()
    .map(|(i, id)| witness_type(i, id, &primary))
    .collect();
  type_witnesses(tree, &witnesses, &types);
  link_unlinked_readings(tree, &witnesses);
  number_readings(tree);
}

fn witness_type(index: usize, id: &str, primary: &str) -> &'static str {
  match primary.is_empty() {
    false if id == primary => PRIMARY,
    true if index == 0 => PRIMARY,
    _ => SECONDARY,
  }
}

fn type_witnesses(tree: &mut Element, witnesses: &[String], types: &[&str]) {
  let by_ref: HashMap<String, &str> = witnesses
    .iter()
    .zip(types)
    .filter(|(id, _)| !id.is_empty())
    .map(|(id, ty)| (format!("#{id}"), *ty))
    .collect();

  let mut next = 0;
  tree.visit_mut(&mut |el| match el.name.as_str() {
    "listWit" => {
      for witness in el.elements_mut().filter(|w| w.name == "witness") {
        if let Some(ty) = types.get(next) {
          witness.set_attr("type", *ty);
        }
        next += 1;
      }
    }
    "pb" => {
      let ty = el
        .attr("edRef")
        .and_then(|r| by_ref.get(r.trim()))
        .copied();
      if let Some(ty) = ty {
        el.set_attr("type", ty);
      }
    }
    _ => {}
  });
}

/// In every `app` with a `lem` or `rdg` lacking `@wit`: the lemma belongs
/// to the first witness, the readings to the others in order.
fn link_unlinked_readings(tree: &mut Element, witnesses: &[String]) {
  let first = format!("#{}", witnesses[0]);
  let others: Vec<String> =
    witnesses[1..].iter().map(|w| format!("#{w}")).collect();

  tree.visit_mut(&mut |app| {
    if app.name != "app" {
      return;
    }
    let unlinked = app.elements().any(|c| {
      (c.name == "lem" || c.name == "rdg") && c.attr("wit").is_none()
    });
    if !unlinked {
      return;
    }
    let mut readings = 0;
    for child in app.elements_mut() {
      match child.name.as_str() {
        "lem" => child.set_attr("wit", first.as_str()),
        "rdg" => {
          match others.get(readings) {
            Some(wit) => child.set_attr("wit", wit.as_str()),
            None => warn!(reading = readings, "reading without a witness"),
          }
          readings += 1;
        }
        _ => {}
      }
    }
  });
}

/// `app_1`, `app_2`, …; readings and then lemmas share one counter
/// (`rdg_1`, …, `lem_<n+1>`, …).
fn number_readings(tree: &mut Element) {
  let mut apps = 0;
  stamp_all(tree, "app", "app", &mut apps);
  let mut readings = 0;
  stamp_all(tree, "rdg", "rdg", &mut readings);
  stamp_all(tree, "lem", "lem", &mut readings);
}

fn stamp_all(tree: &mut Element, name: &str, prefix: &str, n: &mut usize) {
  tree.visit_mut(&mut |el| {
    if el.name == name {
      *n += 1;
      el.set_attr("xml:id", format!("{prefix}_{}", *n));
    }
  });
}

/// Primary-type every page break and wrap the element content of the first
/// `sourceDesc` into `<listWit><witness type="primary">…</witness></listWit>`.
fn add_primary_witness(tree: &mut Element) {
  tree.visit_mut(&mut |el| {
    if el.name == "pb" {
      el.set_attr("type", PRIMARY);
    }
  });

  let Some(path) = tree
    .find_paths("sourceDesc")
    .into_iter()
    .next()
    .map(|(path, _)| path)
  else {
    return;
  };
  let Some(source) = tree.at_path_mut(&path) else {
    return;
  };
  if source.elements().next().is_none() {
    return;
  }

  let mut witness = Element::new("witness").with_attr("type", PRIMARY);
  let mut kept = Vec::new();
  let mut position = None;
  for node in std::mem::take(&mut source.children) {
    match node {
      Node::Element(el) => {
        position.get_or_insert(kept.len());
        witness.push(Node::Element(el));
      }
      other => kept.push(other),
    }
  }
  let list = Element::new("listWit")
    .with_text("\n")
    .with_child(witness)
    .with_text("\n");
  kept.insert(position.unwrap_or(kept.len()), Node::Element(list));
  source.children = kept;
}

#[cfg(test)]
mod tests {
  use asb_tei::{NoSlots, parse, write_element};

  use super::*;

  fn written(tree: &Element) -> String {
    write_element(tree, &mut NoSlots).unwrap()
  }

  #[test]
  fn paragraphs_and_lines_below_body_are_numbered() {
    let mut tree = parse(
      r#"<TEI xml:id="0042.xml"><teiHeader><p>head</p></teiHeader>
        <text><body><p>a</p><lg><l>x</l><l>y</l></lg><p>b</p></body></text></TEI>"#,
    )
    .unwrap();
    number_lines(&mut tree, "fallback");
    let ids: Vec<&str> = tree
      .find_all("p")
      .chain(tree.find_all("l"))
      .filter_map(|e| e.attr("xml:id"))
      .collect();
    assert_eq!(ids, vec![
      "0042_p_0001",
      "0042_p_0002",
      "0042_l_0001",
      "0042_l_0002"
    ]);
    let header = tree.find("teiHeader").unwrap();
    assert!(header.child("p").unwrap().attr("xml:id").is_none());
  }

  #[test]
  fn numbering_falls_back_to_the_document_id() {
    let mut tree = parse("<TEI><text><body><p/></body></text></TEI>").unwrap();
    number_lines(&mut tree, "0007");
    assert_eq!(tree.find("p").unwrap().attr("xml:id"), Some("0007_p_0001"));
  }

  #[test]
  fn lemma_witness_is_primary() {
    let mut tree = parse(
      r##"<TEI><sourceDesc><listWit>
        <witness xml:id="w1"/><witness xml:id="w2"/>
      </listWit></sourceDesc>
      <body><pb edRef="#w1"/><pb edRef="#w2"/>
        <app><lem wit="#w2">a</lem><rdg wit="#w1">b</rdg></app>
      </body></TEI>"##,
    )
    .unwrap();
    tidy_readings(&mut tree);

    let types: Vec<_> =
      tree.find_all("witness").map(|w| w.attr("type")).collect();
    assert_eq!(types, vec![Some("secondary"), Some("primary")]);
    let pbs: Vec<_> = tree.find_all("pb").map(|p| p.attr("type")).collect();
    assert_eq!(pbs, vec![Some("secondary"), Some("primary")]);
    let app = tree.find("app").unwrap();
    assert_eq!(app.attr("xml:id"), Some("app_1"));
    assert_eq!(app.child("rdg").unwrap().attr("xml:id"), Some("rdg_1"));
    assert_eq!(app.child("lem").unwrap().attr("xml:id"), Some("lem_2"));
    // Already linked readings keep their witnesses.
    assert_eq!(app.child("lem").unwrap().attr("wit"), Some("#w2"));
  }

  #[test]
  fn unlinked_readings_follow_witness_order() {
    let mut tree = parse(
      r#"<TEI><listWit><witness xml:id="a"/><witness xml:id="b"/><witness xml:id="c"/></listWit>
        <app><lem>x</lem><rdg>y</rdg><rdg>z</rdg></app></TEI>"#,
    )
    .unwrap();
    tidy_readings(&mut tree);

    let app = tree.find("app").unwrap();
    let wits: Vec<_> = app.elements().map(|c| c.attr("wit")).collect();
    assert_eq!(wits, vec![Some("#a"), Some("#b"), Some("#c")]);
    assert_eq!(tree.find("witness").unwrap().attr("type"), Some("primary"));
  }

  #[test]
  fn single_source_becomes_the_primary_witness() {
    let mut tree = parse(
      r#"<TEI><sourceDesc><msDesc><msIdentifier/></msDesc></sourceDesc><body><pb/></body></TEI>"#,
    )
    .unwrap();
    tidy_readings(&mut tree);

    assert_eq!(
      written(tree.find("sourceDesc").unwrap()),
      "<sourceDesc><listWit>\n<witness type=\"primary\"><msDesc><msIdentifier/></msDesc></witness>\n</listWit></sourceDesc>"
    );
    assert_eq!(tree.find("pb").unwrap().attr("type"), Some("primary"));
  }
}
