//! quick-xml event stream → owned [`Element`] tree.
//!
//! Pipeline:
//!   raw &str
//!     └─ Reader::read_event()  → Event
//!          └─ open / close / text  → element stack
//!               └─ single root     → (prolog, Element)

use quick_xml::{
  Reader,
  events::{BytesStart, Event},
};

use crate::{
  error::{Error, Result},
  tree::{Element, Node},
};

/// Parse a complete XML document into the comments and processing
/// instructions ahead of the root, and the root element itself.
///
/// Comments and processing instructions inside the root are kept as nodes;
/// the XML declaration, the doctype and anything after the root element are
/// dropped. Text is kept verbatim (including whitespace) because mixed
/// content matters for full-text extraction.
pub(crate) fn parse_document(input: &str) -> Result<(Vec<Node>, Element)> {
  let mut reader = Reader::from_str(input);
  reader.config_mut().check_end_names = false;

  let mut stack: Vec<Element> = Vec::new();
  let mut root: Option<Element> = None;
  let mut prolog: Vec<Node> = Vec::new();

  loop {
    match reader.read_event()? {
      Event::Start(ref e) => {
        ensure_no_second_root(&root, e)?;
        stack.push(open_element(e)?);
      }
      Event::Empty(ref e) => {
        ensure_no_second_root(&root, e)?;
        let el = open_element(e)?;
        attach(&mut stack, &mut root, el);
      }
      Event::End(ref e) => {
        let name = local_name(e.name().as_ref());
        let el = match stack.pop() {
          Some(el) if el.name == name => el,
          _ => return Err(Error::UnexpectedEnd(name)),
        };
        attach(&mut stack, &mut root, el);
      }
      Event::Text(ref e) => {
        let text = e.unescape()?;
        push_text(&mut stack, &text)?;
      }
      Event::CData(e) => {
        let raw = e.into_inner();
        push_text(&mut stack, &String::from_utf8_lossy(&raw))?;
      }
      Event::Comment(e) => {
        let node = Node::Comment(String::from_utf8_lossy(&e).into_owned());
        push_misc(&mut stack, &root, &mut prolog, node);
      }
      Event::PI(e) => {
        let node = Node::Pi(String::from_utf8_lossy(&e).into_owned());
        push_misc(&mut stack, &root, &mut prolog, node);
      }
      Event::Eof => break,
      _ => {}
    }
  }

  if let Some(open) = stack.pop() {
    return Err(Error::UnclosedElement(open.name));
  }
  let root = root.ok_or(Error::NoRoot)?;
  Ok((prolog, root))
}

/// Comments and processing instructions: into the open element, or the
/// prolog while no root has been seen.
fn push_misc(
  stack: &mut [Element],
  root: &Option<Element>,
  prolog: &mut Vec<Node>,
  node: Node,
) {
  match stack.last_mut() {
    Some(parent) => parent.children.push(node),
    None if root.is_none() => prolog.push(node),
    None => {}
  }
}

fn ensure_no_second_root(root: &Option<Element>, e: &BytesStart) -> Result<()> {
  if root.is_some() {
    return Err(Error::TrailingContent(local_name(e.name().as_ref())));
  }
  Ok(())
}

fn open_element(e: &BytesStart) -> Result<Element> {
  let mut el = Element::new(local_name(e.name().as_ref()));
  for attr in e.attributes() {
    let attr = attr?;
    let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
    let value = attr.unescape_value()?.into_owned();
    el.attrs.push((key, value));
  }
  Ok(el)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, el: Element) {
  match stack.last_mut() {
    Some(parent) => parent.children.push(Node::Element(el)),
    None => *root = Some(el),
  }
}

fn push_text(stack: &mut [Element], text: &str) -> Result<()> {
  match stack.last_mut() {
    Some(parent) => {
      // Adjacent text events (text, CDATA, text) collapse into one node.
      if let Some(Node::Text(prev)) = parent.children.last_mut() {
        prev.push_str(text);
      } else {
        parent.children.push(Node::Text(text.to_string()));
      }
      Ok(())
    }
    None if text.trim().is_empty() => Ok(()),
    None => Err(Error::TrailingContent(text.trim().to_string())),
  }
}

/// Strip a `prefix:` from an element name.
fn local_name(name: &[u8]) -> String {
  let local = match name.iter().rposition(|&b| b == b':') {
    Some(pos) => &name[pos + 1..],
    None => name,
  };
  String::from_utf8_lossy(local).into_owned()
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  fn parse_root(input: &str) -> Result<Element> {
    parse_document(input).map(|(_, root)| root)
  }

  #[test]
  fn parses_nested_elements_and_attributes() {
    let root = parse_root(
      r#"<?xml version="1.0"?>
<tei:TEI xmlns:tei="http://www.tei-c.org/ns/1.0">
  <tei:person xml:id="p1" role="delinquent"><tei:sex value="m"/></tei:person>
</tei:TEI>"#,
    )
    .unwrap();
    assert_eq!(root.name, "TEI");
    let person = root.child("person").unwrap();
    assert_eq!(person.attr("xml:id"), Some("p1"));
    assert_eq!(person.attr("role"), Some("delinquent"));
    assert_eq!(person.child("sex").unwrap().attr("value"), Some("m"));
  }

  #[test]
  fn unescapes_text_and_attributes() {
    let root =
      parse_root(r#"<a title="x &amp; y">Rad &lt;Körper&gt;</a>"#).unwrap();
    assert_eq!(root.attr("title"), Some("x & y"));
    assert_eq!(root.text(), "Rad <Körper>");
  }

  #[test]
  fn keeps_mixed_content_whitespace() {
    let root = parse_root("<p>Hans <hi>Huber</hi> aus Wien</p>").unwrap();
    assert_eq!(root.text(), "Hans Huber aus Wien");
  }

  #[test]
  fn mismatched_end_tag_is_an_error() {
    let err = parse_root("<a><b></a>").unwrap_err();
    assert!(matches!(err, Error::UnexpectedEnd(ref n) if n == "a"));
  }

  #[test]
  fn unclosed_root_is_an_error() {
    let err = parse_root("<a><b/>").unwrap_err();
    assert!(matches!(err, Error::UnclosedElement(ref n) if n == "a"));
  }

  #[test]
  fn empty_input_has_no_root() {
    assert!(matches!(parse_root("  ").unwrap_err(), Error::NoRoot));
  }

  #[test]
  fn second_root_is_rejected() {
    assert!(matches!(
      parse_root("<a/><b/>").unwrap_err(),
      Error::TrailingContent(_)
    ));
  }

  #[test]
  fn keeps_processing_instructions_and_comments() {
    let (prolog, root) = parse_document(
      r#"<?xml version="1.0" encoding="UTF-8"?>
<?xml-model href="tei_all.rng" type="application/xml"?>
<TEI><!-- Abschrift --><text/></TEI>
<!-- trailing -->"#,
    )
    .unwrap();
    assert_eq!(prolog, vec![Node::Pi(
      r#"xml-model href="tei_all.rng" type="application/xml""#.into()
    )]);
    assert_eq!(root.children[0], Node::Comment(" Abschrift ".into()));
    assert_eq!(root.elements().count(), 1);
  }
}
