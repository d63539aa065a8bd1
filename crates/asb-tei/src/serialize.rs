//! [`Element`] tree → XML text, via `quick-xml`'s writer API.

use std::io::Write;

use quick_xml::{
  Writer,
  events::{BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event},
};

use crate::{
  error::Result,
  tree::{Element, Node},
};

/// Produces the element that stands in for a [`Node::Slot`].
///
/// Returning `None` drops the slot from the output.
pub trait SlotRenderer {
  fn render(&mut self, slot: usize) -> Option<Element>;
}

/// Renderer for trees that carry no slots (or whose slots should vanish).
pub struct NoSlots;

impl SlotRenderer for NoSlots {
  fn render(&mut self, _slot: usize) -> Option<Element> { None }
}

impl<F> SlotRenderer for F
where
  F: FnMut(usize) -> Option<Element>,
{
  fn render(&mut self, slot: usize) -> Option<Element> { self(slot) }
}

/// Write `el` and its subtree into an existing writer.
pub fn write_into<W, R>(
  writer: &mut Writer<W>,
  el: &Element,
  slots: &mut R,
) -> Result<()>
where
  W: Write,
  R: SlotRenderer + ?Sized,
{
  let mut start = BytesStart::new(el.name.as_str());
  for (k, v) in &el.attrs {
    start.push_attribute((k.as_str(), v.as_str()));
  }

  if el.children.is_empty() {
    writer.write_event(Event::Empty(start))?;
    return Ok(());
  }

  writer.write_event(Event::Start(start))?;
  for child in &el.children {
    match child {
      Node::Element(c) => write_into(writer, c, slots)?,
      Node::Text(t) => writer.write_event(Event::Text(BytesText::new(t)))?,
      Node::Slot(id) => {
        if let Some(rendered) = slots.render(*id) {
          write_into(writer, &rendered, slots)?;
        }
      }
      misc => write_misc(writer, misc)?,
    }
  }
  writer.write_event(Event::End(BytesEnd::new(el.name.as_str())))?;
  Ok(())
}

fn write_misc<W: Write>(writer: &mut Writer<W>, node: &Node) -> Result<()> {
  match node {
    Node::Comment(c) => {
      writer.write_event(Event::Comment(BytesText::from_escaped(c.as_str())))?
    }
    Node::Pi(p) => writer.write_event(Event::PI(BytesPI::new(p.as_str())))?,
    _ => {}
  }
  Ok(())
}

/// Serialize a single element (no XML declaration).
pub fn write_element<R>(el: &Element, slots: &mut R) -> Result<String>
where
  R: SlotRenderer + ?Sized,
{
  let mut writer = Writer::new(Vec::new());
  write_into(&mut writer, el, slots)?;
  Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
}

/// Serialize a whole document: XML declaration, the `prolog` comments and
/// processing instructions, then the root element.
pub fn write_document<R>(
  prolog: &[Node],
  root: &Element,
  slots: &mut R,
) -> Result<Vec<u8>>
where
  R: SlotRenderer + ?Sized,
{
  let mut writer = Writer::new(Vec::new());
  writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
  writer.write_event(Event::Text(BytesText::new("\n")))?;
  for node in prolog {
    write_misc(&mut writer, node)?;
    writer.write_event(Event::Text(BytesText::new("\n")))?;
  }
  write_into(&mut writer, root, slots)?;
  Ok(writer.into_inner())
}

// ─── Tests ───────────────────────────────────────────────────────────────────
